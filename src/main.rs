//! boosting-insights - Main Entry Point

use boosting_insights::cli::{run, Cli};
use clap::Parser;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "boosting_insights=info".into()),
        )
        .init();

    run(Cli::parse())
}
