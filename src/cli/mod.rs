//! boosting-insights CLI
//!
//! Command-line access to every interpretation and lift analysis. Models
//! are read from JSON exports, data from CSV, Parquet or JSON files.

use clap::{Args, Parser, Subcommand};
use colored::*;
use polars::prelude::DataFrame;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::AnalysisConfig;
use crate::data::{DataLoader, Dataset, Grid};
use crate::explainability::{
    importance, ImportanceTable, GroupedPartialDependence, InteractionStrength, PartialDependence,
};
use crate::lift::{gamma_deviance, poisson_deviance, poisson_deviance_with_exposure, LiftAnalyzer};
use crate::models::FittedModel;
use crate::report::{write_csv, ToDataFrame};
use ndarray::Array1;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn show(frame: &DataFrame) {
    println!("{}", frame);
    println!();
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "boosting-insights")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Interpretation and tariff comparison for tree-based pricing models")]
#[command(long_about = None)]
pub struct Cli {
    /// Analysis configuration (JSON); defaults apply to missing keys
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Model, data and swept feature shared by the partial dependence commands
#[derive(Args, Debug, Clone)]
pub struct SweepArgs {
    /// Fitted model (JSON export)
    #[arg(short, long)]
    pub model: PathBuf,

    /// Input data file (CSV, JSON, or Parquet)
    #[arg(short, long)]
    pub data: PathBuf,

    /// Feature to sweep
    #[arg(short, long)]
    pub feature: String,

    /// Grid as `from:to:step` or a comma-separated list of values
    /// (default: levels, or an evenly spaced percentile grid)
    #[arg(short, long)]
    pub grid: Option<String>,

    /// Write the result as CSV
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Scored test set shared by the lift commands
#[derive(Args, Debug, Clone)]
pub struct LiftArgs {
    /// Scored test data with loss, exposure and premium columns
    #[arg(short, long)]
    pub data: PathBuf,

    /// Benchmark premium column
    #[arg(short, long)]
    pub benchmark: String,

    /// Competitor premium column
    #[arg(short, long)]
    pub competitor: String,

    /// Number of equal-exposure bins (default from config)
    #[arg(long)]
    pub bins: Option<usize>,

    /// Write the table as CSV
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Normalized variable importance of one or more models
    Importance {
        /// Fitted models (JSON exports)
        #[arg(short, long, required = true, num_args = 1..)]
        model: Vec<PathBuf>,

        /// Write the table as CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Partial dependence curve
    Pdp(SweepArgs),

    /// Individual conditional expectation curves
    Ice {
        #[command(flatten)]
        sweep: SweepArgs,

        /// Center every curve at the first grid value
        #[arg(long)]
        centered: bool,
    },

    /// Partial dependence per group of a second feature
    GroupedPdp {
        #[command(flatten)]
        sweep: SweepArgs,

        /// Grouping feature
        #[arg(long)]
        group: String,

        /// Quantile bins for a numeric grouping feature (default from config)
        #[arg(long)]
        n_groups: Option<usize>,
    },

    /// Friedman's H-statistic of a boosted ensemble
    Interaction {
        /// Fitted boosted ensemble (JSON export)
        #[arg(short, long)]
        model: PathBuf,

        /// Input data file
        #[arg(short, long)]
        data: PathBuf,

        /// Features; two or more, comma separated
        #[arg(short, long, value_delimiter = ',', required = true)]
        features: Vec<String>,

        /// Compute every pair instead of the joint statistic
        #[arg(long)]
        pairs: bool,

        /// Write the pair table as CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Out-of-sample deviance
    Deviance {
        /// Input data file
        #[arg(short, long)]
        data: PathBuf,

        /// Observed counts or severities
        #[arg(long)]
        observed: String,

        /// Column with predictions
        #[arg(long, conflicts_with = "model")]
        predicted: Option<String>,

        /// Predict with this model instead of reading a column
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// poisson or gamma
        #[arg(long, default_value = "poisson")]
        family: String,

        /// Exposure column scaling Poisson rates
        #[arg(long)]
        exposure: Option<String>,

        /// Case weight column for gamma deviance
        #[arg(long)]
        weights: Option<String>,
    },

    /// Loss ratio per bin of relativity
    Lift(LiftArgs),

    /// Percentage error of both premiums per bin of relativity
    DoubleLift(LiftArgs),

    /// Gini matrix and minimax ranking of premium columns
    Gini {
        /// Scored test data
        #[arg(short, long)]
        data: PathBuf,

        /// Premium columns, comma separated
        #[arg(short, long, value_delimiter = ',', required = true)]
        premiums: Vec<String>,

        /// Write the matrix as CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show data or model information
    Info {
        /// Input data file
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Fitted model (JSON export)
        #[arg(short, long)]
        model: Option<PathBuf>,
    },
}

// ─── Loading ───────────────────────────────────────────────────────────────────

pub fn load_config(path: Option<&Path>) -> anyhow::Result<AnalysisConfig> {
    match path {
        Some(path) => Ok(AnalysisConfig::from_json_file(path)?),
        None => Ok(AnalysisConfig::default()),
    }
}

fn load_data(path: &Path) -> anyhow::Result<Dataset> {
    step_run("Loading data");
    let start = Instant::now();
    let data = DataLoader::new().load_auto(path)?;
    step_done(&format!("{} rows × {} cols in {:?}", data.height(), data.frame().width(), start.elapsed()));
    Ok(data)
}

fn load_model(path: &Path) -> anyhow::Result<FittedModel> {
    step_run("Loading model");
    let model = FittedModel::from_json_file(path)?;
    step_done(&format!("{} with {} trees", model.kind(), model.n_trees()));
    Ok(model)
}

/// `from:to:step` or a comma-separated list; categorical features take
/// the list items as levels
pub fn parse_grid(text: &str, data: &Dataset, feature: &str) -> anyhow::Result<Grid> {
    if data.is_categorical(feature)? {
        return Ok(Grid::categorical(text.split(',').map(str::trim)));
    }
    let parts: Vec<&str> = text.split(':').map(str::trim).collect();
    if let [from, to, step] = parts.as_slice() {
        return Ok(Grid::sequence(from.parse()?, to.parse()?, step.parse()?)?);
    }
    let values = text
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Grid::numeric(values))
}

fn resolve_grid(args: &SweepArgs, data: &Dataset, config: &AnalysisConfig) -> anyhow::Result<Grid> {
    match &args.grid {
        Some(text) => parse_grid(text, data, &args.feature),
        None => Ok(config.pdp.grid_for(data, &args.feature)?),
    }
}

fn save(frame_source: &(impl ToDataFrame + ?Sized), output: Option<&Path>) -> anyhow::Result<()> {
    if let Some(path) = output {
        write_csv(frame_source, path)?;
        println!("  {} {}", ok("✓"), muted(&format!("saved {}", path.display())));
    }
    Ok(())
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_importance(models: &[PathBuf], output: Option<&Path>) -> anyhow::Result<()> {
    section("Variable importance");

    let loaded: Vec<(String, FittedModel)> = models
        .iter()
        .map(|path| {
            let name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("model")
                .to_string();
            load_model(path).map(|m| (name, m))
        })
        .collect::<anyhow::Result<_>>()?;

    if let [(_, model)] = loaded.as_slice() {
        let records = importance(model)?;
        show(&records.to_dataframe()?);
        return save(records.as_slice(), output);
    }

    let named: Vec<(&str, &FittedModel)> = loaded.iter().map(|(n, m)| (n.as_str(), m)).collect();
    let table = ImportanceTable::build(&named)?;
    show(&table.to_dataframe()?);
    save(&table, output)
}

pub fn cmd_pdp(args: &SweepArgs, config: &AnalysisConfig) -> anyhow::Result<()> {
    section(&format!("Partial dependence · {}", args.feature));

    let model = load_model(&args.model)?;
    let data = config.interpretation_sample(&load_data(&args.data)?)?;
    let grid = resolve_grid(args, &data, config)?;

    step_run(&format!("Sweeping {} grid values", grid.len()));
    let start = Instant::now();
    let curve = PartialDependence::new(&model)
        .with_parallel(config.parallel.clone())
        .curve(&data, &args.feature, &grid)?;
    step_done(&format!("{:?}", start.elapsed()));

    show(&curve.to_dataframe()?);
    save(&curve, args.output.as_deref())
}

pub fn cmd_ice(args: &SweepArgs, centered: bool, config: &AnalysisConfig) -> anyhow::Result<()> {
    section(&format!("Individual conditional expectation · {}", args.feature));

    let model = load_model(&args.model)?;
    let data = config.interpretation_sample(&load_data(&args.data)?)?;
    let grid = resolve_grid(args, &data, config)?;

    step_run(&format!("Sweeping {} grid values", grid.len()));
    let start = Instant::now();
    let mut ice = PartialDependence::new(&model)
        .with_parallel(config.parallel.clone())
        .ice(&data, &args.feature, &grid)?;
    if centered {
        ice = ice.centered();
    }
    step_done(&format!("{:?}", start.elapsed()));

    println!(
        "  {:<16} {}",
        muted("Curves"),
        format!("{} × {}", ice.n_observations(), ice.grid_values.len()).white()
    );
    show(&ice.to_curve().to_dataframe()?);
    save(&ice, args.output.as_deref())
}

pub fn cmd_grouped_pdp(
    args: &SweepArgs,
    group: &str,
    n_groups: Option<usize>,
    config: &AnalysisConfig,
) -> anyhow::Result<()> {
    section(&format!("Grouped partial dependence · {} by {}", args.feature, group));

    let model = load_model(&args.model)?;
    let data = config.interpretation_sample(&load_data(&args.data)?)?;
    let grid = resolve_grid(args, &data, config)?;
    let n_groups = if data.is_categorical(group)? {
        None
    } else {
        n_groups.or(config.pdp.n_groups)
    };

    step_run("Aggregating curves");
    let table = GroupedPartialDependence::new(&model)
        .with_parallel(config.parallel.clone())
        .compute(&data, &args.feature, &grid, group, n_groups)?;
    step_done(&format!("{} groups", table.n_groups()));

    show(&table.to_dataframe()?);
    save(&table, args.output.as_deref())
}

pub fn cmd_interaction(
    model_path: &Path,
    data_path: &Path,
    features: &[String],
    pairs: bool,
    output: Option<&Path>,
    config: &AnalysisConfig,
) -> anyhow::Result<()> {
    section("Interaction strength");

    let model = load_model(model_path)?;
    let data = config.interpretation_sample(&load_data(data_path)?)?;
    let names: Vec<&str> = features.iter().map(String::as_str).collect();
    let strength = InteractionStrength::new(&model)?.with_parallel(config.parallel.clone());

    if pairs {
        step_run("Computing pairwise H-statistics");
        let start = Instant::now();
        let table = strength.matrix(&data, &names)?;
        step_done(&format!("{:?}", start.elapsed()));
        show(&table.to_dataframe()?);
        return save(table.as_slice(), output);
    }

    step_run("Computing H-statistic");
    let h = strength.subset(&data, &names)?;
    step_done("");
    println!();
    println!("  {:<16} {}", muted(&names.join(" × ")), format!("{:.4}", h).white().bold());
    println!();
    Ok(())
}

pub fn cmd_deviance(
    data_path: &Path,
    observed: &str,
    predicted: Option<&str>,
    model_path: Option<&Path>,
    family: &str,
    exposure: Option<&str>,
    weights: Option<&str>,
) -> anyhow::Result<()> {
    section("Deviance");

    let data = load_data(data_path)?;
    let y = Array1::from_vec(data.numeric_column(observed)?);
    let mu = match (predicted, model_path) {
        (Some(column), _) => Array1::from_vec(data.numeric_column(column)?),
        (None, Some(path)) => load_model(path)?.predict(&data)?,
        (None, None) => anyhow::bail!("Pass either --predicted or --model"),
    };

    let deviance = match family {
        "poisson" => match exposure {
            Some(column) => {
                let expo = Array1::from_vec(data.numeric_column(column)?);
                poisson_deviance_with_exposure(&y, &mu, &expo)?
            }
            None => poisson_deviance(&y, &mu)?,
        },
        "gamma" => {
            let w = match weights {
                Some(column) => Array1::from_vec(data.numeric_column(column)?),
                None => Array1::ones(y.len()),
            };
            gamma_deviance(&y, &mu, &w)?
        }
        _ => anyhow::bail!("Invalid family: {}", family),
    };

    println!();
    println!("  {:<16} {}", muted(family), format!("{:.6}", deviance).white().bold());
    println!();
    Ok(())
}

pub fn cmd_lift(args: &LiftArgs, double: bool, config: &AnalysisConfig) -> anyhow::Result<()> {
    section(if double { "Double lift" } else { "Loss ratio lift" });

    let data = load_data(&args.data)?;
    let analyzer = LiftAnalyzer::new(config.lift.clone());
    let n_bins = args.bins.unwrap_or(config.lift.n_bins);
    let table = if double {
        analyzer.double_lift(&data, &args.benchmark, &args.competitor, n_bins)?
    } else {
        analyzer.loss_ratio_lift(&data, &args.benchmark, &args.competitor, n_bins)?
    };

    show(&table.to_dataframe()?);
    save(&table, args.output.as_deref())
}

pub fn cmd_gini(data_path: &Path, premiums: &[String], output: Option<&Path>, config: &AnalysisConfig) -> anyhow::Result<()> {
    section("Gini ranking");

    let data = load_data(data_path)?;
    let columns: Vec<&str> = premiums.iter().map(String::as_str).collect();
    let ranking = LiftAnalyzer::new(config.lift.clone()).gini_ranking(&data, &columns)?;

    show(&ranking.to_dataframe()?);
    if let Some(best) = ranking.best() {
        println!("  {:<16} {}", muted("Minimax"), best.name.white().bold());
        println!();
    }
    save(&ranking, output)
}

pub fn cmd_info(data_path: Option<&Path>, model_path: Option<&Path>) -> anyhow::Result<()> {
    if let Some(path) = data_path {
        section("Data Info");
        let data = DataLoader::new().load_auto(path)?;
        let delimited = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("csv") | Some("tsv") | Some("txt")
        );

        println!("  {:<12} {}", muted("File"), path.display());
        println!("  {:<12} {}", muted("Rows"), data.height());
        println!("  {:<12} {}", muted("Columns"), data.frame().width());
        if delimited {
            let info = DataLoader::new().file_info(path)?;
            println!("  {:<12} {:.2} MB", muted("Size"), info.file_size as f64 / 1024.0 / 1024.0);
            println!("  {:<12} {}", muted("Header"), info.columns.join(", "));
        }
        println!();

        println!("  {:<20} {:<12} {:>8}", muted("Column"), muted("Kind"), muted("Unique"));
        println!("  {}", dim(&"─".repeat(44)));
        for column in data.column_names() {
            let kind = if data.is_categorical(&column)? { "categorical" } else { "numeric" };
            let unique = Grid::observed(&data, &column)?.len();
            println!("  {:<20} {:<12} {:>8}", column, kind.truecolor(140, 140, 140), unique);
        }
        println!();
    }

    if let Some(path) = model_path {
        section("Model Info");
        let model = FittedModel::from_json_file(path)?;
        println!("  {:<18} {}", muted("Kind"), model.kind());
        println!("  {:<18} {}", muted("Trees"), model.n_trees());
        if let Some(depth) = model.interaction_depth() {
            println!("  {:<18} {}", muted("Interaction depth"), depth);
        }
        println!("  {:<18} {}", muted("Features"), model.features().join(", "));
        println!();
    }

    if data_path.is_none() && model_path.is_none() {
        anyhow::bail!("Pass --data and/or --model");
    }
    Ok(())
}

/// Dispatch a parsed command line
pub fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Importance { model, output } => cmd_importance(&model, output.as_deref()),
        Commands::Pdp(args) => cmd_pdp(&args, &config),
        Commands::Ice { sweep, centered } => cmd_ice(&sweep, centered, &config),
        Commands::GroupedPdp { sweep, group, n_groups } => cmd_grouped_pdp(&sweep, &group, n_groups, &config),
        Commands::Interaction { model, data, features, pairs, output } => {
            cmd_interaction(&model, &data, &features, pairs, output.as_deref(), &config)
        }
        Commands::Deviance { data, observed, predicted, model, family, exposure, weights } => cmd_deviance(
            &data,
            &observed,
            predicted.as_deref(),
            model.as_deref(),
            &family,
            exposure.as_deref(),
            weights.as_deref(),
        ),
        Commands::Lift(args) => cmd_lift(&args, false, &config),
        Commands::DoubleLift(args) => cmd_lift(&args, true, &config),
        Commands::Gini { data, premiums, output } => cmd_gini(&data, &premiums, output.as_deref(), &config),
        Commands::Info { data, model } => cmd_info(data.as_deref(), model.as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use polars::prelude::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_grouped_pdp() {
        let cli = Cli::try_parse_from([
            "boosting-insights",
            "grouped-pdp",
            "--model", "gbm.json",
            "--data", "train.csv",
            "--feature", "ageph",
            "--grid", "18:90:1",
            "--group", "power",
            "--n-groups", "5",
        ])
        .unwrap();
        match cli.command {
            Commands::GroupedPdp { sweep, group, n_groups } => {
                assert_eq!(sweep.feature, "ageph");
                assert_eq!(sweep.grid.as_deref(), Some("18:90:1"));
                assert_eq!(group, "power");
                assert_eq!(n_groups, Some(5));
            }
            _ => panic!("wrong subcommand"),
        }
    }

    #[test]
    fn test_parse_comma_lists() {
        let cli = Cli::try_parse_from([
            "boosting-insights",
            "gini",
            "--data", "test.csv",
            "--premiums", "glm,gbm,rf",
        ])
        .unwrap();
        match cli.command {
            Commands::Gini { premiums, .. } => assert_eq!(premiums, vec!["glm", "gbm", "rf"]),
            _ => panic!("wrong subcommand"),
        }
    }

    #[test]
    fn test_deviance_flags_conflict() {
        let result = Cli::try_parse_from([
            "boosting-insights",
            "deviance",
            "--data", "test.csv",
            "--observed", "nclaims",
            "--predicted", "freq",
            "--model", "gbm.json",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_grid() {
        let data = Dataset::new(df!("ageph" => &[20.0, 50.0], "fuel" => &["diesel", "gasoline"]).unwrap());
        assert_eq!(parse_grid("18:90:1", &data, "ageph").unwrap().len(), 73);
        assert_eq!(parse_grid("20, 30,40", &data, "ageph").unwrap(), Grid::numeric([20.0, 30.0, 40.0]));
        assert_eq!(parse_grid("gasoline", &data, "fuel").unwrap(), Grid::categorical(["gasoline"]));
        assert!(parse_grid("young", &data, "ageph").is_err());
    }
}
