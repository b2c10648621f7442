//! boosting-insights - Interpretation toolkit for tree-based pricing models
//!
//! This crate interprets fitted regression trees, random forests and
//! gradient boosting machines used for claim frequency and severity
//! modelling, and compares the resulting tariffs:
//! - Normalized variable importance
//! - Partial dependence (PDP), individual conditional expectation (ICE)
//!   and grouped, centered partial dependence
//! - Friedman's H-statistic for interaction strength
//! - Poisson and gamma deviance, loss-ratio lift, double lift and
//!   Gini-based minimax model ranking
//!
//! # Modules
//!
//! ## Core
//! - [`data`] - Datasets, sweep grids, sampling and file IO
//! - [`models`] - Fitted model representation and prediction
//! - [`explainability`] - Importance, PDP/ICE, grouped PDP, H-statistic
//! - [`lift`] - Deviance, lift tables and Gini ranking
//!
//! ## Services
//! - [`report`] - DataFrame conversion and CSV/JSON export
//! - [`config`] - Analysis configuration
//! - [`cli`] - Command-line interface
//!
//! ## Utilities
//! - [`utils`] - Parallel dispatch and numeric helpers

// Core error handling
pub mod error;

// Core modules
pub mod data;
pub mod models;
pub mod explainability;
pub mod lift;

// Services
pub mod config;
pub mod report;
pub mod cli;

// Utilities
pub mod utils;

pub use error::{InsightError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{InsightError, Result};

    // Data
    pub use crate::data::{DataLoader, Dataset, FeatureColumn, FeatureDomain, FeatureValue, Grid};

    // Models
    pub use crate::models::{predict, BoostedEnsemble, Distribution, FittedModel, RandomForest, RegressionTree, TreeNode};

    // Interpretation
    pub use crate::explainability::{
        grouped_partial_dependence, h_statistic, h_statistic_subset, importance, importance_table,
        individual_conditional_expectation, interaction_matrix, partial_dependence, EffectCurve, EffectMatrix,
        GroupedEffectTable, ImportanceRecord, InteractionPair, PartialDependence,
    };

    // Lift
    pub use crate::lift::{
        double_lift, gamma_deviance, gini, gini_ranking, loss_ratio_lift, poisson_deviance, GiniRanking,
        LiftAnalyzer, LiftConfig, LiftTable,
    };

    // Configuration and reporting
    pub use crate::config::{AnalysisConfig, PdpConfig};
    pub use crate::report::{write_csv, write_json, ToDataFrame};
    pub use crate::utils::ParallelConfig;
}
