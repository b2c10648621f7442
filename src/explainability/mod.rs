//! Model interpretation
//!
//! Provides model-agnostic interpretation methods including:
//! - Normalized variable importance
//! - Partial dependence plots (PDP)
//! - Individual conditional expectation (ICE)
//! - Grouped, centered partial dependence
//! - Friedman's H-statistic for interaction strength

mod grouped;
mod importance;
mod interaction;
mod pdp;

pub use grouped::{grouped_partial_dependence, EffectGroup, GroupedEffectTable, GroupedPartialDependence};
pub use importance::{importance, importance_table, ImportanceRecord, ImportanceTable, REPORT_DIGITS};
pub use interaction::{h_statistic, h_statistic_subset, interaction_matrix, InteractionPair, InteractionStrength};
pub use pdp::{
    individual_conditional_expectation, partial_dependence, EffectCurve, EffectMatrix, EffectPoint,
    PartialDependence,
};
