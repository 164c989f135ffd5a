//! Domain errors surfaced to callers of the dashboard pipeline.
//!
//! Parse failures inside individual cells never become errors (they coerce to
//! missing) and data-quality findings are advisory [`crate::validate::Issue`]s.
//! What remains here are the conditions that stop a specific action.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    /// The dataset (after mapping or after filtering) has no rows left to render.
    #[error("No data available after {stage}")]
    EmptyDataset { stage: &'static str },

    /// A mapping document could not be parsed; the previous mapping stays in effect.
    #[error("Invalid mapping JSON: {0}")]
    InvalidMapping(String),

    /// A workbook could be opened but held no readable sheet.
    #[error("Workbook has no readable sheets")]
    EmptyWorkbook,

    /// A categorical filter was requested for a field that is not categorical.
    #[error("'{0}' is not a categorical field (expected one of segment, region, channel, product)")]
    NotCategorical(String),

    /// A standard field name did not match any known field.
    #[error("Unknown standard field '{0}'")]
    UnknownField(String),
}

pub type DashboardResult<T> = std::result::Result<T, DashboardError>;
