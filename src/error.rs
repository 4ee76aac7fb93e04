//! Error types for the soil thermal engine.
//!
//! Input errors are raised before any column state is touched. Divergence and
//! skipped-branch errors point at a defect in the solver rather than bad data.

use crate::constants::GPLHEAT;
use crate::thermal_properties::Phase;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub type ThermalResult<T> = Result<T, ThermalError>;

/// Identity of one soil column: the grid cell and the stand inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct ColumnId {
    pub cell: usize,
    pub stand: usize,
}

impl ColumnId {
    pub fn new(cell: usize, stand: usize) -> Self {
        Self { cell, stand }
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell {} stand {}", self.cell, self.stand)
    }
}

fn location(column: &Option<ColumnId>, layer: &Option<usize>) -> String {
    match (column, layer) {
        (Some(c), Some(l)) => format!(" ({c}, layer {l})"),
        (Some(c), None) => format!(" ({c})"),
        (None, Some(l)) => format!(" (layer {l})"),
        (None, None) => String::new(),
    }
}

fn gridpoint_location(column: &Option<ColumnId>, layer: &usize) -> String {
    location(column, &Some(*layer))
}

#[derive(Error, Debug)]
pub enum ThermalError {
    #[error("invalid input{}: {detail}", location(.column, .layer))]
    InvalidInput {
        column: Option<ColumnId>,
        layer: Option<usize>,
        detail: String,
    },

    #[error(
        "numerical divergence{}: gridpoint {gridpoint} reached {value:.6} outside [{lower:.6}, {upper:.6}]",
        gridpoint_location(.column, .layer)
    )]
    NumericalDivergence {
        column: Option<ColumnId>,
        layer: usize,
        gridpoint: usize,
        value: f64,
        lower: f64,
        upper: f64,
    },

    #[error("{phase:?} properties were read after the uniform sign check skipped them")]
    SkippedPhaseBranch { phase: Phase },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

impl ThermalError {
    pub fn invalid_input(layer: Option<usize>, detail: impl Into<String>) -> Self {
        Self::InvalidInput {
            column: None,
            layer,
            detail: detail.into(),
        }
    }

    pub fn divergence(gridpoint: usize, value: f64, lower: f64, upper: f64) -> Self {
        Self::NumericalDivergence {
            column: None,
            layer: gridpoint / GPLHEAT,
            gridpoint,
            value,
            lower,
            upper,
        }
    }

    /// Attach the column identity to an error raised below the column level.
    pub fn with_column(self, id: ColumnId) -> Self {
        match self {
            Self::InvalidInput { layer, detail, .. } => Self::InvalidInput {
                column: Some(id),
                layer,
                detail,
            },
            Self::NumericalDivergence {
                layer,
                gridpoint,
                value,
                lower,
                upper,
                ..
            } => Self::NumericalDivergence {
                column: Some(id),
                layer,
                gridpoint,
                value,
                lower,
                upper,
            },
            other => other,
        }
    }

    /// True for errors that indicate a solver defect rather than bad input.
    pub fn is_solver_defect(&self) -> bool {
        matches!(
            self,
            Self::NumericalDivergence { .. } | Self::SkippedPhaseBranch { .. }
        )
    }
}

/// Reject NaN and infinities in a named input.
pub(crate) fn ensure_finite(value: f64, layer: Option<usize>, what: &str) -> ThermalResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ThermalError::invalid_input(layer, format!("{what} is not finite ({value})")))
    }
}

/// Reject negative, NaN and infinite amounts.
pub(crate) fn ensure_non_negative(value: f64, layer: Option<usize>, what: &str) -> ThermalResult<()> {
    ensure_finite(value, layer, what)?;
    if value < 0.0 {
        return Err(ThermalError::invalid_input(layer, format!("{what} is negative ({value})")));
    }
    Ok(())
}
