use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Fatal failures of a single model computation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("invalid argument {name}: {reason}")]
    InvalidArgument { name: &'static str, reason: String },
}

impl ModelError {
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }
}

pub type ModelResult<T> = Result<T, ModelError>;

/// Which scoreline grid a warning refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Period {
    Halftime,
    SecondHalf,
    FullTime,
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Period::Halftime => "HT",
            Period::SecondHalf => "2H",
            Period::FullTime => "FT",
        };
        f.write_str(label)
    }
}

/// Non-fatal conditions. Computation proceeds; callers decide what to surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ModelWarning {
    /// The truncated grid holds noticeably less than the full probability mass.
    TruncatedMass {
        period: Period,
        mass: f64,
        max_goals: u32,
    },
    /// A caller-supplied HT/FT weight row does not sum to 1.
    UnnormalizedWeights { row: usize, sum: f64 },
}

impl fmt::Display for ModelWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelWarning::TruncatedMass {
                period,
                mass,
                max_goals,
            } => write!(
                f,
                "{period} grid truncated at {max_goals} goals holds {:.4} of the mass; raise max_goals",
                mass
            ),
            ModelWarning::UnnormalizedWeights { row, sum } => {
                write!(f, "HT/FT weight row {row} sums to {sum:.4}, not 1")
            }
        }
    }
}

/// Rejects NaN and infinities, which would otherwise slip through `< 0.0` checks.
pub(crate) fn require_finite(name: &'static str, value: f64) -> ModelResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ModelError::invalid(name, format!("{value} is not a finite number")))
    }
}

pub(crate) fn require_non_negative(name: &'static str, value: f64) -> ModelResult<f64> {
    let value = require_finite(name, value)?;
    if value < 0.0 {
        return Err(ModelError::invalid(name, format!("{value} is negative")));
    }
    Ok(value)
}
