//! Error type shared by the alignment, matching and model layers.

use thiserror::Error;

use crate::params::TargetShareCategory;
use crate::population::PersonId;

/// Errors raised while calibrating partnership formation.
#[derive(Error, Debug)]
pub enum AlignmentError {
    /// A per-person behavioural model could not produce a result.
    #[error("behavioural model failed for {person}: {reason}")]
    Model { person: PersonId, reason: String },

    #[error("{0} appears more than once in the population")]
    DuplicatePerson(PersonId),

    /// The union matching step found the population in an inconsistent state.
    #[error("union matching failed: {0}")]
    Matching(String),

    #[error("no {category} target share configured for year {year}")]
    MissingTarget {
        year: i32,
        category: TargetShareCategory,
    },

    #[error("{category} target share {value} for year {year} is outside [0, 1]")]
    InvalidTarget {
        year: i32,
        category: TargetShareCategory,
        value: f64,
    },

    /// The root search could not find a sign change of the objective.
    #[error("objective not bracketed on [{lower}, {upper}]: f(lower) = {f_lower}, f(upper) = {f_upper}")]
    NotBracketed {
        lower: f64,
        upper: f64,
        f_lower: f64,
        f_upper: f64,
    },

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AlignmentError>;
