//! Per-person behavioural models for union dissolution and formation
//!
//! Models are evaluated in data-parallel passes, so an implementation may
//! read and write only the person it is handed.

pub mod probit;

pub use probit::{standard_normal_cdf, ProbitCoefficients, ProbitPartnershipModel};

use crate::error::Result;
use crate::population::Person;

/// Decides whether a committed union ends in the current trial.
pub trait DissolutionModel: Sync {
    /// Sets `left_partner_test` on partnered persons. Never touches the
    /// committed partnership record.
    fn evaluate_dissolution(&self, person: &mut Person) -> Result<()>;
}

/// Decides whether a person looks for a partner in the current trial.
pub trait FormationModel: Sync {
    /// Clears the person's previous trial match and recomputes
    /// `formation_probability` and `to_match` with `adjustment` added to the
    /// model intercept. Persons in an intact union never become candidates.
    fn evaluate_formation(&self, person: &mut Person, adjustment: f64) -> Result<()>;
}
