//! Alignment of simulated aggregates to external targets
//!
//! - `partnership`: objective for the union formation intercept
//! - `search`: bracketing root search that drives an objective to zero
//!
//! [`align_partnerships`] ties both together for one simulation year.

pub mod partnership;
pub mod search;

pub use partnership::PartnershipAlignment;
pub use search::{RootSearch, SearchOutcome, SearchParams};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::behaviour::{DissolutionModel, FormationModel};
use crate::error::Result;
use crate::matching::{MatchMode, UnionMatcher};
use crate::params::TargetShareSource;
use crate::population::Population;

/// One-dimensional objective for a root search.
///
/// Called repeatedly and strictly one call at a time.
pub trait Evaluation {
    /// Signed calibration gap at `argument`
    fn evaluate(&mut self, argument: f64) -> Result<f64>;
}

/// Adapts a closure into an [`Evaluation`]
pub struct FnEvaluation<F>(pub F);

impl<F> Evaluation for FnEvaluation<F>
where
    F: FnMut(f64) -> Result<f64>,
{
    fn evaluate(&mut self, argument: f64) -> Result<f64> {
        (self.0)(argument)
    }
}

/// Result of calibrating partnership formation for one year
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AlignmentReport {
    pub year: i32,
    pub target_share: f64,
    /// Share at the calibrated adjustment
    pub observed_share: f64,
    /// Calibrated intercept shift
    pub adjustment: f64,
    pub error: f64,
    pub iterations: usize,
    pub evaluations: usize,
    pub converged: bool,
    pub eligible_persons: usize,
    pub test_partnered_persons: usize,
    pub completed_at: DateTime<Utc>,
}

/// Find the formation intercept shift that reproduces the partnership target.
///
/// The search starts from `initial_adjustment` as the construction value and
/// ends with one more evaluation at the root, so the transient state left on
/// the population matches the reported adjustment.
#[allow(clippy::too_many_arguments)]
pub fn align_partnerships<B, M, T>(
    population: &mut Population,
    initial_adjustment: f64,
    year: i32,
    targets: &T,
    min_age_cohabitation: u32,
    models: &B,
    matcher: &mut M,
    search: &RootSearch,
) -> Result<AlignmentReport>
where
    B: DissolutionModel + FormationModel,
    M: UnionMatcher,
    T: TargetShareSource + ?Sized,
{
    let mut alignment = PartnershipAlignment::new(
        population,
        initial_adjustment,
        year,
        targets,
        min_age_cohabitation,
        models,
        matcher,
    )?;

    let outcome = search.solve(&mut alignment)?;
    let error = alignment.evaluate(outcome.root)?;
    let observed_share = alignment.observed_share();

    let population = alignment.population();
    let eligible_persons = population.eligible_count(min_age_cohabitation);
    let test_partnered_persons = population
        .eligible(min_age_cohabitation)
        .filter(|p| p.has_test_partner())
        .count();

    info!(
        year,
        adjustment = outcome.root,
        observed_share,
        target = alignment.target(),
        converged = outcome.converged,
        "partnership alignment finished"
    );

    Ok(AlignmentReport {
        year,
        target_share: alignment.target(),
        observed_share,
        adjustment: alignment.adjustment(),
        error,
        iterations: outcome.iterations,
        evaluations: outcome.evaluations + 1,
        converged: outcome.converged,
        eligible_persons,
        test_partnered_persons,
        completed_at: Utc::now(),
    })
}

/// Counts from applying a calibrated trial to the population
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSummary {
    /// Persons whose union ended
    pub dissolutions: usize,
    /// New unions formed
    pub unions: usize,
}

/// Apply the trial left on `population` by the last evaluation.
///
/// Trial dissolutions become committed for both partners, the same
/// candidates are matched again in commit mode, and all transient state is
/// cleared. `min_age_cohabitation` must be the age the trial ran with.
pub fn commit_alignment<M: UnionMatcher>(
    population: &mut Population,
    matcher: &mut M,
    min_age_cohabitation: u32,
) -> Result<CommitSummary> {
    let dissolutions = population.commit_dissolutions();

    matcher.clear_candidates();
    for person in population.eligible(min_age_cohabitation).filter(|p| p.to_match) {
        matcher.register_candidate(person);
    }
    let outcome = matcher.match_two_phase(population, MatchMode::Commit)?;
    population.clear_test_state();

    info!(dissolutions, unions = outcome.pairs, "partnership trial committed");
    Ok(CommitSummary {
        dissolutions,
        unions: outcome.pairs,
    })
}
