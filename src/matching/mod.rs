//! Union matching
//!
//! Pairs match candidates into unions in two explicit phases:
//!
//! 1. `MatchScope::WithinRegion` pairs candidates of opposite gender who live
//!    in the same region.
//! 2. `MatchScope::AcrossRegions` pairs the candidates still unmatched after
//!    phase one, ignoring region.
//!
//! Region-respecting pairings take priority: a person matched in phase one
//! leaves the candidate pool and is never re-paired by phase two, so the
//! phases must run in this order and never concurrently.
//!
//! In `MatchMode::Test` only the transient `test_partner` field is written;
//! committed partnership records are left untouched.

pub mod regional;

pub use regional::RegionalMatcher;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::population::{Person, Population};

/// Whether matching writes committed unions or only trial pairings
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchMode {
    Commit,
    Test,
}

/// Which matching phase to run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchScope {
    WithinRegion,
    AcrossRegions,
}

/// Union matching constraints
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MatchingParams {
    /// Largest age gap allowed between partners
    pub max_age_difference: u32,
}

impl Default for MatchingParams {
    fn default() -> Self {
        MatchingParams {
            max_age_difference: 10,
        }
    }
}

/// Summary of one matching phase
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOutcome {
    /// Unions formed in this phase
    pub pairs: usize,
    /// Candidates left in the pool afterwards
    pub unmatched_females: usize,
    pub unmatched_males: usize,
}

/// Matching algorithm that pairs registered candidates into unions.
pub trait UnionMatcher {
    /// Drop all pending candidates. Never touches the population.
    fn clear_candidates(&mut self);

    /// Add a person to the candidate pool
    fn register_candidate(&mut self, person: &Person);

    /// Run one matching phase over the current candidate pool.
    fn match_unions(
        &mut self,
        population: &mut Population,
        mode: MatchMode,
        scope: MatchScope,
    ) -> Result<MatchOutcome>;

    /// Run both phases in priority order
    fn match_two_phase(&mut self, population: &mut Population, mode: MatchMode) -> Result<MatchOutcome> {
        let regional = self.match_unions(population, mode, MatchScope::WithinRegion)?;
        let national = self.match_unions(population, mode, MatchScope::AcrossRegions)?;
        Ok(MatchOutcome {
            pairs: regional.pairs + national.pairs,
            unmatched_females: national.unmatched_females,
            unmatched_males: national.unmatched_males,
        })
    }
}
