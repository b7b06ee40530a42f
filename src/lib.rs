//! Partnership alignment library
//!
//! Calibrates the intercept of the union formation model so that the share of
//! partnered persons in a simulated population matches a target share.
//!
//! # Module Structure
//!
//! - `population`: persons, fixed-membership population, synthetic generator
//! - `behaviour`: dissolution and formation models
//! - `matching`: two-phase union matching (regional, then cross-region)
//! - `alignment`: the alignment objective and the root search driving it
//! - `params`: configuration and target shares
//! - `error`: crate error type
//!
//! # Usage
//!
//! ```ignore
//! use partnership_alignment::{align_partnerships, AlignmentParams, ProbitPartnershipModel,
//!     RegionalMatcher, RootSearch};
//!
//! let params = AlignmentParams::default();
//! let model = ProbitPartnershipModel::new(params.model.clone());
//! let mut matcher = RegionalMatcher::new(params.matching.clone());
//! let report = align_partnerships(&mut population, 0.0, 2022, &params.targets,
//!     params.min_age_cohabitation, &model, &mut matcher, &RootSearch::new(params.search.clone()))?;
//! ```

pub mod alignment;
pub mod behaviour;
pub mod error;
pub mod matching;
pub mod params;
pub mod population;

pub use alignment::{
    align_partnerships, commit_alignment, AlignmentReport, CommitSummary, Evaluation,
    FnEvaluation, PartnershipAlignment, RootSearch, SearchOutcome, SearchParams,
};
pub use behaviour::{DissolutionModel, FormationModel, ProbitCoefficients, ProbitPartnershipModel};
pub use error::{AlignmentError, Result};
pub use matching::{MatchMode, MatchOutcome, MatchScope, MatchingParams, RegionalMatcher, UnionMatcher};
pub use params::{AlignmentParams, TargetShareCategory, TargetShareSource, TargetShareTable};
pub use population::{
    generate_population, Gender, GeneratorConfig, PartnershipStatus, Person, PersonId, Population,
    Region,
};
