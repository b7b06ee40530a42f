//! Person types and structures
//!
//! Defines individuals with the committed partnership record plus the
//! transient fields written by trial (non-committing) alignment passes.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a person
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PersonId(pub u64);

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Person#{}", self.0)
    }
}

/// Geographic region used by the first matching phase
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Region(pub u16);

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Region#{}", self.0)
    }
}

/// Biological sex of a person
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        if rng.gen_bool(0.5) {
            Gender::Male
        } else {
            Gender::Female
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Gender::Male => Gender::Female,
            Gender::Female => Gender::Male,
        }
    }
}

/// Highest completed education level
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Education {
    Low,
    Medium,
    High,
}

/// Committed partnership status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartnershipStatus {
    /// Living with a partner
    Partnered,
    /// Has never lived with a partner
    SingleNeverPartnered,
    /// Lived with a partner before, currently single
    PreviouslyPartnered,
}

impl Default for PartnershipStatus {
    fn default() -> Self {
        PartnershipStatus::SingleNeverPartnered
    }
}

/// Uniform draws fixed for one simulation period.
///
/// Every trial evaluation compares model probabilities against the same
/// draws, so re-running a trial with the same adjustment gives the same
/// outcome and raising the adjustment never removes a match candidate.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Innovations {
    /// Shared by both members of a couple
    pub dissolution: f64,
    pub formation: f64,
}

impl Innovations {
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        Innovations {
            dissolution: rng.gen::<f64>(),
            formation: rng.gen::<f64>(),
        }
    }
}

impl Default for Innovations {
    fn default() -> Self {
        // Never dissolves, never forms
        Innovations {
            dissolution: 1.0,
            formation: 1.0,
        }
    }
}

/// An individual in the simulated population
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Person {
    /// Unique identifier
    pub id: PersonId,
    /// Age in years
    pub age: u32,
    pub gender: Gender,
    pub region: Region,
    pub education: Education,
    /// Committed partnership status
    pub status: PartnershipStatus,
    /// Committed partner (if partnered)
    pub partner: Option<PersonId>,
    /// Years spent in the current union
    pub union_years: u32,
    /// Period draws used by the behavioural models
    pub innovations: Innovations,

    // Transient state written by trial passes
    /// Union dissolved in the current trial
    pub left_partner_test: bool,
    /// Partner assigned by a non-committing match
    pub test_partner: Option<PersonId>,
    /// Selected as a match candidate in the current trial
    pub to_match: bool,
    /// Union formation probability from the last formation evaluation
    pub formation_probability: f64,
}

impl Person {
    pub fn new(id: PersonId, age: u32, gender: Gender, region: Region) -> Self {
        Person {
            id,
            age,
            gender,
            region,
            education: Education::Medium,
            status: PartnershipStatus::SingleNeverPartnered,
            partner: None,
            union_years: 0,
            innovations: Innovations::default(),
            left_partner_test: false,
            test_partner: None,
            to_match: false,
            formation_probability: 0.0,
        }
    }

    /// Old enough to enter a union
    pub fn is_eligible(&self, min_age: u32) -> bool {
        self.age >= min_age
    }

    pub fn is_partnered(&self) -> bool {
        self.status == PartnershipStatus::Partnered
    }

    pub fn has_test_partner(&self) -> bool {
        self.test_partner.is_some()
    }

    pub fn has_left_partner_test(&self) -> bool {
        self.left_partner_test
    }

    /// Committed union that survived the current trial's dissolution step
    pub fn has_intact_partnership(&self) -> bool {
        self.is_partnered() && !self.left_partner_test
    }

    /// Counted as partnered in the aggregate share of a trial
    pub fn is_considered_partnered(&self) -> bool {
        self.has_test_partner() || self.has_intact_partnership()
    }

    /// Forget everything written by trial passes
    pub fn clear_test_state(&mut self) {
        self.left_partner_test = false;
        self.test_partner = None;
        self.to_match = false;
        self.formation_probability = 0.0;
    }
}
