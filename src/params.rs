//! Configuration parameters for partnership alignment

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::alignment::search::SearchParams;
use crate::behaviour::ProbitCoefficients;
use crate::error::{AlignmentError, Result};
use crate::matching::MatchingParams;

/// Minimum age at which a person may enter a cohabiting union
pub const DEFAULT_MIN_AGE_COHABITATION: u32 = 18;

/// Aggregate statistics that have an externally supplied target
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TargetShareCategory {
    /// Share of eligible persons living with a partner
    Partnership,
}

impl fmt::Display for TargetShareCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetShareCategory::Partnership => write!(f, "partnership"),
        }
    }
}

/// Lookup of target shares by simulation year.
pub trait TargetShareSource {
    /// Target share for `category` in `year`, guaranteed to lie in [0, 1].
    fn target_share(&self, year: i32, category: TargetShareCategory) -> Result<f64>;
}

/// Target shares observed in the data, indexed by year then category
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TargetShareTable {
    pub shares: BTreeMap<i32, BTreeMap<TargetShareCategory, f64>>,
}

impl TargetShareTable {
    pub fn new() -> Self {
        TargetShareTable {
            shares: BTreeMap::new(),
        }
    }

    /// Set (or replace) the target for a year and category
    pub fn insert(&mut self, year: i32, category: TargetShareCategory, value: f64) {
        self.shares.entry(year).or_default().insert(category, value);
    }

    /// Builder-style variant of [`TargetShareTable::insert`]
    pub fn with(mut self, year: i32, category: TargetShareCategory, value: f64) -> Self {
        self.insert(year, category, value);
        self
    }
}

impl TargetShareSource for TargetShareTable {
    fn target_share(&self, year: i32, category: TargetShareCategory) -> Result<f64> {
        let value = self
            .shares
            .get(&year)
            .and_then(|by_category| by_category.get(&category))
            .copied()
            .ok_or(AlignmentError::MissingTarget { year, category })?;

        if !(0.0..=1.0).contains(&value) {
            return Err(AlignmentError::InvalidTarget { year, category, value });
        }
        Ok(value)
    }
}

/// Main configuration for a partnership alignment run
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentParams {
    /// Persons younger than this are never eligible for a union
    pub min_age_cohabitation: u32,
    /// Target shares per year
    pub targets: TargetShareTable,
    /// Root search bracket and stopping rule
    pub search: SearchParams,
    /// Union matching constraints
    pub matching: MatchingParams,
    /// Coefficients of the default probit models
    pub model: ProbitCoefficients,
}

impl Default for AlignmentParams {
    fn default() -> Self {
        let mut targets = TargetShareTable::new();
        for (year, share) in [
            (2019, 0.562),
            (2020, 0.560),
            (2021, 0.557),
            (2022, 0.553),
            (2023, 0.550),
            (2024, 0.548),
            (2025, 0.545),
        ] {
            targets.insert(year, TargetShareCategory::Partnership, share);
        }

        AlignmentParams {
            min_age_cohabitation: DEFAULT_MIN_AGE_COHABITATION,
            targets,
            search: SearchParams::default(),
            matching: MatchingParams::default(),
            model: ProbitCoefficients::default(),
        }
    }
}

impl AlignmentParams {
    /// Load parameters from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn from_json_str(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }
}
