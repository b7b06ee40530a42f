//! Probit models for union dissolution and formation

use serde::{Deserialize, Serialize};

use crate::behaviour::{DissolutionModel, FormationModel};
use crate::error::{AlignmentError, Result};
use crate::population::{Education, PartnershipStatus, Person};

/// Standard normal CDF.
///
/// Uses the Abramowitz and Stegun approximation (7.1.26) of erf.
pub fn standard_normal_cdf(x: f64) -> f64 {
    if x < -8.0 {
        return 0.0;
    }
    if x > 8.0 {
        return 1.0;
    }
    0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
}

fn erf(x: f64) -> f64 {
    const A1: f64 = 0.254_829_592;
    const A2: f64 = -0.284_496_736;
    const A3: f64 = 1.421_413_741;
    const A4: f64 = -1.453_152_027;
    const A5: f64 = 1.061_405_429;
    const P: f64 = 0.327_591_1;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + P * x);
    let y = 1.0 - (((((A5 * t + A4) * t) + A3) * t + A2) * t + A1) * t * (-x * x).exp();

    sign * y
}

/// Coefficients of the dissolution and formation probit equations
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProbitCoefficients {
    pub dissolution_intercept: f64,
    /// Applied to ln(1 + union years)
    pub dissolution_log_duration: f64,

    pub formation_intercept: f64,
    pub formation_age: f64,
    pub formation_age_squared: f64,
    pub formation_education_medium: f64,
    pub formation_education_high: f64,
    pub formation_previously_partnered: f64,
}

impl Default for ProbitCoefficients {
    fn default() -> Self {
        ProbitCoefficients {
            dissolution_intercept: -1.2,
            dissolution_log_duration: -0.3,

            formation_intercept: -2.6,
            formation_age: 0.11,
            formation_age_squared: -0.0016,
            formation_education_medium: 0.05,
            formation_education_high: 0.12,
            formation_previously_partnered: -0.25,
        }
    }
}

/// Default behavioural model: probit equations on person covariates
#[derive(Clone, Debug, Default)]
pub struct ProbitPartnershipModel {
    pub coefficients: ProbitCoefficients,
}

impl ProbitPartnershipModel {
    pub fn new(coefficients: ProbitCoefficients) -> Self {
        ProbitPartnershipModel { coefficients }
    }

    /// Latent index of the dissolution equation. Uses couple-level covariates
    /// only, so both partners reach the same outcome.
    pub fn dissolution_score(&self, person: &Person) -> f64 {
        let c = &self.coefficients;
        c.dissolution_intercept + c.dissolution_log_duration * (1.0 + person.union_years as f64).ln()
    }

    /// Latent index of the formation equation, before any adjustment
    pub fn formation_score(&self, person: &Person) -> f64 {
        let c = &self.coefficients;
        let age = person.age as f64;
        let education = match person.education {
            Education::Low => 0.0,
            Education::Medium => c.formation_education_medium,
            Education::High => c.formation_education_high,
        };
        let history = if person.status == PartnershipStatus::PreviouslyPartnered || person.left_partner_test {
            c.formation_previously_partnered
        } else {
            0.0
        };

        c.formation_intercept + c.formation_age * age + c.formation_age_squared * age * age + education + history
    }
}

fn checked_probability(person: &Person, score: f64) -> Result<f64> {
    if !score.is_finite() {
        return Err(AlignmentError::Model {
            person: person.id,
            reason: format!("non-finite probit index {}", score),
        });
    }
    Ok(standard_normal_cdf(score))
}

impl DissolutionModel for ProbitPartnershipModel {
    fn evaluate_dissolution(&self, person: &mut Person) -> Result<()> {
        person.left_partner_test = false;
        if !person.is_partnered() {
            return Ok(());
        }

        let probability = checked_probability(person, self.dissolution_score(person))?;
        person.left_partner_test = person.innovations.dissolution < probability;
        Ok(())
    }
}

impl FormationModel for ProbitPartnershipModel {
    fn evaluate_formation(&self, person: &mut Person, adjustment: f64) -> Result<()> {
        person.test_partner = None;
        person.to_match = false;
        person.formation_probability = 0.0;
        if person.has_intact_partnership() {
            return Ok(());
        }

        let probability = checked_probability(person, self.formation_score(person) + adjustment)?;
        person.formation_probability = probability;
        person.to_match = person.innovations.formation < probability;
        Ok(())
    }
}
