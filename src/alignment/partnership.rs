//! Partnership alignment
//!
//! Calibrates the intercept shift of the union formation model so that the
//! simulated share of partnered persons matches the target share for the
//! current year.
//!
//! Each evaluation runs a shadow pass of dissolution, formation and union
//! matching that only writes transient per-person fields:
//!
//! 1. clear pending match candidates
//! 2. dissolution for every eligible person (parallel)
//! 3. formation under the trial adjustment for every eligible person
//!    (parallel), then candidate registration in population order
//! 4. test matching, regional phase then cross-region phase
//! 5. error = target - share of eligible persons counted as partnered
//!
//! Evaluations must run one at a time, and nothing else may touch the
//! population while one is in progress.

use rayon::prelude::*;
use tracing::debug;

use crate::alignment::Evaluation;
use crate::behaviour::{DissolutionModel, FormationModel};
use crate::error::Result;
use crate::matching::{MatchMode, MatchScope, UnionMatcher};
use crate::params::{TargetShareCategory, TargetShareSource};
use crate::population::Population;

/// Root-search objective for the union formation intercept
pub struct PartnershipAlignment<'a, B, M> {
    population: &'a mut Population,
    models: &'a B,
    matcher: &'a mut M,
    min_age_cohabitation: u32,
    target_share: f64,
    partnership_adjustment: f64,
    partnership_adjustment_changed: bool,
}

impl<'a, B, M> PartnershipAlignment<'a, B, M>
where
    B: DissolutionModel + FormationModel,
    M: UnionMatcher,
{
    /// Look up the partnership target for `year`. Does not touch the
    /// population.
    pub fn new<T: TargetShareSource + ?Sized>(
        population: &'a mut Population,
        partnership_adjustment: f64,
        year: i32,
        targets: &T,
        min_age_cohabitation: u32,
        models: &'a B,
        matcher: &'a mut M,
    ) -> Result<Self> {
        let target_share = targets.target_share(year, TargetShareCategory::Partnership)?;
        Ok(PartnershipAlignment {
            population,
            models,
            matcher,
            min_age_cohabitation,
            target_share,
            partnership_adjustment,
            partnership_adjustment_changed: false,
        })
    }

    pub fn target(&self) -> f64 {
        self.target_share
    }

    /// Adjustment applied by the most recent evaluation, or the initial value
    pub fn adjustment(&self) -> f64 {
        self.partnership_adjustment
    }

    /// True once any evaluation has completed
    pub fn adjustment_changed(&self) -> bool {
        self.partnership_adjustment_changed
    }

    pub fn min_age_cohabitation(&self) -> u32 {
        self.min_age_cohabitation
    }

    pub fn population(&self) -> &Population {
        self.population
    }

    /// Share of eligible persons counted as partnered after the last trial
    pub fn observed_share(&self) -> f64 {
        self.population.considered_partnered_share(self.min_age_cohabitation)
    }

    fn evaluate_dissolutions(&mut self) -> Result<()> {
        let min_age = self.min_age_cohabitation;
        let models = self.models;
        self.population
            .persons_mut()
            .par_iter_mut()
            .filter(|p| p.is_eligible(min_age))
            .try_for_each(|p| models.evaluate_dissolution(p))
    }

    /// Re-run formation under `adjustment` and create test unions
    fn adjust_partnerships(&mut self, adjustment: f64) -> Result<()> {
        let min_age = self.min_age_cohabitation;
        let models = self.models;
        self.population
            .persons_mut()
            .par_iter_mut()
            .filter(|p| p.is_eligible(min_age))
            .try_for_each(|p| models.evaluate_formation(p, adjustment))?;

        for person in self.population.eligible(min_age).filter(|p| p.to_match) {
            self.matcher.register_candidate(person);
        }

        let regional = self
            .matcher
            .match_unions(self.population, MatchMode::Test, MatchScope::WithinRegion)?;
        let national = self
            .matcher
            .match_unions(self.population, MatchMode::Test, MatchScope::AcrossRegions)?;
        debug!(
            adjustment,
            regional_pairs = regional.pairs,
            cross_region_pairs = national.pairs,
            "test union matching done"
        );

        self.partnership_adjustment = adjustment;
        self.partnership_adjustment_changed = true;
        Ok(())
    }
}

impl<'a, B, M> Evaluation for PartnershipAlignment<'a, B, M>
where
    B: DissolutionModel + FormationModel,
    M: UnionMatcher,
{
    fn evaluate(&mut self, adjustment: f64) -> Result<f64> {
        self.matcher.clear_candidates();
        self.evaluate_dissolutions()?;
        self.adjust_partnerships(adjustment)?;

        let share = self.observed_share();
        let error = self.target_share - share;
        debug!(adjustment, share, error, "partnership alignment evaluated");
        Ok(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behaviour::ProbitPartnershipModel;
    use crate::error::AlignmentError;
    use crate::matching::{MatchOutcome, MatchingParams, RegionalMatcher};
    use crate::params::TargetShareTable;
    use crate::population::{
        generate_population, Gender, GeneratorConfig, Innovations, PartnershipStatus, Person,
        PersonId, Region,
    };
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const YEAR: i32 = 2020;
    const MIN_AGE: u32 = 18;

    fn targets(share: f64) -> TargetShareTable {
        TargetShareTable::new().with(YEAR, TargetShareCategory::Partnership, share)
    }

    /// Marks the first `round(adjustment * 10)` ids as candidates; never
    /// dissolves anything.
    struct CountingModel;

    impl DissolutionModel for CountingModel {
        fn evaluate_dissolution(&self, person: &mut Person) -> Result<()> {
            person.left_partner_test = false;
            Ok(())
        }
    }

    impl FormationModel for CountingModel {
        fn evaluate_formation(&self, person: &mut Person, adjustment: f64) -> Result<()> {
            let wanted = (adjustment * 10.0).round().clamp(0.0, 10.0) as u64;
            person.test_partner = None;
            person.to_match = person.id.0 < wanted;
            Ok(())
        }
    }

    /// Gives every registered candidate a partner from outside the population
    #[derive(Default)]
    struct EveryoneMatcher {
        pending: Vec<PersonId>,
        calls: Vec<MatchScope>,
    }

    impl UnionMatcher for EveryoneMatcher {
        fn clear_candidates(&mut self) {
            self.pending.clear();
        }

        fn register_candidate(&mut self, person: &Person) {
            self.pending.push(person.id);
        }

        fn match_unions(
            &mut self,
            population: &mut Population,
            _mode: MatchMode,
            scope: MatchScope,
        ) -> Result<MatchOutcome> {
            self.calls.push(scope);
            let pairs = self.pending.len();
            for id in self.pending.drain(..) {
                if let Some(p) = population.get_mut(id) {
                    p.test_partner = Some(PersonId(u64::MAX));
                }
            }
            Ok(MatchOutcome {
                pairs,
                ..MatchOutcome::default()
            })
        }
    }

    struct FailingModel;

    impl DissolutionModel for FailingModel {
        fn evaluate_dissolution(&self, person: &mut Person) -> Result<()> {
            Err(AlignmentError::Model {
                person: person.id,
                reason: "no coefficients".to_string(),
            })
        }
    }

    impl FormationModel for FailingModel {
        fn evaluate_formation(&self, _person: &mut Person, _adjustment: f64) -> Result<()> {
            Ok(())
        }
    }

    fn adults(n: u64) -> Population {
        let persons = (0..n)
            .map(|i| Person::new(PersonId(i), 30, Gender::Female, Region(0)))
            .collect();
        Population::new(persons).unwrap()
    }

    #[test]
    fn test_counting_scenario() {
        let mut population = adults(10);
        let mut matcher = EveryoneMatcher::default();
        let mut alignment = PartnershipAlignment::new(
            &mut population,
            0.0,
            YEAR,
            &targets(0.6),
            MIN_AGE,
            &CountingModel,
            &mut matcher,
        )
        .unwrap();

        assert!((alignment.evaluate(0.6).unwrap() - 0.0).abs() < 1e-12);
        assert!((alignment.evaluate(0.3).unwrap() - 0.3).abs() < 1e-12);
        assert!((alignment.evaluate(0.6).unwrap() - 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_matching_runs_regional_phase_first() {
        let mut population = adults(4);
        let mut matcher = EveryoneMatcher::default();
        {
            let mut alignment = PartnershipAlignment::new(
                &mut population,
                0.0,
                YEAR,
                &targets(0.5),
                MIN_AGE,
                &CountingModel,
                &mut matcher,
            )
            .unwrap();
            alignment.evaluate(0.2).unwrap();
        }
        assert_eq!(matcher.calls, vec![MatchScope::WithinRegion, MatchScope::AcrossRegions]);
    }

    #[test]
    fn test_no_eligible_persons_returns_target() {
        let persons = (0..5)
            .map(|i| Person::new(PersonId(i), 12, Gender::Male, Region(0)))
            .collect();
        let mut population = Population::new(persons).unwrap();
        let model = ProbitPartnershipModel::default();
        let mut matcher = RegionalMatcher::default();
        let mut alignment = PartnershipAlignment::new(
            &mut population,
            0.0,
            YEAR,
            &targets(0.55),
            MIN_AGE,
            &model,
            &mut matcher,
        )
        .unwrap();

        for trial in [-5.0, 0.0, 0.7, 5.0, 0.7] {
            assert_eq!(alignment.evaluate(trial).unwrap(), 0.55);
        }
    }

    #[test]
    fn test_empty_population_returns_target() {
        let mut population = Population::default();
        let model = ProbitPartnershipModel::default();
        let mut matcher = RegionalMatcher::default();
        let mut alignment = PartnershipAlignment::new(
            &mut population,
            0.0,
            YEAR,
            &targets(0.4),
            MIN_AGE,
            &model,
            &mut matcher,
        )
        .unwrap();

        assert_eq!(alignment.evaluate(1.5).unwrap(), 0.4);
    }

    #[test]
    fn test_everyone_partnered_returns_target_minus_one() {
        let mut population = adults(6);
        let mut matcher = EveryoneMatcher::default();
        let mut alignment = PartnershipAlignment::new(
            &mut population,
            0.0,
            YEAR,
            &targets(0.7),
            MIN_AGE,
            &CountingModel,
            &mut matcher,
        )
        .unwrap();

        assert!((alignment.evaluate(1.0).unwrap() - (0.7 - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_state_transition_records_last_trial() {
        let mut population = adults(3);
        let mut matcher = EveryoneMatcher::default();
        let mut alignment = PartnershipAlignment::new(
            &mut population,
            0.25,
            YEAR,
            &targets(0.5),
            MIN_AGE,
            &CountingModel,
            &mut matcher,
        )
        .unwrap();

        assert!(!alignment.adjustment_changed());
        assert_eq!(alignment.adjustment(), 0.25);

        alignment.evaluate(0.9).unwrap();
        assert!(alignment.adjustment_changed());
        assert_eq!(alignment.adjustment(), 0.9);

        alignment.evaluate(-0.4).unwrap();
        assert_eq!(alignment.adjustment(), -0.4);
    }

    #[test]
    fn test_construction_leaves_population_untouched() {
        let mut population = adults(3);
        population.persons_mut()[0].test_partner = Some(PersonId(77));
        let mut matcher = EveryoneMatcher::default();
        let alignment = PartnershipAlignment::new(
            &mut population,
            0.0,
            YEAR,
            &targets(0.5),
            MIN_AGE,
            &CountingModel,
            &mut matcher,
        )
        .unwrap();

        assert_eq!(alignment.population().persons()[0].test_partner, Some(PersonId(77)));
        assert!(!alignment.adjustment_changed());
    }

    #[test]
    fn test_missing_target_fails_construction() {
        let mut population = adults(3);
        let mut matcher = EveryoneMatcher::default();
        let result = PartnershipAlignment::new(
            &mut population,
            0.0,
            1900,
            &targets(0.5),
            MIN_AGE,
            &CountingModel,
            &mut matcher,
        );
        assert!(matches!(result, Err(AlignmentError::MissingTarget { year: 1900, .. })));
    }

    #[test]
    fn test_model_failure_propagates() {
        let mut population = adults(3);
        let mut matcher = EveryoneMatcher::default();
        let mut alignment = PartnershipAlignment::new(
            &mut population,
            0.0,
            YEAR,
            &targets(0.5),
            MIN_AGE,
            &FailingModel,
            &mut matcher,
        )
        .unwrap();

        assert!(matches!(alignment.evaluate(0.1), Err(AlignmentError::Model { .. })));
        assert!(!alignment.adjustment_changed());
    }

    #[test]
    fn test_dissolved_unions_stop_counting() {
        let mut f = Person::new(PersonId(1), 40, Gender::Female, Region(0));
        let mut m = Person::new(PersonId(2), 41, Gender::Male, Region(0));
        for (p, other) in [(&mut f, PersonId(2)), (&mut m, PersonId(1))] {
            p.status = PartnershipStatus::Partnered;
            p.partner = Some(other);
            p.innovations = Innovations {
                dissolution: 0.0,
                formation: 1.0,
            };
        }
        let mut population = Population::new(vec![f, m]).unwrap();
        let model = ProbitPartnershipModel::default();
        let mut matcher = RegionalMatcher::default();
        let mut alignment = PartnershipAlignment::new(
            &mut population,
            0.0,
            YEAR,
            &targets(0.5),
            MIN_AGE,
            &model,
            &mut matcher,
        )
        .unwrap();

        // Draw 0.0 always dissolves; draw 1.0 never re-forms
        assert_eq!(alignment.evaluate(0.0).unwrap(), 0.5);
        drop(alignment);
        for p in population.iter() {
            assert!(p.left_partner_test);
            assert!(p.is_partnered());
        }
    }

    #[test]
    fn test_dissolved_partners_can_rematch_in_trial() {
        let mut f = Person::new(PersonId(1), 40, Gender::Female, Region(0));
        let mut m = Person::new(PersonId(2), 41, Gender::Male, Region(0));
        for (p, other) in [(&mut f, PersonId(2)), (&mut m, PersonId(1))] {
            p.status = PartnershipStatus::Partnered;
            p.partner = Some(other);
            p.innovations = Innovations {
                dissolution: 0.0,
                formation: 0.0,
            };
        }
        let mut population = Population::new(vec![f, m]).unwrap();
        let model = ProbitPartnershipModel::default();
        let mut matcher = RegionalMatcher::default();
        let mut alignment = PartnershipAlignment::new(
            &mut population,
            0.0,
            YEAR,
            &targets(0.5),
            MIN_AGE,
            &model,
            &mut matcher,
        )
        .unwrap();

        assert_eq!(alignment.evaluate(0.0).unwrap(), 0.5 - 1.0);
    }

    fn generated(seed: u64) -> Population {
        let config = GeneratorConfig {
            persons: 400,
            regions: 4,
            ..GeneratorConfig::default()
        };
        generate_population(&config, &mut ChaCha8Rng::seed_from_u64(seed)).unwrap()
    }

    #[test]
    fn test_repeated_trials_are_reproducible() {
        let mut population = generated(11);
        let model = ProbitPartnershipModel::default();
        let mut matcher = RegionalMatcher::default();
        let mut alignment = PartnershipAlignment::new(
            &mut population,
            0.0,
            YEAR,
            &targets(0.56),
            MIN_AGE,
            &model,
            &mut matcher,
        )
        .unwrap();

        let first = alignment.evaluate(0.3).unwrap();
        alignment.evaluate(-1.2).unwrap();
        alignment.evaluate(2.0).unwrap();
        let again = alignment.evaluate(0.3).unwrap();
        assert_eq!(first, again);
    }

    #[test]
    fn test_trials_never_commit_unions() {
        let mut population = generated(5);
        let committed: Vec<_> = population.iter().map(|p| (p.status, p.partner)).collect();
        let model = ProbitPartnershipModel::default();
        let mut matcher = RegionalMatcher::default();
        {
            let mut alignment = PartnershipAlignment::new(
                &mut population,
                0.0,
                YEAR,
                &targets(0.56),
                MIN_AGE,
                &model,
                &mut matcher,
            )
            .unwrap();
            alignment.evaluate(1.5).unwrap();
        }

        let after: Vec<_> = population.iter().map(|p| (p.status, p.partner)).collect();
        assert_eq!(committed, after);
        assert!(population.iter().any(|p| p.has_test_partner()));
        assert!(population
            .iter()
            .filter(|p| !p.is_eligible(MIN_AGE))
            .all(|p| !p.has_test_partner()));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn share_never_falls_as_adjustment_rises(
            seed in 0u64..1_000,
            low in -3.0f64..3.0,
            step in 0.0f64..2.0,
        ) {
            let mut population = generated(seed);
            let model = ProbitPartnershipModel::default();
            // No age limit, so every extra candidate can be paired
            let mut matcher = RegionalMatcher::new(MatchingParams { max_age_difference: 200 });
            let mut alignment = PartnershipAlignment::new(
                &mut population,
                0.0,
                YEAR,
                &targets(0.56),
                MIN_AGE,
                &model,
                &mut matcher,
            )
            .unwrap();

            let error_low = alignment.evaluate(low).unwrap();
            let error_high = alignment.evaluate(low + step).unwrap();
            prop_assert!(error_high <= error_low + 1e-12);
        }
    }
}
