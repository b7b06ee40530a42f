//! Closest-age matching with a regional first phase

use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use crate::error::{AlignmentError, Result};
use crate::matching::{MatchMode, MatchOutcome, MatchScope, MatchingParams, UnionMatcher};
use crate::population::{Gender, PartnershipStatus, Person, PersonId, Population, Region};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Candidate {
    id: PersonId,
    age: u32,
}

#[derive(Clone, Debug, Default)]
struct CandidatePool {
    females: Vec<Candidate>,
    males: Vec<Candidate>,
}

impl CandidatePool {
    fn len(&self) -> (usize, usize) {
        (self.females.len(), self.males.len())
    }
}

/// Default union matcher.
///
/// Women are visited youngest first and paired with the free man closest in
/// age, provided the gap stays within `max_age_difference`.
#[derive(Clone, Debug, Default)]
pub struct RegionalMatcher {
    params: MatchingParams,
    /// Pending candidates by region; BTreeMap keeps matching order stable
    pools: BTreeMap<Region, CandidatePool>,
    registered: HashSet<PersonId>,
}

impl RegionalMatcher {
    pub fn new(params: MatchingParams) -> Self {
        RegionalMatcher {
            params,
            pools: BTreeMap::new(),
            registered: HashSet::new(),
        }
    }

    /// Number of pending (female, male) candidates
    pub fn pending(&self) -> (usize, usize) {
        self.pools.values().fold((0, 0), |(f, m), pool| {
            let (pf, pm) = pool.len();
            (f + pf, m + pm)
        })
    }

    /// Greedy closest-age pairing. Matched candidates are removed from both
    /// lists; the unmatched remain.
    fn pair(
        females: &mut Vec<Candidate>,
        males: &mut Vec<Candidate>,
        max_age_difference: u32,
    ) -> Vec<(PersonId, PersonId)> {
        females.sort_by_key(|c| (c.age, c.id));
        males.sort_by_key(|c| (c.age, c.id));

        let mut pairs = Vec::new();
        let mut unmatched_females = Vec::new();

        for female in females.drain(..) {
            let best = males
                .iter()
                .enumerate()
                .map(|(slot, male)| (slot, male.age.abs_diff(female.age)))
                .filter(|&(_, gap)| gap <= max_age_difference)
                .min_by_key(|&(slot, gap)| (gap, slot));

            match best {
                Some((slot, _)) => {
                    let male = males.remove(slot);
                    pairs.push((female.id, male.id));
                }
                None => unmatched_females.push(female),
            }
        }

        *females = unmatched_females;
        pairs
    }

    fn apply_pair(
        population: &mut Population,
        mode: MatchMode,
        female: PersonId,
        male: PersonId,
    ) -> Result<()> {
        for id in [female, male] {
            let person = population
                .get(id)
                .ok_or_else(|| AlignmentError::Matching(format!("{} is not in the population", id)))?;
            let blocked = match mode {
                MatchMode::Test => person.has_intact_partnership(),
                MatchMode::Commit => person.is_partnered(),
            };
            if blocked {
                return Err(AlignmentError::Matching(format!(
                    "{} is a candidate but still has a committed partner",
                    id
                )));
            }
        }

        for (me, other) in [(female, male), (male, female)] {
            if let Some(person) = population.get_mut(me) {
                match mode {
                    MatchMode::Test => person.test_partner = Some(other),
                    MatchMode::Commit => commit_union(person, other),
                }
            }
        }
        Ok(())
    }
}

fn commit_union(person: &mut Person, partner: PersonId) {
    person.status = PartnershipStatus::Partnered;
    person.partner = Some(partner);
    person.union_years = 0;
    person.left_partner_test = false;
    person.test_partner = None;
    person.to_match = false;
}

impl UnionMatcher for RegionalMatcher {
    fn clear_candidates(&mut self) {
        self.pools.clear();
        self.registered.clear();
    }

    fn register_candidate(&mut self, person: &Person) {
        if !self.registered.insert(person.id) {
            return;
        }
        let candidate = Candidate {
            id: person.id,
            age: person.age,
        };
        let pool = self.pools.entry(person.region).or_default();
        match person.gender {
            Gender::Female => pool.females.push(candidate),
            Gender::Male => pool.males.push(candidate),
        }
    }

    fn match_unions(
        &mut self,
        population: &mut Population,
        mode: MatchMode,
        scope: MatchScope,
    ) -> Result<MatchOutcome> {
        let max_gap = self.params.max_age_difference;
        let pairs = match scope {
            MatchScope::WithinRegion => {
                let mut pairs = Vec::new();
                for pool in self.pools.values_mut() {
                    pairs.extend(Self::pair(&mut pool.females, &mut pool.males, max_gap));
                }
                pairs
            }
            MatchScope::AcrossRegions => {
                let mut females: Vec<Candidate> =
                    self.pools.values().flat_map(|p| p.females.iter().copied()).collect();
                let mut males: Vec<Candidate> =
                    self.pools.values().flat_map(|p| p.males.iter().copied()).collect();
                let pairs = Self::pair(&mut females, &mut males, max_gap);

                let matched: HashSet<PersonId> = pairs.iter().flat_map(|&(f, m)| [f, m]).collect();
                for pool in self.pools.values_mut() {
                    pool.females.retain(|c| !matched.contains(&c.id));
                    pool.males.retain(|c| !matched.contains(&c.id));
                }
                pairs
            }
        };

        for &(female, male) in &pairs {
            Self::apply_pair(population, mode, female, male)?;
            self.registered.remove(&female);
            self.registered.remove(&male);
        }

        let (unmatched_females, unmatched_males) = self.pending();
        debug!(
            ?scope,
            ?mode,
            pairs = pairs.len(),
            unmatched_females,
            unmatched_males,
            "union matching phase complete"
        );

        Ok(MatchOutcome {
            pairs: pairs.len(),
            unmatched_females,
            unmatched_males,
        })
    }
}
