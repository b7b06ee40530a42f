//! Synthetic population generation
//!
//! Builds a seeded population with a plausible age structure and a set of
//! committed couples, used by the command-line driver and by tests.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Result;
use crate::params::DEFAULT_MIN_AGE_COHABITATION;
use crate::population::roster::Population;
use crate::population::types::{Education, Gender, PartnershipStatus, Person, PersonId, Region};

/// Shape of a generated population
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Number of persons to create
    pub persons: usize,
    /// Number of regions persons are spread over
    pub regions: u16,
    /// Oldest age generated
    pub max_age: u32,
    /// Chance that an adult woman starts the period in a union
    pub partnered_share: f64,
    /// Largest age gap for an initial couple
    pub max_couple_age_gap: u32,
    /// Youngest age at which a person can start the period in a union
    pub min_age_cohabitation: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            persons: 10_000,
            regions: 12,
            max_age: 90,
            partnered_share: 0.6,
            max_couple_age_gap: 8,
            min_age_cohabitation: DEFAULT_MIN_AGE_COHABITATION,
        }
    }
}

/// Generate a population from `config`, drawing period innovations as well
pub fn generate_population<R: Rng>(config: &GeneratorConfig, rng: &mut R) -> Result<Population> {
    let regions = config.regions.max(1);
    let mut persons: Vec<Person> = (0..config.persons)
        .map(|i| {
            let age = rng.gen_range(0..=config.max_age);
            let gender = Gender::random(rng);
            let region = Region(rng.gen_range(0..regions));
            let mut person = Person::new(PersonId(i as u64), age, gender, region);
            person.education = random_education(rng);
            person
        })
        .collect();

    form_initial_couples(&mut persons, config, rng);

    let mut population = Population::new(persons)?;
    population.redraw_innovations(rng);
    Ok(population)
}

fn random_education<R: Rng>(rng: &mut R) -> Education {
    let roll = rng.gen::<f32>();
    if roll < 0.3 {
        Education::Low
    } else if roll < 0.75 {
        Education::Medium
    } else {
        Education::High
    }
}

/// Pair adult women with the closest-aged free man in their region
fn form_initial_couples<R: Rng>(persons: &mut [Person], config: &GeneratorConfig, rng: &mut R) {
    let min_age = config.min_age_cohabitation;
    let mut free_men: BTreeMap<Region, Vec<usize>> = BTreeMap::new();
    for (i, p) in persons.iter().enumerate() {
        if p.gender == Gender::Male && p.is_eligible(min_age) {
            free_men.entry(p.region).or_default().push(i);
        }
    }

    let women: Vec<usize> = persons
        .iter()
        .enumerate()
        .filter(|(_, p)| p.gender == Gender::Female && p.is_eligible(min_age))
        .map(|(i, _)| i)
        .collect();

    for w in women {
        if !rng.gen_bool(config.partnered_share.clamp(0.0, 1.0)) {
            continue;
        }
        let (age, region) = (persons[w].age, persons[w].region);
        let Some(candidates) = free_men.get_mut(&region) else {
            continue;
        };

        let best = candidates
            .iter()
            .enumerate()
            .map(|(slot, &m)| (slot, persons[m].age.abs_diff(age)))
            .filter(|&(_, gap)| gap <= config.max_couple_age_gap)
            .min_by_key(|&(_, gap)| gap);

        if let Some((slot, _)) = best {
            let m = candidates.swap_remove(slot);
            let union_years = rng.gen_range(0..=age.min(persons[m].age) - min_age);

            for (me, other) in [(w, m), (m, w)] {
                let other_id = persons[other].id;
                let person = &mut persons[me];
                person.status = PartnershipStatus::Partnered;
                person.partner = Some(other_id);
                person.union_years = union_years;
            }
        }
    }

    // Adults without a union: some have had one before
    for p in persons.iter_mut() {
        if p.age >= min_age + 5 && !p.is_partnered() && rng.gen_bool(0.35) {
            p.status = PartnershipStatus::PreviouslyPartnered;
        }
    }
}
