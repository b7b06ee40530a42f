//! Population roster
//!
//! Fixed-membership collection of persons with an id index. Callers may
//! mutate persons in place but can never add or remove them.

use rand::Rng;
use std::collections::HashMap;

use crate::error::{AlignmentError, Result};
use crate::population::types::{Innovations, PartnershipStatus, Person, PersonId};

/// All persons taking part in one calibration problem
#[derive(Clone, Debug, Default)]
pub struct Population {
    persons: Vec<Person>,
    index: HashMap<PersonId, usize>,
}

impl Population {
    /// Build a roster, rejecting duplicate ids
    pub fn new(persons: Vec<Person>) -> Result<Self> {
        let mut index = HashMap::with_capacity(persons.len());
        for (i, person) in persons.iter().enumerate() {
            if index.insert(person.id, i).is_some() {
                return Err(AlignmentError::DuplicatePerson(person.id));
            }
        }
        Ok(Population { persons, index })
    }

    pub fn len(&self) -> usize {
        self.persons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.persons.is_empty()
    }

    pub fn persons(&self) -> &[Person] {
        &self.persons
    }

    /// Mutable view of all persons. A slice, so membership stays fixed.
    pub fn persons_mut(&mut self) -> &mut [Person] {
        &mut self.persons
    }

    pub fn iter(&self) -> impl Iterator<Item = &Person> {
        self.persons.iter()
    }

    pub fn get(&self, id: PersonId) -> Option<&Person> {
        self.index.get(&id).map(|&i| &self.persons[i])
    }

    pub fn get_mut(&mut self, id: PersonId) -> Option<&mut Person> {
        self.index.get(&id).map(|&i| &mut self.persons[i])
    }

    /// Persons old enough to enter a union
    pub fn eligible(&self, min_age: u32) -> impl Iterator<Item = &Person> {
        self.persons.iter().filter(move |p| p.is_eligible(min_age))
    }

    pub fn eligible_count(&self, min_age: u32) -> usize {
        self.eligible(min_age).count()
    }

    /// Share of eligible persons counted as partnered in the current trial.
    ///
    /// Zero eligible persons gives exactly 0.0.
    pub fn considered_partnered_share(&self, min_age: u32) -> f64 {
        let (eligible, partnered) = self.eligible(min_age).fold((0usize, 0usize), |(e, p), person| {
            (e + 1, p + person.is_considered_partnered() as usize)
        });

        if eligible > 0 {
            partnered as f64 / eligible as f64
        } else {
            0.0
        }
    }

    /// Reset transient trial state on every person
    pub fn clear_test_state(&mut self) {
        for person in &mut self.persons {
            person.clear_test_state();
        }
    }

    /// Turn trial dissolutions into committed ones.
    ///
    /// A union ends for both partners when either left it in the trial, so
    /// a partner outside the eligible ages is released too. Returns the
    /// number of persons whose union ended.
    pub fn commit_dissolutions(&mut self) -> usize {
        let ending: Vec<usize> = self
            .persons
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_partnered() && p.left_partner_test)
            .flat_map(|(i, p)| {
                let partner = p.partner.and_then(|id| self.index.get(&id).copied());
                std::iter::once(i).chain(partner)
            })
            .collect();

        let mut dissolved = 0;
        for i in ending {
            let person = &mut self.persons[i];
            if person.is_partnered() {
                person.status = PartnershipStatus::PreviouslyPartnered;
                person.partner = None;
                person.union_years = 0;
                person.left_partner_test = false;
                dissolved += 1;
            }
        }
        dissolved
    }

    /// Draw fresh period innovations. Partners share their dissolution draw.
    pub fn redraw_innovations<R: Rng>(&mut self, rng: &mut R) {
        for person in &mut self.persons {
            person.innovations = Innovations::random(rng);
        }

        let shared: Vec<(usize, f64)> = self
            .persons
            .iter()
            .filter(|p| p.is_partnered())
            .filter_map(|p| {
                let partner = p.partner?;
                if partner > p.id {
                    self.index.get(&partner).map(|&i| (i, p.innovations.dissolution))
                } else {
                    None
                }
            })
            .collect();

        for (i, draw) in shared {
            self.persons[i].innovations.dissolution = draw;
        }
    }
}
