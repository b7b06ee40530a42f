//! Population of individuals subject to partnership alignment
//!
//! - `types`: persons, ids, partnership status and period innovations
//! - `roster`: fixed-membership population with id lookup and share helpers
//! - `generator`: seeded synthetic populations

pub mod types;
pub mod roster;
pub mod generator;

pub use types::{
    Education, Gender, Innovations, PartnershipStatus, Person, PersonId, Region,
};
pub use roster::Population;
pub use generator::{generate_population, GeneratorConfig};
