//! # Librations
//!
//! Result of classifying one resonance: the circulation breaks of its phase and, for
//! transient librations, how much of the integration was spent librating.
//!
//! * [`classifier`] – the classification state machine and its catalog driver.
//! * [`predicates`] – derived properties, in memory and as SQL fragments.
pub mod classifier;
pub mod predicates;

use serde::{Deserialize, Serialize};

use crate::constants::{CatalogId, Years};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Libration {
    pub resonance_id: CatalogId,
    /// Break times in ascending order
    pub circulation_breaks: Vec<Years>,
    pub average_delta: Option<Years>,
    /// Share of the integration spent librating, in percent
    pub percentage: Option<f64>,
    pub is_apocentric: bool,
}

impl Libration {
    pub fn is_pure(&self) -> bool {
        predicates::is_pure(&self.circulation_breaks)
    }

    pub fn is_transient(&self) -> bool {
        predicates::is_transient(
            &self.circulation_breaks,
            self.percentage,
            self.average_delta,
        )
    }
}
