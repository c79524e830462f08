pub mod batch;
pub mod catalog;
pub mod circulation;
pub mod coefficients;
pub mod config;
pub mod constants;
pub mod libration;
pub mod orbital_elements;
pub mod phase;
pub mod resonance_errors;

pub use catalog::{Catalog, ResonanceCatalogBuilder};
pub use circulation::CirculationFinder;
pub use config::{ConflictPolicy, ResonanceConfig};
pub use libration::classifier::{ClassifyMode, LibrationClassifier, LibrationOutcome};
pub use phase::{PhaseComputer, PhaseSource};
pub use resonance_errors::ResonanceError;
