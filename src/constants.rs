//! # Constants and type definitions for resonance analysis
//!
//! This module centralizes the **physical constants**, **file-format constants**, and
//! **common type aliases** shared by the element readers, the phase computation and the
//! catalog layer.
//!
//! ## Overview
//!
//! - Angular constants (2π, degrees → radians)
//! - The Gaussian gravitational constant used for mean motions
//! - The fixed layout of the integrator "aei" files
//! - Type aliases documenting units at the call sites
//! - [`BodyName`], the naming convention shared between element files and the catalog

use std::fmt;

// -------------------------------------------------------------------------------------------------
// Physical constants and unit conversions
// -------------------------------------------------------------------------------------------------

/// 2π, useful for trigonometric conversions
pub const DPI: f64 = 2. * std::f64::consts::PI;

/// Degrees → radians
pub const RADEG: f64 = std::f64::consts::PI / 180.0;

/// Gaussian gravitational constant k (used in classical orbit dynamics)
pub const GAUSS_GRAV: f64 = 0.01720209895;

/// k², the constant K of the mean motion `n = sqrt(K / a³)`
pub const GAUSS_GRAV_SQUARED: f64 = GAUSS_GRAV * GAUSS_GRAV;

// -------------------------------------------------------------------------------------------------
// File formats
// -------------------------------------------------------------------------------------------------

/// Number of header lines at the top of every aei file.
pub const AEI_HEADER_LINES: usize = 4;

/// Extension of the integrator element files.
pub const AEI_EXTENSION: &str = "aei";

/// Prefix turning an asteroid number into a body name (`A123`).
pub const ASTEROID_PREFIX: char = 'A';

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Angle in radians
pub type Radian = f64;
/// Time in years, as written by the integrator
pub type Years = f64;
/// Distance in astronomical units
pub type Au = f64;
/// Catalog number of an asteroid
pub type AsteroidNumber = u32;
/// Row identifier in the catalog store
pub type CatalogId = i64;

// -------------------------------------------------------------------------------------------------
// Identifiers
// -------------------------------------------------------------------------------------------------

/// Name of a body as used both for its aei file and its catalog row.
///
/// Planets keep their upper-case name (`JUPITER`), asteroids are written `A<number>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BodyName {
    Planet(String),
    Asteroid(AsteroidNumber),
}

impl BodyName {
    /// File stem of the aei file holding this body's elements.
    pub fn file_stem(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for BodyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodyName::Planet(name) => write!(f, "{name}"),
            BodyName::Asteroid(number) => write!(f, "{ASTEROID_PREFIX}{number}"),
        }
    }
}

impl From<AsteroidNumber> for BodyName {
    fn from(n: AsteroidNumber) -> Self {
        BodyName::Asteroid(n)
    }
}

impl From<&str> for BodyName {
    /// `A<digits>` is read as an asteroid, anything else as a planet name.
    fn from(s: &str) -> Self {
        match crate::libration::predicates::asteroid_number(s) {
            Some(n) => BodyName::Asteroid(n),
            None => BodyName::Planet(s.to_string()),
        }
    }
}
