//! Catalog tables and connection pragmas.
//!
//! Every table keyed by an explicit `id` draws it from `id_sequence` (see
//! [`super::sequence`]); the natural keys are enforced by `UNIQUE` constraints so that
//! `ON CONFLICT(<natural key>) DO NOTHING` can deduplicate without hiding primary-key
//! collisions.
use rusqlite::Connection;

use crate::resonance_errors::ResonanceError;

/// Tables of the catalog store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogTable {
    Planet,
    Asteroid,
    TwoBodyResonance,
    ThreeBodyResonance,
    TwoBodyLibration,
    ThreeBodyLibration,
    BrokenAsteroid,
}

impl CatalogTable {
    pub fn as_str(self) -> &'static str {
        match self {
            CatalogTable::Planet => "planet",
            CatalogTable::Asteroid => "asteroid",
            CatalogTable::TwoBodyResonance => "two_body_resonance",
            CatalogTable::ThreeBodyResonance => "three_body_resonance",
            CatalogTable::TwoBodyLibration => "two_body_libration",
            CatalogTable::ThreeBodyLibration => "three_body_libration",
            CatalogTable::BrokenAsteroid => "broken_asteroid",
        }
    }
}

impl std::fmt::Display for CatalogTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS id_sequence (
    table_name TEXT PRIMARY KEY,
    next_value INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS planet (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    longitude_coeff INTEGER NOT NULL,
    perihelion_longitude_coeff INTEGER NOT NULL,
    UNIQUE (name, longitude_coeff, perihelion_longitude_coeff)
);

CREATE TABLE IF NOT EXISTS asteroid (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    longitude_coeff INTEGER NOT NULL,
    perihelion_longitude_coeff INTEGER NOT NULL,
    axis REAL NOT NULL,
    UNIQUE (name, longitude_coeff, perihelion_longitude_coeff, axis)
);
CREATE INDEX IF NOT EXISTS idx_asteroid_name ON asteroid(name);

CREATE TABLE IF NOT EXISTS two_body_resonance (
    id INTEGER PRIMARY KEY,
    first_body_id INTEGER NOT NULL REFERENCES planet(id),
    small_body_id INTEGER NOT NULL REFERENCES asteroid(id),
    UNIQUE (first_body_id, small_body_id)
);

CREATE TABLE IF NOT EXISTS three_body_resonance (
    id INTEGER PRIMARY KEY,
    first_body_id INTEGER NOT NULL REFERENCES planet(id),
    second_body_id INTEGER NOT NULL REFERENCES planet(id),
    small_body_id INTEGER NOT NULL REFERENCES asteroid(id),
    UNIQUE (first_body_id, second_body_id, small_body_id)
);

CREATE TABLE IF NOT EXISTS two_body_libration (
    id INTEGER PRIMARY KEY,
    resonance_id INTEGER NOT NULL UNIQUE REFERENCES two_body_resonance(id),
    circulation_breaks TEXT NOT NULL DEFAULT '[]',
    average_delta REAL,
    percentage REAL,
    is_apocentric INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS three_body_libration (
    id INTEGER PRIMARY KEY,
    resonance_id INTEGER NOT NULL UNIQUE REFERENCES three_body_resonance(id),
    circulation_breaks TEXT NOT NULL DEFAULT '[]',
    average_delta REAL,
    percentage REAL,
    is_apocentric INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS broken_asteroid (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    reason TEXT
);
";

pub(crate) fn apply_pragmas(conn: &Connection) -> Result<(), ResonanceError> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )?;
    Ok(())
}

pub(crate) fn create_tables(conn: &Connection) -> Result<(), ResonanceError> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}
