//! # Resonance catalog
//!
//! Relational store of the bodies, resonances, librations and broken asteroids, backed
//! by SQLite through [`rusqlite`].
//!
//! ## Overview
//! -----------------
//! * [`Catalog`] – explicit store handle, passed to every component that reads or writes
//!   the catalog. Tables are created when the handle is opened.
//! * [`bodies`] – [`CelestialBody`] descriptors and their deduplicated insertion.
//! * [`builder`] – [`ResonanceCatalogBuilder`], creating the body and resonance rows of
//!   one coefficient row exactly once.
//! * [`sequence`] – identity counters with stale-counter recovery.
//! * [`librations`] – persistence and listing of classification results.
//! * [`broken`] – negative cache of asteroids whose element data is unusable.
//!
//! ## Resonance kinds
//! -----------------
//! Two-body resonances (one planet) and three-body resonances (two planets) live in
//! distinct tables, as do their librations. [`ResonanceKind`] selects the pair of tables.
pub mod bodies;
pub mod broken;
pub mod builder;
pub mod librations;
pub mod schema;
pub mod sequence;

use camino::Utf8Path;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use smallvec::SmallVec;

use crate::{
    coefficients::{BodyCoefficients, ResonanceCoefficients},
    constants::{AsteroidNumber, Au, BodyName, CatalogId},
    libration::predicates::asteroid_number,
    resonance_errors::ResonanceError,
};

pub use bodies::CelestialBody;
pub use broken::BrokenAsteroid;
pub use builder::ResonanceCatalogBuilder;
pub use librations::LibrationFilter;
pub use schema::CatalogTable;

/// Two-body or three-body resonance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResonanceKind {
    TwoBody,
    ThreeBody,
}

impl ResonanceKind {
    /// Kind matching a number of big bodies.
    pub fn from_big_bodies(count: usize) -> Result<Self, ResonanceError> {
        match count {
            1 => Ok(ResonanceKind::TwoBody),
            2 => Ok(ResonanceKind::ThreeBody),
            n => Err(ResonanceError::InvalidConfig(format!(
                "{n} big bodies, resonances involve one or two planets"
            ))),
        }
    }

    pub fn big_bodies(self) -> usize {
        match self {
            ResonanceKind::TwoBody => 1,
            ResonanceKind::ThreeBody => 2,
        }
    }

    pub fn resonance_table(self) -> CatalogTable {
        match self {
            ResonanceKind::TwoBody => CatalogTable::TwoBodyResonance,
            ResonanceKind::ThreeBody => CatalogTable::ThreeBodyResonance,
        }
    }

    pub fn libration_table(self) -> CatalogTable {
        match self {
            ResonanceKind::TwoBody => CatalogTable::TwoBodyLibration,
            ResonanceKind::ThreeBody => CatalogTable::ThreeBodyLibration,
        }
    }

    /// Columns of the resonance table referencing planets, in role order.
    pub(crate) fn planet_columns(self) -> &'static [&'static str] {
        match self {
            ResonanceKind::TwoBody => &["first_body_id"],
            ResonanceKind::ThreeBody => &["first_body_id", "second_body_id"],
        }
    }

    fn select_resonances(self) -> &'static str {
        match self {
            ResonanceKind::TwoBody => {
                "SELECT r.id, a.name, a.longitude_coeff, a.perihelion_longitude_coeff, a.axis,
                        p1.name, p1.longitude_coeff, p1.perihelion_longitude_coeff
                 FROM two_body_resonance r
                 JOIN asteroid a ON a.id = r.small_body_id
                 JOIN planet p1 ON p1.id = r.first_body_id"
            }
            ResonanceKind::ThreeBody => {
                "SELECT r.id, a.name, a.longitude_coeff, a.perihelion_longitude_coeff, a.axis,
                        p1.name, p1.longitude_coeff, p1.perihelion_longitude_coeff,
                        p2.name, p2.longitude_coeff, p2.perihelion_longitude_coeff
                 FROM three_body_resonance r
                 JOIN asteroid a ON a.id = r.small_body_id
                 JOIN planet p1 ON p1.id = r.first_body_id
                 JOIN planet p2 ON p2.id = r.second_body_id"
            }
        }
    }
}

/// A resonance row with its bodies resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredResonance {
    pub id: CatalogId,
    pub kind: ResonanceKind,
    /// Planet names in role order
    pub planets: SmallVec<[String; 2]>,
    pub asteroid: AsteroidNumber,
    /// Nominal semi-major axis of the resonance
    pub axis: Au,
    pub coefficients: ResonanceCoefficients,
}

impl StoredResonance {
    fn from_row(kind: ResonanceKind, row: &Row<'_>) -> rusqlite::Result<Self> {
        let asteroid_name: String = row.get(1)?;
        let asteroid = asteroid_number(&asteroid_name).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                1,
                rusqlite::types::Type::Text,
                format!("`{asteroid_name}` is not an asteroid name").into(),
            )
        })?;
        let small = BodyCoefficients::new(row.get(2)?, row.get(3)?);

        let mut planets = SmallVec::new();
        let mut big = SmallVec::new();
        for body in 0..kind.big_bodies() {
            let offset = 5 + 3 * body;
            planets.push(row.get(offset)?);
            big.push(BodyCoefficients::new(row.get(offset + 1)?, row.get(offset + 2)?));
        }

        Ok(StoredResonance {
            id: row.get(0)?,
            kind,
            planets,
            asteroid,
            axis: row.get(4)?,
            coefficients: ResonanceCoefficients { big, small },
        })
    }

    /// Body names of the planets, in role order.
    pub fn planet_names(&self) -> impl Iterator<Item = BodyName> + '_ {
        self.planets.iter().map(|p| BodyName::Planet(p.clone()))
    }
}

impl std::fmt::Display for StoredResonance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}-{} {} (a={:.4})",
            self.planets.join("-"),
            BodyName::Asteroid(self.asteroid),
            self.coefficients,
            self.axis
        )
    }
}

/// Handle over the catalog store.
pub struct Catalog {
    conn: Connection,
}

impl Catalog {
    /// Open (or create) a catalog backed by a file on disk.
    pub fn open(path: &Utf8Path) -> Result<Self, ResonanceError> {
        Self::initialize(Connection::open(path)?)
    }

    /// Open a private in-memory catalog.
    pub fn open_in_memory() -> Result<Self, ResonanceError> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(conn: Connection) -> Result<Self, ResonanceError> {
        schema::apply_pragmas(&conn)?;
        schema::create_tables(&conn)?;
        Ok(Catalog { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Run `f` inside a transaction, committed when `f` succeeds and rolled back otherwise.
    pub fn transaction<T, F>(&self, f: F) -> Result<T, ResonanceError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, ResonanceError>,
    {
        let tx = self.conn.unchecked_transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    pub fn row_count(&self, table: CatalogTable) -> Result<usize, ResonanceError> {
        let count: i64 =
            self.conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Force the identity counter of `table`. Meant for operators and tests reproducing a
    /// stale counter.
    pub fn reset_sequence(&self, table: CatalogTable, value: CatalogId) -> Result<(), ResonanceError> {
        sequence::reset_sequence(&self.conn, table, value)
    }

    /// Resonance `id` with its bodies.
    ///
    /// Return
    /// ----------
    /// * [`ResonanceError::UnknownResonance`] if no such row exists.
    pub fn resonance(&self, kind: ResonanceKind, id: CatalogId) -> Result<StoredResonance, ResonanceError> {
        let sql = format!("{} WHERE r.id = ?1", kind.select_resonances());
        self.conn
            .query_row(&sql, params![id], |row| StoredResonance::from_row(kind, row))
            .optional()?
            .ok_or_else(|| {
                ResonanceError::UnknownResonance(format!("{} #{id}", kind.resonance_table()))
            })
    }

    /// All resonances of one asteroid, ordered by id.
    pub fn resonances_for_asteroid(
        &self,
        kind: ResonanceKind,
        asteroid: AsteroidNumber,
    ) -> Result<Vec<StoredResonance>, ResonanceError> {
        let sql = format!("{} WHERE a.name = ?1 ORDER BY r.id", kind.select_resonances());
        let mut stmt = self.conn.prepare(&sql)?;
        let resonances = stmt
            .query_map(params![BodyName::Asteroid(asteroid).to_string()], |row| {
                StoredResonance::from_row(kind, row)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(resonances)
    }
}
