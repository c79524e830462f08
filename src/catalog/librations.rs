//! Libration rows: one per resonance, created or replaced by each classification run.
//!
//! The circulation breaks are stored as a JSON array, which keeps the row count at one
//! per resonance and lets [`crate::libration::predicates`] express purity in SQL.
use std::ops::RangeInclusive;

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{Catalog, ResonanceKind};
use crate::{
    constants::{AsteroidNumber, BodyName, CatalogId},
    libration::{
        predicates::{asteroid_number_sql, is_pure_sql, is_transient_sql},
        Libration,
    },
    resonance_errors::ResonanceError,
};

/// Selection of librations by classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LibrationFilter {
    #[default]
    All,
    /// Fewer than two circulation breaks
    Pure,
    /// Transient and not pure
    Transient,
}

impl LibrationFilter {
    fn condition(self, alias: &str) -> String {
        match self {
            LibrationFilter::All => "1".to_string(),
            LibrationFilter::Pure => is_pure_sql(alias),
            LibrationFilter::Transient => {
                format!("{} AND NOT {}", is_transient_sql(alias), is_pure_sql(alias))
            }
        }
    }

    /// In-memory counterpart of the SQL condition.
    pub fn accepts(self, libration: &Libration) -> bool {
        match self {
            LibrationFilter::All => true,
            LibrationFilter::Pure => libration.is_pure(),
            LibrationFilter::Transient => libration.is_transient() && !libration.is_pure(),
        }
    }
}

const LIBRATION_COLUMNS: &str =
    "l.resonance_id, l.circulation_breaks, l.average_delta, l.percentage, l.is_apocentric";

struct RawLibration {
    resonance_id: CatalogId,
    breaks: String,
    average_delta: Option<f64>,
    percentage: Option<f64>,
    is_apocentric: bool,
}

impl RawLibration {
    fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(RawLibration {
            resonance_id: row.get(offset)?,
            breaks: row.get(offset + 1)?,
            average_delta: row.get(offset + 2)?,
            percentage: row.get(offset + 3)?,
            is_apocentric: row.get(offset + 4)?,
        })
    }

    fn decode(self) -> Result<Libration, ResonanceError> {
        Ok(Libration {
            resonance_id: self.resonance_id,
            circulation_breaks: serde_json::from_str(&self.breaks)?,
            average_delta: self.average_delta,
            percentage: self.percentage,
            is_apocentric: self.is_apocentric,
        })
    }
}

/// Create the libration of `libration.resonance_id`, or replace the stored one.
pub fn upsert_libration(
    conn: &Connection,
    kind: ResonanceKind,
    libration: &Libration,
) -> Result<(), ResonanceError> {
    let sql = format!(
        "INSERT INTO {} (resonance_id, circulation_breaks, average_delta, percentage, is_apocentric)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(resonance_id) DO UPDATE SET
             circulation_breaks = excluded.circulation_breaks,
             average_delta = excluded.average_delta,
             percentage = excluded.percentage,
             is_apocentric = excluded.is_apocentric",
        kind.libration_table()
    );
    conn.execute(
        &sql,
        params![
            libration.resonance_id,
            serde_json::to_string(&libration.circulation_breaks)?,
            libration.average_delta,
            libration.percentage,
            libration.is_apocentric,
        ],
    )?;
    Ok(())
}

/// Stored libration of resonance `resonance_id`, if any.
pub fn load_libration(
    conn: &Connection,
    kind: ResonanceKind,
    resonance_id: CatalogId,
) -> Result<Option<Libration>, ResonanceError> {
    let sql = format!(
        "SELECT {LIBRATION_COLUMNS} FROM {} l WHERE l.resonance_id = ?1",
        kind.libration_table()
    );
    conn.query_row(&sql, params![resonance_id], |row| RawLibration::from_row(row, 0))
        .optional()?
        .map(RawLibration::decode)
        .transpose()
}

impl Catalog {
    pub fn upsert_libration(
        &self,
        kind: ResonanceKind,
        libration: &Libration,
    ) -> Result<(), ResonanceError> {
        upsert_libration(self.connection(), kind, libration)
    }

    pub fn libration(
        &self,
        kind: ResonanceKind,
        resonance_id: CatalogId,
    ) -> Result<Option<Libration>, ResonanceError> {
        load_libration(self.connection(), kind, resonance_id)
    }

    /// Librations of one asteroid, ordered by resonance id.
    pub fn librations_for_asteroid(
        &self,
        kind: ResonanceKind,
        asteroid: AsteroidNumber,
        filter: LibrationFilter,
    ) -> Result<Vec<Libration>, ResonanceError> {
        let sql = format!(
            "SELECT {LIBRATION_COLUMNS}
             FROM {} l
             JOIN {} r ON r.id = l.resonance_id
             JOIN asteroid a ON a.id = r.small_body_id
             WHERE a.name = ?1 AND {}
             ORDER BY l.resonance_id",
            kind.libration_table(),
            kind.resonance_table(),
            filter.condition("l")
        );
        let mut stmt = self.connection().prepare(&sql)?;
        let raw = stmt
            .query_map(params![BodyName::Asteroid(asteroid).to_string()], |row| {
                RawLibration::from_row(row, 0)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        raw.into_iter().map(RawLibration::decode).collect()
    }

    /// Librations of every asteroid numbered within `range`, with the asteroid number,
    /// ordered by asteroid number then resonance id.
    pub fn librations_in_range(
        &self,
        kind: ResonanceKind,
        range: RangeInclusive<AsteroidNumber>,
        filter: LibrationFilter,
    ) -> Result<Vec<(AsteroidNumber, Libration)>, ResonanceError> {
        let number = asteroid_number_sql("a");
        let sql = format!(
            "SELECT {number}, {LIBRATION_COLUMNS}
             FROM {} l
             JOIN {} r ON r.id = l.resonance_id
             JOIN asteroid a ON a.id = r.small_body_id
             WHERE {number} BETWEEN ?1 AND ?2 AND {}
             ORDER BY 1, l.resonance_id",
            kind.libration_table(),
            kind.resonance_table(),
            filter.condition("l")
        );
        let mut stmt = self.connection().prepare(&sql)?;
        let raw = stmt
            .query_map(params![range.start(), range.end()], |row| {
                Ok((row.get::<_, AsteroidNumber>(0)?, RawLibration::from_row(row, 1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        raw.into_iter()
            .map(|(number, raw)| Ok((number, raw.decode()?)))
            .collect()
    }
}
