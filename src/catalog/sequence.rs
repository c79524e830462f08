//! # Identity sequences
//!
//! Catalog ids are drawn from the `id_sequence` table, one counter per table, the way a
//! relational sequence backs a serial column. A counter can go stale (a table restored
//! from a dump, rows inserted out of band) and hand out an id that already exists.
//!
//! [`insert_with_recovery`] handles that case: on a primary-key collision it moves the
//! counter to `max(id) + 1` and retries the insert exactly once. A second collision is
//! reported as [`ResonanceError::IdentitySequenceConflict`].
use std::ops::Range;

use rusqlite::{ffi, params, Connection, OptionalExtension};

use super::schema::CatalogTable;
use crate::{constants::CatalogId, resonance_errors::ResonanceError};

/// Reserve `count` consecutive ids of `table`.
pub fn next_ids(
    conn: &Connection,
    table: CatalogTable,
    count: usize,
) -> Result<Range<CatalogId>, ResonanceError> {
    let count = count as CatalogId;
    conn.execute(
        "INSERT INTO id_sequence (table_name, next_value) VALUES (?1, 1)
         ON CONFLICT(table_name) DO NOTHING",
        params![table.as_str()],
    )?;
    let first: CatalogId = conn.query_row(
        "UPDATE id_sequence SET next_value = next_value + ?2
         WHERE table_name = ?1
         RETURNING next_value - ?2",
        params![table.as_str(), count],
        |row| row.get(0),
    )?;
    Ok(first..first + count)
}

/// Reserve one id of `table`.
pub fn next_id(conn: &Connection, table: CatalogTable) -> Result<CatalogId, ResonanceError> {
    Ok(next_ids(conn, table, 1)?.start)
}

/// Value the counter of `table` will hand out next, if the counter exists.
pub fn peek_sequence(
    conn: &Connection,
    table: CatalogTable,
) -> Result<Option<CatalogId>, ResonanceError> {
    let value = conn
        .query_row(
            "SELECT next_value FROM id_sequence WHERE table_name = ?1",
            params![table.as_str()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

/// Force the counter of `table` to `value`, whatever the table holds.
pub fn reset_sequence(
    conn: &Connection,
    table: CatalogTable,
    value: CatalogId,
) -> Result<(), ResonanceError> {
    conn.execute(
        "INSERT INTO id_sequence (table_name, next_value) VALUES (?1, ?2)
         ON CONFLICT(table_name) DO UPDATE SET next_value = excluded.next_value",
        params![table.as_str(), value],
    )?;
    Ok(())
}

/// Move the counter of `table` to `max(id) + 1` and return that value.
pub fn resync_sequence(conn: &Connection, table: CatalogTable) -> Result<CatalogId, ResonanceError> {
    let next: CatalogId = conn.query_row(
        &format!("SELECT COALESCE(MAX(id), 0) + 1 FROM {table}"),
        [],
        |row| row.get(0),
    )?;
    reset_sequence(conn, table, next)?;
    Ok(next)
}

pub(crate) fn is_primary_key_collision(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(e, _) if e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

/// Run `insert` with `count` fresh ids of `table`, recovering once from a stale counter.
///
/// Arguments
/// -----------------
/// * `insert` – Executes the insert with the reserved ids and returns the number of
///   rows written. It may be called twice, the second time with new ids.
pub(crate) fn insert_with_recovery<F>(
    conn: &Connection,
    table: CatalogTable,
    count: usize,
    mut insert: F,
) -> Result<usize, ResonanceError>
where
    F: FnMut(Range<CatalogId>) -> rusqlite::Result<usize>,
{
    let ids = next_ids(conn, table, count)?;
    match insert(ids.clone()) {
        Err(e) if is_primary_key_collision(&e) => {
            let next = resync_sequence(conn, table)?;
            tracing::warn!(
                table = %table,
                stale = ids.start,
                resynced = next,
                "identity sequence collided, retrying once"
            );

            let ids = next_ids(conn, table, count)?;
            insert(ids).map_err(|e| {
                if is_primary_key_collision(&e) {
                    ResonanceError::IdentitySequenceConflict(table.to_string())
                } else {
                    e.into()
                }
            })
        }
        result => Ok(result?),
    }
}

#[cfg(test)]
mod sequence_test {
    use super::*;
    use crate::catalog::Catalog;

    fn insert_planet(conn: &Connection, id: CatalogId, name: &str) -> rusqlite::Result<usize> {
        conn.execute(
            "INSERT INTO planet (id, name, longitude_coeff, perihelion_longitude_coeff)
             VALUES (?1, ?2, 1, 0)",
            params![id, name],
        )
    }

    #[test]
    fn test_next_ids_are_consecutive() {
        let catalog = Catalog::open_in_memory().unwrap();
        let conn = catalog.connection();

        assert_eq!(peek_sequence(conn, CatalogTable::Planet).unwrap(), None);
        assert_eq!(next_id(conn, CatalogTable::Planet).unwrap(), 1);
        assert_eq!(next_ids(conn, CatalogTable::Planet, 3).unwrap(), 2..5);
        assert_eq!(next_id(conn, CatalogTable::Asteroid).unwrap(), 1);
        assert_eq!(peek_sequence(conn, CatalogTable::Planet).unwrap(), Some(5));
    }

    #[test]
    fn test_resync_to_max_id() {
        let catalog = Catalog::open_in_memory().unwrap();
        let conn = catalog.connection();

        insert_planet(conn, 7, "JUPITER").unwrap();
        assert_eq!(resync_sequence(conn, CatalogTable::Planet).unwrap(), 8);
        assert_eq!(next_id(conn, CatalogTable::Planet).unwrap(), 8);
        assert_eq!(resync_sequence(conn, CatalogTable::Asteroid).unwrap(), 1);
    }

    #[test]
    fn test_recovery_retries_once() {
        let catalog = Catalog::open_in_memory().unwrap();
        let conn = catalog.connection();

        insert_planet(conn, 1, "JUPITER").unwrap();
        reset_sequence(conn, CatalogTable::Planet, 1).unwrap();

        let mut attempts = Vec::new();
        let written = insert_with_recovery(conn, CatalogTable::Planet, 1, |ids| {
            attempts.push(ids.start);
            insert_planet(conn, ids.start, "SATURN")
        })
        .unwrap();

        assert_eq!(written, 1);
        assert_eq!(attempts, vec![1, 2]);
    }

    #[test]
    fn test_second_collision_is_conflict() {
        let catalog = Catalog::open_in_memory().unwrap();
        let conn = catalog.connection();

        insert_planet(conn, 1, "JUPITER").unwrap();
        reset_sequence(conn, CatalogTable::Planet, 1).unwrap();

        // always reuse the first stale id
        let result = insert_with_recovery(conn, CatalogTable::Planet, 1, |_| {
            insert_planet(conn, 1, "SATURN")
        });
        assert_eq!(
            result,
            Err(ResonanceError::IdentitySequenceConflict("planet".into()))
        );
    }

    #[test]
    fn test_other_errors_are_not_retried() {
        let catalog = Catalog::open_in_memory().unwrap();
        let conn = catalog.connection();

        let mut calls = 0;
        let result = insert_with_recovery(conn, CatalogTable::Planet, 1, |ids| {
            calls += 1;
            conn.execute(
                "INSERT INTO planet (id, name, longitude_coeff, perihelion_longitude_coeff)
                 VALUES (?1, NULL, 1, 0)",
                params![ids.start],
            )
        });
        assert!(matches!(result, Err(ResonanceError::Sqlite(_))));
        assert_eq!(calls, 1);
    }
}
