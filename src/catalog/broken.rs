//! Negative cache of asteroids whose element data cannot be classified.
//!
//! Markers are append-only: marking an asteroid again, even with another reason, keeps
//! the first row untouched.
use rusqlite::{params, OptionalExtension};

use super::Catalog;
use crate::{
    constants::{AsteroidNumber, BodyName},
    resonance_errors::ResonanceError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokenAsteroid {
    pub name: String,
    pub reason: Option<String>,
}

impl Catalog {
    /// Record `asteroid` as broken.
    ///
    /// Return
    /// ----------
    /// * `true` if a new marker was written, `false` if the asteroid was already marked.
    pub fn mark_broken(
        &self,
        asteroid: AsteroidNumber,
        reason: Option<&str>,
    ) -> Result<bool, ResonanceError> {
        let written = self.connection().execute(
            "INSERT INTO broken_asteroid (name, reason) VALUES (?1, ?2)
             ON CONFLICT(name) DO NOTHING",
            params![BodyName::Asteroid(asteroid).to_string(), reason],
        )?;
        Ok(written > 0)
    }

    pub fn is_broken(&self, asteroid: AsteroidNumber) -> Result<bool, ResonanceError> {
        let found = self
            .connection()
            .query_row(
                "SELECT 1 FROM broken_asteroid WHERE name = ?1",
                params![BodyName::Asteroid(asteroid).to_string()],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// All markers, in insertion order.
    pub fn broken_asteroids(&self) -> Result<Vec<BrokenAsteroid>, ResonanceError> {
        let mut stmt = self
            .connection()
            .prepare("SELECT name, reason FROM broken_asteroid ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(BrokenAsteroid {
                    name: row.get(0)?,
                    reason: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod broken_test {
    use super::*;
    use crate::catalog::CatalogTable;

    #[test]
    fn test_mark_broken_once() {
        let catalog = Catalog::open_in_memory().unwrap();

        assert!(!catalog.is_broken(7).unwrap());
        assert!(catalog.mark_broken(7, Some("bad token")).unwrap());
        assert!(!catalog.mark_broken(7, Some("another reason")).unwrap());
        assert!(!catalog.mark_broken(7, None).unwrap());
        assert!(catalog.is_broken(7).unwrap());

        assert_eq!(catalog.row_count(CatalogTable::BrokenAsteroid).unwrap(), 1);
        assert_eq!(
            catalog.broken_asteroids().unwrap(),
            vec![BrokenAsteroid {
                name: "A7".into(),
                reason: Some("bad token".into())
            }]
        );
    }
}
