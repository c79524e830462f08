//! # Resonance catalog builder
//!
//! Turn one coefficient row and an asteroid number into catalog rows: the planets, the
//! asteroid and the resonance joining them, each created at most once.
//!
//! ## Steps
//! -----------------
//! 1. Describe the bodies: planet names come from the configuration, in role order,
//!    their coefficients from the row; the asteroid is `A<number>` with the axis of the row.
//! 2. Create the missing body rows ([`super::bodies::ensure_bodies`]).
//! 3. Create the resonance with a single `INSERT … SELECT` resolving the body ids from
//!    their natural keys, so no id is read back before writing.
//! 4. Recover once from a stale identity counter ([`super::sequence`]).
//!
//! Everything runs in one transaction per row.
use itertools::Itertools;
use rusqlite::{params_from_iter, types::Value, Connection, OptionalExtension};
use smallvec::SmallVec;

use super::{
    bodies::{ensure_bodies, CelestialBody},
    sequence::insert_with_recovery,
    Catalog, ResonanceKind,
};
use crate::{
    coefficients::CoefficientRow,
    config::{ConflictPolicy, ResonanceConfig},
    constants::{AsteroidNumber, CatalogId},
    resonance_errors::ResonanceError,
};

/// Bodies of one resonance, big bodies in role order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResonanceBodies {
    pub planets: SmallVec<[CelestialBody; 2]>,
    pub asteroid: CelestialBody,
}

impl ResonanceBodies {
    fn aliases(&self) -> impl Iterator<Item = (String, &CelestialBody)> {
        self.planets
            .iter()
            .enumerate()
            .map(|(i, p)| (format!("p{}", i + 1), p))
            .chain(std::iter::once(("a".to_string(), &self.asteroid)))
    }

    /// Natural-key conditions of every body, joined with `AND`.
    fn key_conditions(&self) -> String {
        self.aliases()
            .map(|(alias, body)| body.key_condition(&alias))
            .join(" AND ")
    }

    /// Parameters of [`ResonanceBodies::key_conditions`], in the same order.
    fn key_values(&self) -> Vec<Value> {
        self.aliases().flat_map(|(_, body)| body.key_values()).collect()
    }

    fn all(&self) -> Vec<CelestialBody> {
        self.planets
            .iter()
            .chain(std::iter::once(&self.asteroid))
            .cloned()
            .collect()
    }
}

/// Creates body and resonance rows from coefficient rows, deduplicated.
pub struct ResonanceCatalogBuilder<'c> {
    catalog: &'c Catalog,
    planets: SmallVec<[String; 2]>,
    kind: ResonanceKind,
    policy: ConflictPolicy,
    validate_dalembert: bool,
}

impl<'c> ResonanceCatalogBuilder<'c> {
    pub fn new(catalog: &'c Catalog, config: &ResonanceConfig) -> Result<Self, ResonanceError> {
        Ok(ResonanceCatalogBuilder {
            catalog,
            planets: config.planets.iter().cloned().collect(),
            kind: ResonanceKind::from_big_bodies(config.planets.len())?,
            policy: config.conflict_policy,
            validate_dalembert: config.validate_dalembert,
        })
    }

    pub fn kind(&self) -> ResonanceKind {
        self.kind
    }

    /// Body descriptors of `row` for `asteroid`.
    ///
    /// Return
    /// ----------
    /// * [`ResonanceError::BodyCountMismatch`] when the row does not have one coefficient
    ///   pair per configured planet.
    /// * [`ResonanceError::DAlembertViolation`] when validation is enabled and the
    ///   coefficients do not sum to zero.
    pub fn describe(
        &self,
        row: &CoefficientRow,
        asteroid: AsteroidNumber,
    ) -> Result<ResonanceBodies, ResonanceError> {
        let coefficients = &row.coefficients;
        if coefficients.big.len() != self.planets.len() {
            return Err(ResonanceError::BodyCountMismatch {
                series: self.planets.len(),
                coefficients: coefficients.big.len(),
            });
        }
        if self.validate_dalembert && !coefficients.satisfies_dalembert() {
            return Err(ResonanceError::DAlembertViolation(
                coefficients.as_table_order(),
            ));
        }

        Ok(ResonanceBodies {
            planets: self
                .planets
                .iter()
                .zip(&coefficients.big)
                .map(|(name, c)| CelestialBody::planet(name.as_str(), *c))
                .collect(),
            asteroid: CelestialBody::asteroid(asteroid, coefficients.small, row.axis),
        })
    }

    /// Ensure the rows of `row` exist for `asteroid` and return the resonance id.
    ///
    /// Calling it again with the same arguments creates nothing and returns the same id.
    pub fn build(
        &self,
        row: &CoefficientRow,
        asteroid: AsteroidNumber,
    ) -> Result<CatalogId, ResonanceError> {
        let bodies = self.describe(row, asteroid)?;

        self.catalog.transaction(|tx| {
            ensure_bodies(tx, self.policy, &bodies.all())?;
            let id = self.ensure_resonance(tx, &bodies)?;
            tracing::debug!(
                asteroid,
                resonance = %row.coefficients,
                id,
                "resonance in catalog"
            );
            Ok(id)
        })
    }

    /// [`ResonanceCatalogBuilder::build`] from a raw table line.
    pub fn build_line(&self, line: &str, asteroid: AsteroidNumber) -> Result<CatalogId, ResonanceError> {
        let row = CoefficientRow::parse_for(line, self.planets.len())?;
        self.build(&row, asteroid)
    }

    fn from_clause(&self) -> String {
        (1..=self.planets.len())
            .map(|i| format!("planet p{i}"))
            .chain(std::iter::once("asteroid a".to_string()))
            .join(", ")
    }

    fn find_resonance(
        &self,
        conn: &Connection,
        bodies: &ResonanceBodies,
    ) -> Result<Option<CatalogId>, ResonanceError> {
        let planet_joins = self
            .kind
            .planet_columns()
            .iter()
            .enumerate()
            .map(|(i, column)| format!("r.{column} = p{}.id", i + 1))
            .join(" AND ");
        let sql = format!(
            "SELECT r.id FROM {} r, {} WHERE {planet_joins} AND r.small_body_id = a.id AND {}",
            self.kind.resonance_table(),
            self.from_clause(),
            bodies.key_conditions()
        );
        let id = conn
            .query_row(&sql, params_from_iter(bodies.key_values()), |row| row.get(0))
            .optional()?;
        Ok(id)
    }

    fn insert_resonance(
        &self,
        conn: &Connection,
        bodies: &ResonanceBodies,
        on_conflict: bool,
    ) -> Result<usize, ResonanceError> {
        let columns = self.kind.planet_columns();
        let selected = (1..=columns.len())
            .map(|i| format!("p{i}.id"))
            .chain(std::iter::once("a.id".to_string()))
            .join(", ");
        let mut sql = format!(
            "INSERT INTO {table} (id, {columns}, small_body_id) SELECT ?, {selected} FROM {from} WHERE {keys}",
            table = self.kind.resonance_table(),
            columns = columns.join(", "),
            from = self.from_clause(),
            keys = bodies.key_conditions(),
        );
        if on_conflict {
            sql.push_str(&format!(
                " ON CONFLICT({}, small_body_id) DO NOTHING",
                columns.join(", ")
            ));
        }

        let keys = bodies.key_values();
        insert_with_recovery(conn, self.kind.resonance_table(), 1, |ids| {
            let values = std::iter::once(Value::Integer(ids.start)).chain(keys.iter().cloned());
            conn.execute(&sql, params_from_iter(values))
        })
    }

    fn ensure_resonance(
        &self,
        conn: &Connection,
        bodies: &ResonanceBodies,
    ) -> Result<CatalogId, ResonanceError> {
        match self.policy {
            ConflictPolicy::Native => {
                self.insert_resonance(conn, bodies, true)?;
            }
            ConflictPolicy::CheckThenInsert => {
                if let Some(id) = self.find_resonance(conn, bodies)? {
                    return Ok(id);
                }
                self.insert_resonance(conn, bodies, false)?;
            }
        }

        self.find_resonance(conn, bodies)?
            .ok_or_else(|| ResonanceError::UnknownResonance(format!("{:?}", bodies.all())))
    }
}
