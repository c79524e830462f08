//! Planet and asteroid rows.
//!
//! A body row is identified by its natural key: the name and the two coefficients it
//! takes part in a resonance with, plus the semi-major axis for asteroids. Rows are
//! created once and never updated.
use itertools::Itertools;
use rusqlite::{params_from_iter, types::Value, Connection, OptionalExtension};

use super::{schema::CatalogTable, sequence::insert_with_recovery};
use crate::{
    coefficients::BodyCoefficients,
    config::ConflictPolicy,
    constants::{AsteroidNumber, Au, BodyName, CatalogId},
    resonance_errors::ResonanceError,
};

const PLANET_KEY: &[&str] = &["name", "longitude_coeff", "perihelion_longitude_coeff"];
const ASTEROID_KEY: &[&str] = &["name", "longitude_coeff", "perihelion_longitude_coeff", "axis"];

/// Descriptor of a body taking part in a resonance.
#[derive(Debug, Clone, PartialEq)]
pub enum CelestialBody {
    Planet {
        name: String,
        coefficients: BodyCoefficients,
    },
    Asteroid {
        number: AsteroidNumber,
        coefficients: BodyCoefficients,
        axis: Au,
    },
}

impl CelestialBody {
    pub fn planet(name: impl Into<String>, coefficients: BodyCoefficients) -> Self {
        CelestialBody::Planet {
            name: name.into(),
            coefficients,
        }
    }

    pub fn asteroid(number: AsteroidNumber, coefficients: BodyCoefficients, axis: Au) -> Self {
        CelestialBody::Asteroid {
            number,
            coefficients,
            axis,
        }
    }

    pub fn name(&self) -> BodyName {
        match self {
            CelestialBody::Planet { name, .. } => BodyName::Planet(name.clone()),
            CelestialBody::Asteroid { number, .. } => BodyName::Asteroid(*number),
        }
    }

    pub fn coefficients(&self) -> BodyCoefficients {
        match self {
            CelestialBody::Planet { coefficients, .. }
            | CelestialBody::Asteroid { coefficients, .. } => *coefficients,
        }
    }

    pub fn table(&self) -> CatalogTable {
        match self {
            CelestialBody::Planet { .. } => CatalogTable::Planet,
            CelestialBody::Asteroid { .. } => CatalogTable::Asteroid,
        }
    }

    pub(crate) fn key_columns(&self) -> &'static [&'static str] {
        match self {
            CelestialBody::Planet { .. } => PLANET_KEY,
            CelestialBody::Asteroid { .. } => ASTEROID_KEY,
        }
    }

    /// Natural key values, in the order of [`CelestialBody::key_columns`].
    pub(crate) fn key_values(&self) -> Vec<Value> {
        let coefficients = self.coefficients();
        let mut values = vec![
            Value::Text(self.name().to_string()),
            Value::Integer(coefficients.longitude.into()),
            Value::Integer(coefficients.perihelion.into()),
        ];
        if let CelestialBody::Asteroid { axis, .. } = self {
            values.push(Value::Real(*axis));
        }
        values
    }

    /// `alias.column = ?` for every natural key column.
    pub(crate) fn key_condition(&self, alias: &str) -> String {
        self.key_columns()
            .iter()
            .map(|c| format!("{alias}.{c} = ?"))
            .join(" AND ")
    }
}

/// Id of the row matching `body`, if it exists.
pub fn find_body_id(
    conn: &Connection,
    body: &CelestialBody,
) -> Result<Option<CatalogId>, ResonanceError> {
    let sql = format!(
        "SELECT b.id FROM {} b WHERE {}",
        body.table(),
        body.key_condition("b")
    );
    let id = conn
        .query_row(&sql, params_from_iter(body.key_values()), |row| row.get(0))
        .optional()?;
    Ok(id)
}

fn insert_sql(table: CatalogTable, key: &[&str], rows: usize, on_conflict: bool) -> String {
    let tuple = format!("({})", std::iter::repeat("?").take(key.len() + 1).join(", "));
    let mut sql = format!(
        "INSERT INTO {table} (id, {}) VALUES {}",
        key.join(", "),
        std::iter::repeat(tuple).take(rows).join(", ")
    );
    if on_conflict {
        sql.push_str(&format!(" ON CONFLICT({}) DO NOTHING", key.join(", ")));
    }
    sql
}

fn insert_rows(
    conn: &Connection,
    bodies: &[&CelestialBody],
    on_conflict: bool,
) -> Result<usize, ResonanceError> {
    let Some(first) = bodies.first() else {
        return Ok(0);
    };
    let table = first.table();
    let sql = insert_sql(table, first.key_columns(), bodies.len(), on_conflict);

    insert_with_recovery(conn, table, bodies.len(), |ids| {
        let values = ids
            .zip(bodies)
            .flat_map(|(id, body)| std::iter::once(Value::Integer(id)).chain(body.key_values()));
        conn.execute(&sql, params_from_iter(values))
    })
}

/// Make sure a row exists for every body, creating the missing ones.
///
/// With [`ConflictPolicy::Native`] each table gets a single multi-row insert resolving
/// duplicates with `ON CONFLICT DO NOTHING`. With [`ConflictPolicy::CheckThenInsert`]
/// every body is looked up first and inserted only when absent, which is only correct
/// when a single writer works on a given asteroid range.
///
/// Return
/// ----------
/// * The number of rows created.
pub fn ensure_bodies(
    conn: &Connection,
    policy: ConflictPolicy,
    bodies: &[CelestialBody],
) -> Result<usize, ResonanceError> {
    let (planets, asteroids): (Vec<&CelestialBody>, Vec<&CelestialBody>) = bodies
        .iter()
        .partition(|b| matches!(b, CelestialBody::Planet { .. }));

    let mut created = 0;
    for group in [planets, asteroids] {
        created += match policy {
            ConflictPolicy::Native => insert_rows(conn, &group, true)?,
            ConflictPolicy::CheckThenInsert => {
                let mut inserted = 0;
                for body in group {
                    if find_body_id(conn, body)?.is_none() {
                        inserted += insert_rows(conn, &[body], false)?;
                    }
                }
                inserted
            }
        };
    }
    Ok(created)
}
