//! Derived predicates of catalog rows.
//!
//! Each predicate exists twice: as a plain function on in-memory values, and as a SQL
//! fragment usable in a `WHERE` clause of the catalog. The two forms must agree on every
//! row, which the tests of [`crate::catalog::librations`] check against a real store.
//!
//! | predicate          | in memory                                  | SQL                                   |
//! |--------------------|--------------------------------------------|---------------------------------------|
//! | pure               | fewer than 2 breaks                        | `json_array_length(breaks) < 2`       |
//! | transient          | any break, percentage or average delta     | `… > 0 OR … IS NOT NULL`              |
//! | asteroid number    | digits after the `A` prefix                | `CAST(substr(name, 2) AS INTEGER)`    |
use crate::constants::{AsteroidNumber, Years, ASTEROID_PREFIX};

pub fn is_pure(circulation_breaks: &[Years]) -> bool {
    circulation_breaks.len() < 2
}

pub fn is_transient(
    circulation_breaks: &[Years],
    percentage: Option<f64>,
    average_delta: Option<Years>,
) -> bool {
    !circulation_breaks.is_empty() || percentage.is_some() || average_delta.is_some()
}

/// Number of an asteroid body name (`A123` → `123`), `None` for any other name.
pub fn asteroid_number(name: &str) -> Option<AsteroidNumber> {
    let digits = name.strip_prefix(ASTEROID_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// SQL form of [`is_pure`] over the libration table aliased `alias`.
pub fn is_pure_sql(alias: &str) -> String {
    format!("(json_array_length({alias}.circulation_breaks) < 2)")
}

/// SQL form of [`is_transient`] over the libration table aliased `alias`.
pub fn is_transient_sql(alias: &str) -> String {
    format!(
        "(json_array_length({alias}.circulation_breaks) > 0 \
         OR {alias}.percentage IS NOT NULL \
         OR {alias}.average_delta IS NOT NULL)"
    )
}

/// SQL form of [`asteroid_number`] over the body table aliased `alias`, `NULL` when the
/// name is not an asteroid name.
pub fn asteroid_number_sql(alias: &str) -> String {
    format!(
        "(CASE WHEN {alias}.name GLOB '{ASTEROID_PREFIX}[0-9]*' \
         AND substr({alias}.name, 2) NOT GLOB '*[^0-9]*' \
         THEN CAST(substr({alias}.name, 2) AS INTEGER) END)"
    )
}

#[cfg(test)]
mod predicates_test {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("A1", Some(1))]
    #[case("A123", Some(123))]
    #[case("A007", Some(7))]
    #[case("A", None)]
    #[case("A12b", None)]
    #[case("A-3", None)]
    #[case("JUPITER", None)]
    #[case("a12", None)]
    fn test_asteroid_number(#[case] name: &str, #[case] expected: Option<AsteroidNumber>) {
        assert_eq!(asteroid_number(name), expected);
    }

    #[rstest]
    #[case(&[], true)]
    #[case(&[10.0], true)]
    #[case(&[10.0, 20.0], false)]
    fn test_is_pure(#[case] breaks: &[f64], #[case] expected: bool) {
        assert_eq!(is_pure(breaks), expected);
    }

    #[test]
    fn test_is_transient() {
        assert!(!is_transient(&[], None, None));
        assert!(is_transient(&[1.0], None, None));
        assert!(is_transient(&[], Some(0.0), None));
        assert!(is_transient(&[], None, Some(3.0)));
    }

    #[test]
    fn test_asteroid_number_sql_matches() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let sql = format!("SELECT {} FROM (SELECT ?1 AS name) b", asteroid_number_sql("b"));

        for name in ["A1", "A123", "A007", "A", "A12b", "A-3", "JUPITER", "a12", "A4294967295"] {
            let from_sql: Option<i64> = conn.query_row(&sql, [name], |row| row.get(0)).unwrap();
            assert_eq!(
                from_sql,
                asteroid_number(name).map(i64::from),
                "name `{name}`"
            );
        }
    }
}
