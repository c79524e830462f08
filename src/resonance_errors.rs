use thiserror::Error;

use crate::orbital_elements::aei_reader::ParseAeiError;

#[derive(Error, Debug)]
pub enum ResonanceError {
    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Error during the aei file parsing (line {line}): {source}")]
    AeiParse { line: usize, source: ParseAeiError },

    #[error("Element file {0} holds no element rows")]
    EmptyElementFile(String),

    #[error("Element row {line} is truncated: column {column} is missing")]
    MissingColumn { line: usize, column: usize },

    #[error("Big bodies have different element counts: {0:?}")]
    ElementCount(Vec<usize>),

    #[error("Asteroid has {asteroid} element rows, big bodies have {expected}")]
    AsteroidElementCount { asteroid: usize, expected: usize },

    #[error("{series} big-body series given for {coefficients} big-body coefficients")]
    BodyCountMismatch { series: usize, coefficients: usize },

    #[error("Known phase list has {phases} values, element series have {expected}")]
    PhaseCount { phases: usize, expected: usize },

    #[error("No resonant phase samples to scan")]
    NoPhase,

    #[error("Invalid coefficient row `{row}`: {reason}")]
    CoefficientParse { row: String, reason: String },

    #[error("Coefficients {0:?} do not satisfy the D'Alembert rule")]
    DAlembertViolation(Vec<i32>),

    #[error("Identity sequence of table {0} still collides after resync")]
    IdentitySequenceConflict(String),

    #[error("Resonance not found in catalog: {0}")]
    UnknownResonance(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML configuration error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ResonanceError {
    /// Errors that disqualify the whole asteroid: its element data cannot be classified.
    ///
    /// The batch driver records these in the broken-asteroid cache.
    pub fn is_broken_data(&self) -> bool {
        use ResonanceError::*;
        matches!(
            self,
            AeiParse { .. }
                | EmptyElementFile(_)
                | MissingColumn { .. }
                | ElementCount(_)
                | AsteroidElementCount { .. }
                | PhaseCount { .. }
                | NoPhase
        )
    }
}

impl PartialEq for ResonanceError {
    fn eq(&self, other: &Self) -> bool {
        use ResonanceError::*;
        match (self, other) {
            // Not comparable: equal when the variant matches
            (IoError(_), IoError(_)) => true,
            (Sqlite(_), Sqlite(_)) => true,
            (Json(_), Json(_)) => true,
            (Toml(_), Toml(_)) => true,

            (AeiParse { line: a, source: s }, AeiParse { line: b, source: t }) => a == b && s == t,
            (EmptyElementFile(a), EmptyElementFile(b)) => a == b,
            (
                MissingColumn { line: a, column: c },
                MissingColumn { line: b, column: d },
            ) => a == b && c == d,
            (ElementCount(a), ElementCount(b)) => a == b,
            (
                AsteroidElementCount {
                    asteroid: a,
                    expected: c,
                },
                AsteroidElementCount {
                    asteroid: b,
                    expected: d,
                },
            ) => a == b && c == d,
            (
                PhaseCount {
                    phases: a,
                    expected: c,
                },
                PhaseCount {
                    phases: b,
                    expected: d,
                },
            ) => a == b && c == d,
            (
                BodyCountMismatch {
                    series: a,
                    coefficients: c,
                },
                BodyCountMismatch {
                    series: b,
                    coefficients: d,
                },
            ) => a == b && c == d,
            (CoefficientParse { row: a, reason: c }, CoefficientParse { row: b, reason: d }) => {
                a == b && c == d
            }
            (DAlembertViolation(a), DAlembertViolation(b)) => a == b,
            (IdentitySequenceConflict(a), IdentitySequenceConflict(b)) => a == b,
            (UnknownResonance(a), UnknownResonance(b)) => a == b,
            (InvalidConfig(a), InvalidConfig(b)) => a == b,

            (NoPhase, NoPhase) => true,

            _ => false,
        }
    }
}
