//! # Resonance coefficient tables
//!
//! A resonance is written as integer coefficients applied to the mean longitude and the
//! perihelion longitude of each participating body. Tables list one candidate resonance
//! per line followed by the nominal semi-major axis of the resonance:
//!
//! ```text
//! three-body:  l1 l2 l3 p1 p2 p3 axis      (7 tokens)
//! two-body:    l1 l2 p1 p2 axis            (5 tokens)
//! ```
//!
//! The last body of a row is always the small body (asteroid). The others are the big
//! bodies (planets), in the order configured by
//! [`ResonanceConfig::planets`](crate::config::ResonanceConfig).
//!
//! The D'Alembert rule requires the coefficients to sum to zero. Rows violating it can
//! be rejected when the catalog is built (see
//! [`ResonanceConfig::validate_dalembert`](crate::config::ResonanceConfig)).
use std::{fmt, fs::File, io::BufRead, io::BufReader};

use camino::Utf8Path;
use itertools::Itertools;
use smallvec::{smallvec, SmallVec};

use crate::{constants::Au, resonance_errors::ResonanceError};

/// Coefficients of one body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyCoefficients {
    /// Coefficient of the mean longitude λ
    pub longitude: i32,
    /// Coefficient of the perihelion longitude ϖ
    pub perihelion: i32,
}

impl BodyCoefficients {
    pub fn new(longitude: i32, perihelion: i32) -> Self {
        BodyCoefficients {
            longitude,
            perihelion,
        }
    }
}

/// Coefficients of a resonance, big bodies first in role order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResonanceCoefficients {
    pub big: SmallVec<[BodyCoefficients; 2]>,
    pub small: BodyCoefficients,
}

impl ResonanceCoefficients {
    pub fn two_body(longitudes: [i32; 2], perihelions: [i32; 2]) -> Self {
        ResonanceCoefficients {
            big: smallvec![BodyCoefficients::new(longitudes[0], perihelions[0])],
            small: BodyCoefficients::new(longitudes[1], perihelions[1]),
        }
    }

    pub fn three_body(longitudes: [i32; 3], perihelions: [i32; 3]) -> Self {
        ResonanceCoefficients {
            big: smallvec![
                BodyCoefficients::new(longitudes[0], perihelions[0]),
                BodyCoefficients::new(longitudes[1], perihelions[1]),
            ],
            small: BodyCoefficients::new(longitudes[2], perihelions[2]),
        }
    }

    /// Number of participating bodies, small body included.
    pub fn body_count(&self) -> usize {
        self.big.len() + 1
    }

    /// All coefficients in table order: longitudes first, then perihelions.
    pub fn as_table_order(&self) -> Vec<i32> {
        let bodies = || self.big.iter().chain(std::iter::once(&self.small));
        bodies()
            .map(|b| b.longitude)
            .chain(bodies().map(|b| b.perihelion))
            .collect()
    }

    /// D'Alembert rule: the coefficients of a resonant argument sum to zero.
    pub fn satisfies_dalembert(&self) -> bool {
        self.as_table_order().iter().sum::<i32>() == 0
    }
}

impl fmt::Display for ResonanceCoefficients {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.as_table_order().iter().join(" "))
    }
}

/// One parsed line of a coefficient table.
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientRow {
    pub coefficients: ResonanceCoefficients,
    /// Nominal semi-major axis of the resonance
    pub axis: Au,
}

fn row_error(line: &str, reason: impl Into<String>) -> ResonanceError {
    ResonanceError::CoefficientParse {
        row: line.trim().to_string(),
        reason: reason.into(),
    }
}

impl CoefficientRow {
    /// Parse one table line. The body count is taken from the number of tokens.
    ///
    /// Return
    /// ----------
    /// * [`ResonanceError::CoefficientParse`] when the token count is neither 5 nor 7, or
    ///   a coefficient or the axis is not a number.
    pub fn parse(line: &str) -> Result<Self, ResonanceError> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let body_count = match tokens.len() {
            5 => 2,
            7 => 3,
            n => return Err(row_error(line, format!("expected 5 or 7 tokens, found {n}"))),
        };

        let ints = tokens[..2 * body_count]
            .iter()
            .map(|t| {
                t.parse::<i32>()
                    .map_err(|_| row_error(line, format!("invalid coefficient `{t}`")))
            })
            .collect::<Result<Vec<i32>, _>>()?;

        let axis_token = tokens[2 * body_count];
        let axis: Au = axis_token
            .parse()
            .map_err(|_| row_error(line, format!("invalid axis `{axis_token}`")))?;

        let (longitudes, perihelions) = ints.split_at(body_count);
        let mut bodies = longitudes
            .iter()
            .zip(perihelions)
            .map(|(&l, &p)| BodyCoefficients::new(l, p))
            .collect::<SmallVec<[BodyCoefficients; 3]>>();

        let small = bodies
            .pop()
            .ok_or_else(|| row_error(line, "no small body"))?;

        Ok(CoefficientRow {
            coefficients: ResonanceCoefficients {
                big: bodies.into_iter().collect(),
                small,
            },
            axis,
        })
    }

    /// Parse a line that must describe a resonance with `big_bodies` planets.
    pub fn parse_for(line: &str, big_bodies: usize) -> Result<Self, ResonanceError> {
        let row = Self::parse(line)?;
        if row.coefficients.big.len() != big_bodies {
            return Err(row_error(
                line,
                format!(
                    "row describes {} bodies, {} expected",
                    row.coefficients.body_count(),
                    big_bodies + 1
                ),
            ));
        }
        Ok(row)
    }
}

/// All raw lines of a coefficient table, kept unparsed until used.
///
/// Malformed lines are only detected when a caller parses them, so that one bad line
/// does not prevent the rest of the table from loading.
#[derive(Debug, Clone, Default)]
pub struct ResonanceTable {
    lines: Vec<String>,
}

impl ResonanceTable {
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, ResonanceError> {
        let lines = reader
            .lines()
            .filter(|l| l.as_ref().map_or(true, |l| !l.trim().is_empty()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ResonanceTable { lines })
    }

    pub fn from_path(path: &Utf8Path) -> Result<Self, ResonanceError> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Rows whose nominal axis lies within `swing` of `axis`, with the lines that failed
    /// to parse reported separately.
    pub fn matching(
        &self,
        axis: Au,
        swing: Au,
    ) -> (Vec<(&str, CoefficientRow)>, Vec<(&str, ResonanceError)>) {
        let (rows, errors): (Vec<_>, Vec<_>) = self
            .lines
            .iter()
            .map(|line| (line.as_str(), CoefficientRow::parse(line)))
            .partition(|(_, row)| row.is_ok());

        let rows = rows
            .into_iter()
            .filter_map(|(line, row)| row.ok().map(|r| (line, r)))
            .filter(|(_, row)| (row.axis - axis).abs() <= swing)
            .collect();
        let errors = errors
            .into_iter()
            .filter_map(|(line, row)| row.err().map(|e| (line, e)))
            .collect();
        (rows, errors)
    }
}
