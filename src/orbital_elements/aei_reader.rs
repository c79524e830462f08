//! # Integrator aei element reader
//!
//! Utilities to parse the **aei** orbital-element files written by the N-body integrator
//! and turn each row into an [`OrbitalElementSample`].
//!
//! ## Overview
//! -----------------
//! This module provides:
//! - A small error type [`ParseAeiError`] describing token-level failures.
//! - A crate-internal line parser (`from_aei_line`) converting one row into an
//!   [`OrbitalElementSample`] with angles in **radians**.
//! - [`ElementRows`], a lazy iterator over the rows of any [`BufRead`] source. The fixed
//!   header is skipped, and every data row yields one `Result`.
//!
//! ## Row layout
//! -----------------
//! Whitespace separated, in this order:
//!
//! ```text
//! 0 time   1 ϖ(deg)   2 M(deg)   3 a   4 e   5 i(deg)   6 (unused)   7 Ω(deg)   8 mass (ignored)
//! ```
//!
//! Inclination and node are truncated to whole degrees before the radian conversion.
//! Downstream phases only use the longitudes, and the truncation is kept so that res
//! files stay comparable with the ones already produced by the pipeline.
//!
//! ## Error Handling
//! -----------------
//! * A non-numeric (or non-finite) token gives [`ResonanceError::AeiParse`] with the
//!   1-based file line number and a [`ParseAeiError`] payload.
//! * A row with fewer than eight columns gives [`ResonanceError::MissingColumn`].
use std::io::{BufRead, Lines};

use thiserror::Error;

use crate::{
    constants::{AEI_HEADER_LINES, RADEG},
    orbital_elements::OrbitalElementSample,
    resonance_errors::ResonanceError,
};

/// Columns a data row must provide; the trailing mass column is optional.
const REQUIRED_COLUMNS: usize = 8;

/// Token-level parsing errors for aei rows.
///
/// Variants
/// -----------------
/// * `InvalidNumber` – The token at `column` is not a number; payload carries the token.
/// * `NotFinite` – The token parsed to `NaN` or an infinity (ejected or diverged body).
#[derive(Error, Debug, PartialEq)]
pub enum ParseAeiError {
    #[error("Invalid number in column {column}: {token}")]
    InvalidNumber { column: usize, token: String },
    #[error("Non finite value in column {0}")]
    NotFinite(usize),
}

fn parse_column(tokens: &[&str], column: usize, line: usize) -> Result<f64, ResonanceError> {
    let token = tokens
        .get(column)
        .ok_or(ResonanceError::MissingColumn { line, column })?;

    let value: f64 = token.parse().map_err(|_| ResonanceError::AeiParse {
        line,
        source: ParseAeiError::InvalidNumber {
            column,
            token: token.to_string(),
        },
    })?;

    if !value.is_finite() {
        return Err(ResonanceError::AeiParse {
            line,
            source: ParseAeiError::NotFinite(column),
        });
    }
    Ok(value)
}

/// Parse one data row of an aei file (crate-private helper).
///
/// Arguments
/// -----------------
/// * `line` – The raw text row.
/// * `line_number` – 1-based position of the row in its file, used in error reports.
///
/// Return
/// ----------
/// * The parsed [`OrbitalElementSample`] or a [`ResonanceError`] describing the first bad column.
pub(crate) fn from_aei_line(
    line: &str,
    line_number: usize,
) -> Result<OrbitalElementSample, ResonanceError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < REQUIRED_COLUMNS {
        return Err(ResonanceError::MissingColumn {
            line: line_number,
            column: tokens.len(),
        });
    }

    let column = |index: usize| parse_column(&tokens, index, line_number);

    let time = column(0)?;
    let perihelion_longitude = column(1)?.to_radians();
    let mean_anomaly = column(2)?.to_radians();
    let semi_major_axis = column(3)?;
    let eccentricity = column(4)?;
    let inclination = column(5)?.trunc() * RADEG;
    let ascending_node = column(7)?.trunc() * RADEG;

    Ok(OrbitalElementSample {
        time,
        perihelion_longitude,
        mean_anomaly,
        mean_longitude: perihelion_longitude + mean_anomaly,
        semi_major_axis,
        eccentricity,
        inclination,
        ascending_node,
    })
}

/// Lazy iterator over the data rows of an aei source.
///
/// The first [`AEI_HEADER_LINES`] lines are skipped and blank lines are ignored.
/// The iterator can be consumed only once; to scan the rows again, open the source again.
pub struct ElementRows<R: BufRead> {
    lines: Lines<R>,
    line_number: usize,
}

impl<R: BufRead> ElementRows<R> {
    pub fn new(reader: R) -> Self {
        ElementRows {
            lines: reader.lines(),
            line_number: 0,
        }
    }
}

impl<R: BufRead> Iterator for ElementRows<R> {
    type Item = Result<OrbitalElementSample, ResonanceError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_number += 1;

            if self.line_number <= AEI_HEADER_LINES || line.trim().is_empty() {
                continue;
            }
            return Some(from_aei_line(&line, self.line_number));
        }
    }
}
