//! Text serialization of a phase series ("res" files).
//!
//! One line per aligned row, every value printed with six decimals:
//!
//! ```text
//! <time> <phase> <a e i Ω ϖ of the asteroid> <a e of big body 1> [<a e of big body 2>]
//! ```
//!
//! The plotting tools read these files back, so the column order is part of the contract.
use std::{
    fs::File,
    io::{BufWriter, Write},
};

use camino::Utf8Path;
use itertools::Itertools;

use crate::{
    orbital_elements::OrbitalElementSample,
    phase::{PhaseSample, PhaseSource},
    resonance_errors::ResonanceError,
};

fn res_line<'a>(
    phase: &PhaseSample,
    asteroid: &OrbitalElementSample,
    big_bodies: impl Iterator<Item = &'a OrbitalElementSample>,
) -> String {
    let head = [
        phase.time,
        phase.value,
        asteroid.semi_major_axis,
        asteroid.eccentricity,
        asteroid.inclination,
        asteroid.ascending_node,
        asteroid.perihelion_longitude,
    ];
    let tail = big_bodies.flat_map(|s| [s.semi_major_axis, s.eccentricity]);

    head.into_iter()
        .chain(tail)
        .map(|v| format!("{v:.6}"))
        .join(" ")
}

/// Write the res lines of `source` over the small-body `rows` into `out`.
///
/// Return
/// ----------
/// * The number of lines written, or the first row / alignment / I/O error. Lines written
///   before an error stay in `out`.
pub fn write_res<S, I, W>(source: &S, rows: I, mut out: W) -> Result<usize, ResonanceError>
where
    S: PhaseSource,
    I: IntoIterator<Item = Result<OrbitalElementSample, ResonanceError>>,
    W: Write,
{
    let mut phases = source.phases(rows);
    let mut written = 0;

    loop {
        let index = phases.position();
        let (asteroid, phase) = match phases.next_row() {
            None => break,
            Some(row) => row?,
        };

        let line = res_line(&phase, &asteroid, source.bodies().row(index));
        writeln!(out, "{line}")?;
        written += 1;
    }

    out.flush()?;
    Ok(written)
}

/// [`write_res`] into a new file at `path`.
pub fn write_res_file<S, I>(source: &S, rows: I, path: &Utf8Path) -> Result<usize, ResonanceError>
where
    S: PhaseSource,
    I: IntoIterator<Item = Result<OrbitalElementSample, ResonanceError>>,
{
    let file = File::create(path)?;
    write_res(source, rows, BufWriter::new(file))
}

#[cfg(test)]
mod res_writer_test {
    use super::*;
    use crate::{
        coefficients::ResonanceCoefficients,
        orbital_elements::OrbitalElementSeries,
        phase::{KnownPhases, PhaseComputer},
    };

    fn sample(time: f64, a: f64) -> OrbitalElementSample {
        OrbitalElementSample {
            time,
            perihelion_longitude: 0.5,
            mean_anomaly: 0.25,
            mean_longitude: 0.75,
            semi_major_axis: a,
            eccentricity: 0.05,
            inclination: 0.1,
            ascending_node: 0.2,
        }
    }

    #[test]
    fn test_res_layout_two_body() {
        let jupiter = OrbitalElementSeries::new("JUPITER", vec![sample(0.0, 5.2), sample(1.0, 5.2)]);
        let asteroid = OrbitalElementSeries::new("A1", vec![sample(0.0, 3.2), sample(1.0, 3.2)]);
        let known = KnownPhases::new(&[&jupiter], vec![1.0, -1.0]).unwrap();

        let mut out = Vec::new();
        let written = write_res(&known, asteroid.iter().copied().map(Ok), &mut out).unwrap();

        assert_eq!(written, 2);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "0.000000 1.000000 3.200000 0.050000 0.100000 0.200000 0.500000 5.200000 0.050000\n\
             1.000000 -1.000000 3.200000 0.050000 0.100000 0.200000 0.500000 5.200000 0.050000\n"
        );
    }

    #[test]
    fn test_res_layout_three_body() {
        let jupiter = OrbitalElementSeries::new("JUPITER", vec![sample(0.0, 5.2)]);
        let saturn = OrbitalElementSeries::new("SATURN", vec![sample(0.0, 9.5)]);
        let asteroid = OrbitalElementSeries::new("A1", vec![sample(0.0, 3.2)]);
        let coefficients = ResonanceCoefficients::three_body([1, 1, -1], [0, 0, -1]);
        let computer = PhaseComputer::new(&[&jupiter, &saturn], &coefficients).unwrap();

        let mut out = Vec::new();
        write_res(&computer, asteroid.iter().copied().map(Ok), &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let columns: Vec<&str> = text.split_whitespace().collect();
        assert_eq!(columns.len(), 11);
        // 0.75 + 0.75 - 0.75 - 0.5
        assert_eq!(columns[1], "0.250000");
        assert_eq!(&columns[7..], ["5.200000", "0.050000", "9.500000", "0.050000"]);
    }

    #[test]
    fn test_res_stops_on_count_mismatch() {
        let jupiter = OrbitalElementSeries::new("JUPITER", vec![sample(0.0, 5.2), sample(1.0, 5.2)]);
        let known = KnownPhases::new(&[&jupiter], vec![1.0, -1.0]).unwrap();

        let mut out = Vec::new();
        let result = write_res(&known, vec![Ok(sample(0.0, 3.2))], &mut out);
        assert_eq!(
            result,
            Err(ResonanceError::AsteroidElementCount {
                asteroid: 1,
                expected: 2
            })
        );
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 1);
    }
}
