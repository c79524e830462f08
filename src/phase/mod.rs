//! # Resonant phase computation
//!
//! Combine the aligned element series of the big bodies (one planet for a two-body
//! resonance, two for a three-body one) with the rows of the small body and the integer
//! coefficients of a resonance into a time series of the **resonant phase**
//!
//! ```text
//! φ_i = Σ_b ( l_b · λ_b,i + p_b · ϖ_b,i )      wrapped into (−π, π]
//! ```
//!
//! where `λ` is the mean longitude, `ϖ` the perihelion longitude, `l_b`/`p_b` the
//! longitude and perihelion coefficients of body `b`.
//!
//! ## Overview
//! -----------------
//! * [`cutoff`] – iterative wrap of an angle into (−π, π].
//! * [`AlignedBodies`] – big-body series checked for equal length at construction.
//! * [`PhaseSource`] – anything able to give the phase of row `i`:
//!   * [`PhaseComputer`] recomputes it from the resonance coefficients,
//!   * [`KnownPhases`] replays a precomputed phase list (apocentric re-rendering).
//! * [`PhaseIter`] – lazy `(time, phase)` sequence driven by the small-body rows.
//! * [`res_writer`] – text serialization interleaving phases with the body elements.
//!
//! ## Alignment
//! -----------------
//! Bodies are aligned **by row index**: row `i` of every series is assumed to be the same
//! epoch. Big-body length mismatches are rejected when the source is built
//! ([`ResonanceError::ElementCount`]); the small-body row count is only known once its rows
//! have been consumed and is reported lazily by [`PhaseIter`]
//! ([`ResonanceError::AsteroidElementCount`]).
pub mod res_writer;

use itertools::Itertools;
use smallvec::SmallVec;
use std::f64::consts::PI;

use crate::{
    coefficients::{BodyCoefficients, ResonanceCoefficients},
    constants::{Radian, Years, DPI},
    orbital_elements::{OrbitalElementSample, OrbitalElementSeries},
    resonance_errors::ResonanceError,
};

pub use res_writer::{write_res, write_res_file};

/// Wrap an angle into (−π, π] by repeated subtraction or addition of 2π.
///
/// The loop is deliberate: it does not round like `rem_euclid` and the circulation
/// scan depends on the exact values it produces near ±π. Inputs whose magnitude would
/// need more than a few thousand turns are first reduced with `rem_euclid`, and
/// non-finite inputs are returned unchanged.
pub fn cutoff(angle: Radian) -> Radian {
    const MAX_TURNS: f64 = 4096.0;

    if !angle.is_finite() {
        return angle;
    }

    let mut value = if angle.abs() > MAX_TURNS * DPI {
        angle.rem_euclid(DPI)
    } else {
        angle
    };

    while value > PI {
        value -= DPI;
    }
    while value <= -PI {
        value += DPI;
    }
    value
}

/// Re-center a phase on the apocentric libration point.
#[inline]
pub fn apocentric(angle: Radian) -> Radian {
    cutoff(angle + PI)
}

/// One `(time, phase)` pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseSample {
    pub time: Years,
    pub value: Radian,
}

/// Element series of the big bodies, checked for equal length.
#[derive(Debug, Clone)]
pub struct AlignedBodies<'a> {
    series: Vec<&'a OrbitalElementSeries>,
    len: usize,
}

impl<'a> AlignedBodies<'a> {
    /// Return
    /// ----------
    /// * [`ResonanceError::ElementCount`] when the series lengths differ or no series is given.
    pub fn new(series: &[&'a OrbitalElementSeries]) -> Result<Self, ResonanceError> {
        let lengths: Vec<usize> = series.iter().map(|s| s.len()).collect();
        if lengths.is_empty() || !lengths.iter().all_equal() {
            return Err(ResonanceError::ElementCount(lengths));
        }

        Ok(AlignedBodies {
            series: series.to_vec(),
            len: lengths[0],
        })
    }

    /// Common row count of all the big bodies.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn series(&self) -> &[&'a OrbitalElementSeries] {
        &self.series
    }

    /// Row `index` of every big body, in role order.
    pub fn row(&self, index: usize) -> impl Iterator<Item = &'a OrbitalElementSample> + '_ {
        self.series.iter().map(move |s| &s[index])
    }
}

/// Source of the resonant phase of each aligned row.
pub trait PhaseSource {
    fn bodies(&self) -> &AlignedBodies<'_>;

    /// Phase of row `index`, given the small-body sample of that row.
    fn phase(&self, index: usize, asteroid: &OrbitalElementSample) -> Radian;

    /// Lazy `(time, phase)` sequence over the small-body rows.
    ///
    /// The sequence is consumed once. To replay it, reopen the rows and call again.
    fn phases<I>(&self, asteroid_rows: I) -> PhaseIter<'_, Self, I::IntoIter>
    where
        Self: Sized,
        I: IntoIterator<Item = Result<OrbitalElementSample, ResonanceError>>,
    {
        PhaseIter {
            source: self,
            rows: asteroid_rows.into_iter(),
            index: 0,
            done: false,
        }
    }

    /// Eager version of [`PhaseSource::phases`] over an already loaded series.
    fn compute(&self, asteroid: &OrbitalElementSeries) -> Result<Vec<PhaseSample>, ResonanceError>
    where
        Self: Sized,
    {
        self.phases(asteroid.iter().copied().map(Ok)).collect()
    }
}

/// Phase recomputed from the resonance coefficients.
#[derive(Debug, Clone)]
pub struct PhaseComputer<'a> {
    bodies: AlignedBodies<'a>,
    big_coefficients: SmallVec<[BodyCoefficients; 2]>,
    small_coefficients: BodyCoefficients,
}

impl<'a> PhaseComputer<'a> {
    /// Build a computer for one resonance.
    ///
    /// Arguments
    /// -----------------
    /// * `big_bodies` – Element series of the planets, in the role order of the coefficients.
    /// * `coefficients` – Integer coefficients of the resonance.
    ///
    /// Return
    /// ----------
    /// * [`ResonanceError::ElementCount`] if the series lengths differ.
    /// * [`ResonanceError::BodyCountMismatch`] if the number of series does not match the
    ///   number of big-body coefficients.
    pub fn new(
        big_bodies: &[&'a OrbitalElementSeries],
        coefficients: &ResonanceCoefficients,
    ) -> Result<Self, ResonanceError> {
        if big_bodies.len() != coefficients.big.len() {
            return Err(ResonanceError::BodyCountMismatch {
                series: big_bodies.len(),
                coefficients: coefficients.big.len(),
            });
        }

        Ok(PhaseComputer {
            bodies: AlignedBodies::new(big_bodies)?,
            big_coefficients: coefficients.big.clone(),
            small_coefficients: coefficients.small,
        })
    }
}

#[inline]
fn body_term(coefficients: &BodyCoefficients, sample: &OrbitalElementSample) -> f64 {
    coefficients.longitude as f64 * sample.mean_longitude
        + coefficients.perihelion as f64 * sample.perihelion_longitude
}

impl PhaseSource for PhaseComputer<'_> {
    fn bodies(&self) -> &AlignedBodies<'_> {
        &self.bodies
    }

    fn phase(&self, index: usize, asteroid: &OrbitalElementSample) -> Radian {
        let big: f64 = self
            .big_coefficients
            .iter()
            .zip(self.bodies.row(index))
            .map(|(coefficients, sample)| body_term(coefficients, sample))
            .sum();

        cutoff(big + body_term(&self.small_coefficients, asteroid))
    }
}

/// Phase values already computed elsewhere, replayed against the body elements.
#[derive(Debug, Clone)]
pub struct KnownPhases<'a> {
    bodies: AlignedBodies<'a>,
    values: Vec<Radian>,
}

impl<'a> KnownPhases<'a> {
    /// Return
    /// ----------
    /// * [`ResonanceError::ElementCount`] if the series lengths differ.
    /// * [`ResonanceError::PhaseCount`] if there is not exactly one phase per row.
    pub fn new(
        big_bodies: &[&'a OrbitalElementSeries],
        values: Vec<Radian>,
    ) -> Result<Self, ResonanceError> {
        let bodies = AlignedBodies::new(big_bodies)?;
        if values.len() != bodies.len() {
            return Err(ResonanceError::PhaseCount {
                phases: values.len(),
                expected: bodies.len(),
            });
        }
        Ok(KnownPhases { bodies, values })
    }

    /// Known phases shifted onto the apocentric center.
    pub fn apocentric(
        big_bodies: &[&'a OrbitalElementSeries],
        samples: &[PhaseSample],
    ) -> Result<Self, ResonanceError> {
        Self::new(big_bodies, samples.iter().map(|s| apocentric(s.value)).collect())
    }
}

impl PhaseSource for KnownPhases<'_> {
    fn bodies(&self) -> &AlignedBodies<'_> {
        &self.bodies
    }

    fn phase(&self, index: usize, _asteroid: &OrbitalElementSample) -> Radian {
        self.values[index]
    }
}

/// Lazy, finite sequence of [`PhaseSample`], one per aligned row.
///
/// Yields `Err` and stops at the first unreadable small-body row, or when the small body
/// turns out to have a different row count than the big bodies.
pub struct PhaseIter<'s, S, I> {
    source: &'s S,
    rows: I,
    index: usize,
    done: bool,
}

impl<S, I> PhaseIter<'_, S, I>
where
    S: PhaseSource,
    I: Iterator<Item = Result<OrbitalElementSample, ResonanceError>>,
{
    /// Advance to the next row and return it with the phase of that row.
    pub(crate) fn next_row(
        &mut self,
    ) -> Option<Result<(OrbitalElementSample, PhaseSample), ResonanceError>> {
        if self.done {
            return None;
        }

        let expected = self.source.bodies().len();
        let row = match self.rows.next() {
            None => {
                self.done = true;
                return (self.index < expected).then(|| {
                    Err(ResonanceError::AsteroidElementCount {
                        asteroid: self.index,
                        expected,
                    })
                });
            }
            Some(Err(e)) => {
                self.done = true;
                return Some(Err(e));
            }
            Some(Ok(row)) => row,
        };

        if self.index >= expected {
            self.done = true;
            let extra = self.rows.by_ref().count();
            return Some(Err(ResonanceError::AsteroidElementCount {
                asteroid: self.index + 1 + extra,
                expected,
            }));
        }

        let phase = PhaseSample {
            time: row.time,
            value: self.source.phase(self.index, &row),
        };
        self.index += 1;
        Some(Ok((row, phase)))
    }

    /// Index of the next row to be produced.
    pub(crate) fn position(&self) -> usize {
        self.index
    }
}

impl<S, I> Iterator for PhaseIter<'_, S, I>
where
    S: PhaseSource,
    I: Iterator<Item = Result<OrbitalElementSample, ResonanceError>>,
{
    type Item = Result<PhaseSample, ResonanceError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row().map(|r| r.map(|(_, phase)| phase))
    }
}

#[cfg(test)]
mod phase_test {
    use super::*;
    use crate::coefficients::ResonanceCoefficients;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    pub(crate) fn sample(time: f64, mean_longitude: f64, perihelion_longitude: f64) -> OrbitalElementSample {
        OrbitalElementSample {
            time,
            perihelion_longitude,
            mean_anomaly: mean_longitude - perihelion_longitude,
            mean_longitude,
            semi_major_axis: 3.0,
            eccentricity: 0.1,
            inclination: 0.0,
            ascending_node: 0.0,
        }
    }

    fn series(name: &str, n: usize, rate: f64) -> OrbitalElementSeries {
        OrbitalElementSeries::new(
            name,
            (0..n)
                .map(|i| sample(i as f64, rate * i as f64, 0.1 * i as f64))
                .collect(),
        )
    }

    #[test]
    fn test_cutoff_values() {
        assert_eq!(cutoff(0.0), 0.0);
        assert_eq!(cutoff(PI), PI);
        assert_relative_eq!(cutoff(-PI), PI);
        assert_relative_eq!(cutoff(3.0 * PI / 2.0), -PI / 2.0, epsilon = 1e-12);
        assert_relative_eq!(cutoff(-7.0 * PI / 2.0), PI / 2.0, epsilon = 1e-12);
        assert_relative_eq!(cutoff(10.0 * DPI + 1.0), 1.0, epsilon = 1e-9);
        assert!(cutoff(f64::NAN).is_nan());
    }

    proptest! {
        #[test]
        fn prop_cutoff_in_range_and_idempotent(x in -1.0e6f64..1.0e6f64) {
            let y = cutoff(x);
            prop_assert!(y > -PI && y <= PI);
            prop_assert_eq!(cutoff(y), y);
        }

        #[test]
        fn prop_cutoff_huge_values_in_range(x in proptest::num::f64::NORMAL) {
            let y = cutoff(x);
            prop_assert!(y > -PI && y <= PI);
            prop_assert_eq!(cutoff(y), y);
        }
    }

    #[test]
    fn test_aligned_bodies_count_mismatch() {
        let jupiter = series("JUPITER", 3, 0.5);
        let saturn = series("SATURN", 4, 0.2);

        let result = AlignedBodies::new(&[&jupiter, &saturn]);
        assert!(matches!(result, Err(ResonanceError::ElementCount(ref l)) if l == &vec![3, 4]));
    }

    #[test]
    fn test_phase_computer_three_body() {
        let jupiter = series("JUPITER", 4, 0.5);
        let saturn = series("SATURN", 4, 0.2);
        let asteroid = series("A1", 4, 0.3);
        let coefficients = ResonanceCoefficients::three_body([4, -2, -1], [0, 0, -1]);

        let computer = PhaseComputer::new(&[&jupiter, &saturn], &coefficients).unwrap();
        let phases = computer.compute(&asteroid).unwrap();

        assert_eq!(phases.len(), 4);
        for (i, phase) in phases.iter().enumerate() {
            let t = i as f64;
            let raw = 4.0 * 0.5 * t - 2.0 * 0.2 * t - 0.3 * t - 0.1 * t;
            assert_eq!(phase.time, t);
            assert_relative_eq!(phase.value, cutoff(raw), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_phase_computer_body_count_mismatch() {
        let jupiter = series("JUPITER", 4, 0.5);
        let coefficients = ResonanceCoefficients::three_body([4, -2, -1], [0, 0, -1]);
        let result = PhaseComputer::new(&[&jupiter], &coefficients);
        assert!(matches!(
            result,
            Err(ResonanceError::BodyCountMismatch {
                series: 1,
                coefficients: 2
            })
        ));
    }

    #[test]
    fn test_asteroid_count_shorter() {
        let jupiter = series("JUPITER", 6, 0.5);
        let asteroid = series("A1", 5, 0.3);
        let coefficients = ResonanceCoefficients::two_body([3, -1], [0, -2]);

        let computer = PhaseComputer::new(&[&jupiter], &coefficients).unwrap();
        let result = computer.compute(&asteroid);
        assert_eq!(
            result,
            Err(ResonanceError::AsteroidElementCount {
                asteroid: 5,
                expected: 6
            })
        );
    }

    #[test]
    fn test_asteroid_count_longer() {
        let jupiter = series("JUPITER", 3, 0.5);
        let asteroid = series("A1", 5, 0.3);
        let coefficients = ResonanceCoefficients::two_body([3, -1], [0, -2]);

        let computer = PhaseComputer::new(&[&jupiter], &coefficients).unwrap();
        let mut phases = computer.phases(asteroid.iter().copied().map(Ok));

        assert!(phases.next().unwrap().is_ok());
        assert!(phases.next().unwrap().is_ok());
        assert!(phases.next().unwrap().is_ok());
        assert_eq!(
            phases.next(),
            Some(Err(ResonanceError::AsteroidElementCount {
                asteroid: 5,
                expected: 3
            }))
        );
        assert_eq!(phases.next(), None);
    }

    #[test]
    fn test_known_phases() {
        let jupiter = series("JUPITER", 3, 0.5);
        let asteroid = series("A1", 3, 0.3);

        let known = KnownPhases::new(&[&jupiter], vec![0.1, 0.2, 0.3]).unwrap();
        let values: Vec<f64> = known
            .compute(&asteroid)
            .unwrap()
            .into_iter()
            .map(|p| p.value)
            .collect();
        assert_eq!(values, vec![0.1, 0.2, 0.3]);

        let result = KnownPhases::new(&[&jupiter], vec![0.1]);
        assert!(matches!(
            result,
            Err(ResonanceError::PhaseCount {
                phases: 1,
                expected: 3
            })
        ));
    }

    #[test]
    fn test_known_phases_apocentric_shift() {
        let jupiter = series("JUPITER", 2, 0.5);
        let samples = [
            PhaseSample { time: 0.0, value: 0.0 },
            PhaseSample { time: 1.0, value: 3.0 },
        ];
        let known = KnownPhases::apocentric(&[&jupiter], &samples).unwrap();
        assert_eq!(known.values[0], PI);
        assert_relative_eq!(known.values[1], 3.0 - PI, epsilon = 1e-12);
    }
}
