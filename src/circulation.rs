//! # Circulation break detection
//!
//! A resonant phase that librates stays inside a bounded arc of (−π, π]. When it
//! circulates, it eventually crosses the ±π boundary and the wrapped value jumps by
//! roughly 2π between two consecutive samples. Each such jump is a **circulation break**.
//!
//! ## Algorithm
//! -----------------
//! Walking the samples in ascending time order, with `prev` the previous wrapped phase:
//!
//! * a break occurs when `|prev − current| ≥ π`,
//! * its sign is `+1` when `prev > current`, `−1` otherwise,
//! * when the sign differs from the sign of the previous break (and a previous break
//!   exists), the **previously recorded break** is removed first,
//! * the break is recorded at the time of the sample preceding the jump.
//!
//! The removal step collapses a crossing immediately undone by a crossing in the other
//! direction into a single event. It must be kept exactly as is: the libration
//! statistics of the catalog were computed with it.
//!
//! In apocentric mode every phase is first shifted by π (see [`crate::phase::apocentric`]),
//! which moves the libration center from 0 to ±π.
use std::f64::consts::PI;

use crate::{
    constants::{Radian, Years},
    phase::{apocentric, PhaseSample},
    resonance_errors::ResonanceError,
};

/// Sign of the last recorded break.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BreakSign {
    None,
    Decreasing,
    Increasing,
}

/// Streaming scanner of circulation breaks.
///
/// Feed samples with [`CirculationFinder::push`], then call [`CirculationFinder::finish`].
/// For a one-shot scan use [`CirculationFinder::find`] or [`CirculationFinder::try_find`].
#[derive(Debug, Clone)]
pub struct CirculationFinder {
    is_apocentric: bool,
    previous: Option<PhaseSample>,
    previous_sign: BreakSign,
    breaks: Vec<Years>,
}

impl CirculationFinder {
    pub fn new(is_apocentric: bool) -> Self {
        CirculationFinder {
            is_apocentric,
            previous: None,
            previous_sign: BreakSign::None,
            breaks: Vec::new(),
        }
    }

    #[inline]
    fn centered(&self, value: Radian) -> Radian {
        if self.is_apocentric {
            apocentric(value)
        } else {
            value
        }
    }

    /// Scan one more sample. Samples must come in ascending time order.
    pub fn push(&mut self, sample: PhaseSample) {
        let value = self.centered(sample.value);

        if let Some(previous) = self.previous {
            if (previous.value - value).abs() >= PI {
                let sign = if previous.value > value {
                    BreakSign::Decreasing
                } else {
                    BreakSign::Increasing
                };

                if sign != self.previous_sign && self.previous_sign != BreakSign::None {
                    self.breaks.pop();
                }
                self.breaks.push(previous.time);
                self.previous_sign = sign;
            }
        }

        self.previous = Some(PhaseSample {
            time: sample.time,
            value,
        });
    }

    /// Breaks recorded so far.
    pub fn breaks(&self) -> &[Years] {
        &self.breaks
    }

    /// Return
    /// ----------
    /// * The break times in ascending order.
    /// * [`ResonanceError::NoPhase`] when no sample was pushed.
    pub fn finish(self) -> Result<Vec<Years>, ResonanceError> {
        if self.previous.is_none() {
            return Err(ResonanceError::NoPhase);
        }
        Ok(self.breaks)
    }

    /// Scan a complete phase sequence.
    pub fn find<I>(samples: I, is_apocentric: bool) -> Result<Vec<Years>, ResonanceError>
    where
        I: IntoIterator<Item = PhaseSample>,
    {
        let mut finder = Self::new(is_apocentric);
        samples.into_iter().for_each(|s| finder.push(s));
        finder.finish()
    }

    /// Scan a fallible phase sequence, such as a [`crate::phase::PhaseIter`].
    ///
    /// The first error stops the scan and is returned as is.
    pub fn try_find<I>(samples: I, is_apocentric: bool) -> Result<Vec<Years>, ResonanceError>
    where
        I: IntoIterator<Item = Result<PhaseSample, ResonanceError>>,
    {
        let mut finder = Self::new(is_apocentric);
        for sample in samples {
            finder.push(sample?);
        }
        finder.finish()
    }
}
