//! # Orbital element series
//!
//! Per-timestep orbital elements of one body, as produced by the integrator.
//!
//! An [`OrbitalElementSeries`] is the fully loaded content of one aei file. It is
//! indexable by row position so that several bodies integrated on the same time grid can
//! be aligned in O(1) by row index (see [`crate::phase::PhaseComputer`]).
//!
//! Units
//! -----------------
//! * `time`: years, as written by the integrator
//! * angles: **radians**
//! * `semi_major_axis`: AU
pub mod aei_reader;

use std::{
    fs::File,
    io::{BufRead, BufReader},
    ops::Index,
};

use camino::Utf8Path;

use crate::{
    constants::{Au, BodyName, Radian, Years, AEI_EXTENSION, GAUSS_GRAV_SQUARED},
    resonance_errors::ResonanceError,
};

pub use aei_reader::{ElementRows, ParseAeiError};

/// One row of an aei file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitalElementSample {
    pub time: Years,
    pub perihelion_longitude: Radian,
    pub mean_anomaly: Radian,
    /// `perihelion_longitude + mean_anomaly`, not reduced to a principal value
    pub mean_longitude: Radian,
    pub semi_major_axis: Au,
    pub eccentricity: f64,
    pub inclination: Radian,
    pub ascending_node: Radian,
}

impl OrbitalElementSample {
    /// Mean motion `n = sqrt(k² / a³)` in radians per day.
    pub fn mean_motion(&self) -> f64 {
        (GAUSS_GRAV_SQUARED / self.semi_major_axis.powi(3)).sqrt()
    }
}

/// All element rows of one body.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitalElementSeries {
    name: String,
    samples: Vec<OrbitalElementSample>,
}

/// Path of the aei file of `body` inside `dir`.
pub fn aei_path(dir: &Utf8Path, body: &BodyName) -> camino::Utf8PathBuf {
    dir.join(format!("{}.{AEI_EXTENSION}", body.file_stem()))
}

/// Open the aei file of `body` as a lazy row iterator.
pub fn open_rows(
    dir: &Utf8Path,
    body: &BodyName,
) -> Result<ElementRows<BufReader<File>>, ResonanceError> {
    let file = File::open(aei_path(dir, body))?;
    Ok(ElementRows::new(BufReader::new(file)))
}

impl OrbitalElementSeries {
    pub fn new(name: impl Into<String>, samples: Vec<OrbitalElementSample>) -> Self {
        OrbitalElementSeries {
            name: name.into(),
            samples,
        }
    }

    /// Read a whole aei source.
    ///
    /// Return
    /// ----------
    /// * The series, or the first row error.
    /// * [`ResonanceError::EmptyElementFile`] when the source holds no data row.
    pub fn from_reader<R: BufRead>(name: &str, reader: R) -> Result<Self, ResonanceError> {
        let samples = ElementRows::new(reader).collect::<Result<Vec<_>, _>>()?;
        if samples.is_empty() {
            return Err(ResonanceError::EmptyElementFile(name.to_string()));
        }
        Ok(OrbitalElementSeries::new(name, samples))
    }

    /// Read an aei file from disk. The series is named after the file stem.
    pub fn from_path(path: &Utf8Path) -> Result<Self, ResonanceError> {
        let file = File::open(path)?;
        let name = path.file_stem().unwrap_or(path.as_str());
        Self::from_reader(name, BufReader::new(file))
    }

    /// Read the aei file of `body` from the integrator output directory.
    pub fn load(dir: &Utf8Path, body: &BodyName) -> Result<Self, ResonanceError> {
        Self::from_path(&aei_path(dir, body))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&OrbitalElementSample> {
        self.samples.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, OrbitalElementSample> {
        self.samples.iter()
    }

    pub fn samples(&self) -> &[OrbitalElementSample] {
        &self.samples
    }

    /// Time span covered by the series (last minus first sample time).
    pub fn span(&self) -> Years {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => last.time - first.time,
            _ => 0.0,
        }
    }
}

impl Index<usize> for OrbitalElementSeries {
    type Output = OrbitalElementSample;

    fn index(&self, index: usize) -> &Self::Output {
        &self.samples[index]
    }
}

impl<'a> IntoIterator for &'a OrbitalElementSeries {
    type Item = &'a OrbitalElementSample;
    type IntoIter = std::slice::Iter<'a, OrbitalElementSample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}
