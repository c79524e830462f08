//! # Batch drivers
//!
//! Run the pipeline over a range of asteroid numbers, one asteroid after the other, on
//! the calling thread.
//!
//! ## Overview
//! -----------------
//! * [`build_catalog`] – read the semi-major axis of each asteroid from its aei file,
//!   select the coefficient-table rows within `axis_swing` of it and create the matching
//!   catalog rows with [`ResonanceCatalogBuilder`]. Malformed rows are logged and skipped.
//! * [`classify_range`] – classify every catalog resonance of each asteroid with
//!   [`LibrationClassifier`], collecting the outcomes in a [`ClassificationResult`] map.
//!
//! ## Error policy
//! -----------------
//! * Asteroids already in the broken-asteroid cache are skipped without reading any file.
//! * Unusable element data ([`ResonanceError::is_broken_data`]) marks the asteroid broken,
//!   with the error as reason, and moves on to the next asteroid.
//! * Any other error on a resonance is logged with the asteroid and the resonance, and
//!   only that resonance is skipped.
//! * Missing planet files and catalog failures abort the batch.
//!
//! With the `progress` feature, both drivers draw an `indicatif` progress bar.
pub mod progress_bar;

use std::{collections::HashMap, fmt, ops::RangeInclusive};

use ahash::RandomState;
use camino::Utf8Path;

use crate::{
    catalog::{Catalog, ResonanceCatalogBuilder, ResonanceKind, StoredResonance},
    coefficients::ResonanceTable,
    config::ResonanceConfig,
    constants::{AsteroidNumber, Au, BodyName},
    libration::classifier::{Classification, ClassifyMode, LibrationClassifier, LibrationOutcome},
    orbital_elements::{open_rows, OrbitalElementSeries},
    resonance_errors::ResonanceError,
};

use progress_bar::{fmt_dur, BatchProgress};

/// Per-asteroid outcome of [`classify_range`].
///
/// Asteroids without any catalog resonance, or skipped as already broken, have no entry.
pub type ClassificationResult =
    HashMap<AsteroidNumber, Result<Vec<Classification>, ResonanceError>, RandomState>;

fn range_len(range: &RangeInclusive<AsteroidNumber>) -> u64 {
    if range.is_empty() {
        0
    } else {
        u64::from(*range.end()) - u64::from(*range.start()) + 1
    }
}

/// Record `asteroid` as broken when `error` says its data is unusable.
fn handle_asteroid_error(
    catalog: &Catalog,
    asteroid: AsteroidNumber,
    resonance: Option<&StoredResonance>,
    error: &ResonanceError,
) -> Result<bool, ResonanceError> {
    let resonance = resonance.map(ToString::to_string).unwrap_or_default();
    if error.is_broken_data() {
        let newly = catalog.mark_broken(asteroid, Some(&error.to_string()))?;
        tracing::warn!(asteroid, resonance = %resonance, error = %error, "asteroid marked broken");
        Ok(newly)
    } else {
        tracing::warn!(asteroid, resonance = %resonance, error = %error, "skipped");
        Ok(false)
    }
}

// -------------------------------------------------------------------------------------------------
// Catalog build
// -------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildSummary {
    pub asteroids: usize,
    pub resonances: usize,
    pub skipped_rows: usize,
    pub skipped_asteroids: usize,
    pub newly_broken: usize,
}

impl fmt::Display for BuildSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} asteroids, {} resonances, {} rows skipped, {} asteroids skipped ({} newly broken)",
            self.asteroids, self.resonances, self.skipped_rows, self.skipped_asteroids, self.newly_broken
        )
    }
}

/// Semi-major axis of the first element row of `asteroid`.
fn initial_axis(dir: &Utf8Path, asteroid: AsteroidNumber) -> Result<Au, ResonanceError> {
    let body = BodyName::Asteroid(asteroid);
    match open_rows(dir, &body)?.next() {
        Some(row) => Ok(row?.semi_major_axis),
        None => Err(ResonanceError::EmptyElementFile(body.to_string())),
    }
}

/// Create the catalog rows of every asteroid of `asteroids`.
///
/// Arguments
/// -----------------
/// * `catalog` – Store receiving the rows.
/// * `config` – Planets, aei directory, axis swing and conflict policy.
/// * `table` – Candidate resonances.
/// * `asteroids` – Inclusive range of asteroid numbers.
///
/// Return
/// ----------
/// * Counters of the run. Per-row and per-asteroid problems are logged and counted,
///   only catalog failures are returned as errors.
pub fn build_catalog(
    catalog: &Catalog,
    config: &ResonanceConfig,
    table: &ResonanceTable,
    asteroids: RangeInclusive<AsteroidNumber>,
) -> Result<BuildSummary, ResonanceError> {
    let builder = ResonanceCatalogBuilder::new(catalog, config)?;
    let big_bodies = builder.kind().big_bodies();
    let mut summary = BuildSummary::default();
    let mut progress = BatchProgress::new(range_len(&asteroids));

    for asteroid in asteroids {
        progress.step(asteroid);
        summary.asteroids += 1;

        if catalog.is_broken(asteroid)? {
            summary.skipped_asteroids += 1;
            continue;
        }

        let axis = match initial_axis(&config.aei_dir, asteroid) {
            Ok(axis) => axis,
            Err(e) => {
                summary.skipped_asteroids += 1;
                if handle_asteroid_error(catalog, asteroid, None, &e)? {
                    summary.newly_broken += 1;
                }
                continue;
            }
        };

        let (rows, errors) = table.matching(axis, config.axis_swing);
        for (line, error) in errors {
            tracing::warn!(asteroid, row = line, error = %error, "coefficient row skipped");
            summary.skipped_rows += 1;
        }

        for (line, row) in rows {
            if row.coefficients.big.len() != big_bodies {
                continue;
            }
            match builder.build(&row, asteroid) {
                Ok(_) => summary.resonances += 1,
                Err(e @ (ResonanceError::DAlembertViolation(_) | ResonanceError::CoefficientParse { .. })) => {
                    tracing::warn!(asteroid, row = line, error = %e, "coefficient row skipped");
                    summary.skipped_rows += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    let avg = progress.finish();
    tracing::info!(summary = %summary, avg_step = %fmt_dur(avg), "catalog built");
    Ok(summary)
}

// -------------------------------------------------------------------------------------------------
// Classification
// -------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifySummary {
    pub asteroids: usize,
    pub skipped_broken: usize,
    pub newly_broken: usize,
    pub pure: usize,
    pub transient: usize,
    pub apocentric_pure: usize,
    pub discarded: usize,
    pub from_catalog: usize,
    pub failed: usize,
}

impl ClassifySummary {
    fn record(&mut self, classification: &Classification) {
        match classification.outcome {
            LibrationOutcome::Pure { .. } => self.pure += 1,
            LibrationOutcome::Transient { .. } => self.transient += 1,
            LibrationOutcome::ApocentricPure { .. } => self.apocentric_pure += 1,
            LibrationOutcome::Discarded => self.discarded += 1,
        }
        if classification.from_catalog {
            self.from_catalog += 1;
        }
    }

    /// Number of classified resonances, discarded ones included.
    pub fn classified(&self) -> usize {
        self.pure + self.transient + self.apocentric_pure + self.discarded
    }
}

impl fmt::Display for ClassifySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            writeln!(f, "Classification summary")?;
            writeln!(f, "----------------------")?;
            writeln!(f, "  asteroids        : {}", self.asteroids)?;
            writeln!(f, "  skipped (broken) : {}", self.skipped_broken)?;
            writeln!(f, "  newly broken     : {}", self.newly_broken)?;
            writeln!(f, "  pure             : {}", self.pure)?;
            writeln!(f, "  transient        : {}", self.transient)?;
            writeln!(f, "  apocentric pure  : {}", self.apocentric_pure)?;
            writeln!(f, "  discarded        : {}", self.discarded)?;
            writeln!(f, "  from catalog     : {}", self.from_catalog)?;
            write!(f, "  failed           : {}", self.failed)
        } else {
            write!(
                f,
                "{} asteroids: {} pure, {} transient, {} apocentric, {} discarded ({} reused, {} failed, {} broken)",
                self.asteroids,
                self.pure,
                self.transient,
                self.apocentric_pure,
                self.discarded,
                self.from_catalog,
                self.failed,
                self.skipped_broken + self.newly_broken
            )
        }
    }
}

#[derive(Debug)]
pub struct ClassifyReport {
    pub results: ClassificationResult,
    pub summary: ClassifySummary,
}

struct RangeClassifier<'a> {
    catalog: &'a Catalog,
    classifier: LibrationClassifier<'a>,
    kind: ResonanceKind,
    aei_dir: &'a Utf8Path,
    planets: Vec<OrbitalElementSeries>,
}

impl RangeClassifier<'_> {
    fn planets_of(
        &self,
        resonance: &StoredResonance,
    ) -> Result<Vec<&OrbitalElementSeries>, ResonanceError> {
        resonance
            .planets
            .iter()
            .map(|name| {
                self.planets
                    .iter()
                    .find(|s| s.name() == name.as_str())
                    .ok_or_else(|| {
                        ResonanceError::UnknownResonance(format!(
                            "{resonance}: planet {name} is not configured"
                        ))
                    })
            })
            .collect()
    }

    /// Classify all resonances of `asteroid`.
    ///
    /// Return
    /// ----------
    /// * `Err` only for unusable asteroid data; other resonance failures are logged and
    ///   counted in `summary`.
    fn asteroid(
        &self,
        asteroid: AsteroidNumber,
        summary: &mut ClassifySummary,
    ) -> Result<Vec<Classification>, (Option<StoredResonance>, ResonanceError)> {
        let resonances = self
            .catalog
            .resonances_for_asteroid(self.kind, asteroid)
            .map_err(|e| (None, e))?;

        let mut series: Option<OrbitalElementSeries> = None;
        let mut classifications = Vec::with_capacity(resonances.len());

        for resonance in resonances {
            match self.classifier.stored(&resonance) {
                Ok(Some(stored)) => {
                    summary.record(&stored);
                    classifications.push(stored);
                    continue;
                }
                Ok(None) => {}
                Err(e) => return Err((Some(resonance), e)),
            }

            let asteroid_series: &OrbitalElementSeries = match series {
                Some(ref s) => s,
                None => series.insert(
                    OrbitalElementSeries::load(self.aei_dir, &BodyName::Asteroid(asteroid))
                        .map_err(|e| (Some(resonance.clone()), e))?,
                ),
            };

            let result = self
                .planets_of(&resonance)
                .and_then(|planets| self.classifier.classify(&resonance, &planets, asteroid_series));

            match result {
                Ok(classification) => {
                    summary.record(&classification);
                    classifications.push(classification);
                }
                Err(e) if e.is_broken_data() => return Err((Some(resonance), e)),
                Err(e) => {
                    tracing::warn!(asteroid, resonance = %resonance, error = %e, "resonance skipped");
                    summary.failed += 1;
                }
            }
        }
        Ok(classifications)
    }
}

/// Classify the catalog resonances of every asteroid of `asteroids`.
///
/// Arguments
/// -----------------
/// * `catalog` – Store holding the resonances, receiving the librations.
/// * `config` – Planets, aei directory and libration thresholds.
/// * `mode` – Recompute everything, or reuse stored librations.
/// * `asteroids` – Inclusive range of asteroid numbers.
///
/// Return
/// ----------
/// * A [`ClassifyReport`] with one entry per asteroid having resonances.
/// * An error when a planet file cannot be read or the catalog fails.
pub fn classify_range(
    catalog: &Catalog,
    config: &ResonanceConfig,
    mode: ClassifyMode,
    asteroids: RangeInclusive<AsteroidNumber>,
) -> Result<ClassifyReport, ResonanceError> {
    let planets = config
        .planets
        .iter()
        .map(|name| OrbitalElementSeries::load(&config.aei_dir, &BodyName::Planet(name.clone())))
        .collect::<Result<Vec<_>, _>>()?;

    let driver = RangeClassifier {
        catalog,
        classifier: LibrationClassifier::new(catalog, config, mode),
        kind: ResonanceKind::from_big_bodies(config.planets.len())?,
        aei_dir: &config.aei_dir,
        planets,
    };

    let mut results: ClassificationResult = HashMap::default();
    let mut summary = ClassifySummary::default();
    let mut progress = BatchProgress::new(range_len(&asteroids));

    for asteroid in asteroids {
        progress.step(asteroid);
        summary.asteroids += 1;

        if catalog.is_broken(asteroid)? {
            summary.skipped_broken += 1;
            continue;
        }

        match driver.asteroid(asteroid, &mut summary) {
            Ok(classifications) if classifications.is_empty() => {}
            Ok(classifications) => {
                results.insert(asteroid, Ok(classifications));
            }
            Err((_, e @ ResonanceError::Sqlite(_))) => return Err(e),
            Err((resonance, e)) => {
                if handle_asteroid_error(catalog, asteroid, resonance.as_ref(), &e)? {
                    summary.newly_broken += 1;
                }
                results.insert(asteroid, Err(e));
            }
        }
    }

    let avg = progress.finish();
    tracing::info!(summary = %summary, avg_step = %fmt_dur(avg), "range classified");
    Ok(ClassifyReport { results, summary })
}
