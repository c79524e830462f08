//! # Libration classification
//!
//! Decide, from the resonant phase of one resonance, whether the asteroid librates in it.
//!
//! ## State machine
//! -----------------
//! With `breaks` the circulation breaks of the phase:
//!
//! 1. fewer than two breaks → [`LibrationOutcome::Pure`];
//! 2. otherwise, walking the breaks from `t = 0`, each gap `Δ_k = break_k − break_{k−1}`
//!    contributes to the mean gap `average_delta`, and the gaps longer than
//!    `libration_min_years` add up to the libration time, reported as a percentage of
//!    `integration_years`;
//! 3. a positive percentage → [`LibrationOutcome::Transient`];
//! 4. otherwise the phase is scanned again around the apocentric center: fewer than two
//!    breaks → [`LibrationOutcome::ApocentricPure`], else [`LibrationOutcome::Discarded`].
//!
//! [`classify_phases`] is the pure form of this machine. [`LibrationClassifier`] drives
//! it for catalog resonances and persists the non-discarded outcomes.
use crate::{
    catalog::{librations, Catalog, StoredResonance},
    circulation::CirculationFinder,
    config::ResonanceConfig,
    constants::{CatalogId, Years},
    libration::Libration,
    orbital_elements::OrbitalElementSeries,
    phase::{PhaseComputer, PhaseSample, PhaseSource},
    resonance_errors::ResonanceError,
};

/// Gap statistics of a break list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakStatistics {
    pub average_delta: Years,
    pub libration_time: Years,
    pub percentage: f64,
}

/// Gap statistics of `breaks`, the first gap measured from `t = 0`.
///
/// Arguments
/// -----------------
/// * `breaks` – Break times in ascending order.
/// * `libration_min_years` – Gaps strictly longer than this count as libration.
/// * `integration_years` – Denominator of the percentage.
///
/// Return
/// ----------
/// * The statistics, all zero for an empty list.
pub fn break_statistics(
    breaks: &[Years],
    libration_min_years: Years,
    integration_years: Years,
) -> BreakStatistics {
    let mut previous = 0.0;
    let mut total = 0.0;
    let mut libration_time = 0.0;

    for &current in breaks {
        let delta = current - previous;
        total += delta;
        if delta > libration_min_years {
            libration_time += delta;
        }
        previous = current;
    }

    let average_delta = if breaks.is_empty() {
        0.0
    } else {
        total / breaks.len() as f64
    };

    BreakStatistics {
        average_delta,
        libration_time,
        percentage: libration_time / integration_years * 100.0,
    }
}

/// Terminal state of one classification.
#[derive(Debug, Clone, PartialEq)]
pub enum LibrationOutcome {
    Pure {
        breaks: Vec<Years>,
    },
    Transient {
        breaks: Vec<Years>,
        average_delta: Years,
        percentage: f64,
    },
    ApocentricPure {
        breaks: Vec<Years>,
    },
    /// Not resonant: nothing is stored
    Discarded,
}

impl LibrationOutcome {
    /// Libration row to persist for `resonance_id`, `None` when discarded.
    pub fn to_libration(&self, resonance_id: CatalogId) -> Option<Libration> {
        let (breaks, stats, is_apocentric) = match self {
            LibrationOutcome::Pure { breaks } => (breaks, None, false),
            LibrationOutcome::Transient {
                breaks,
                average_delta,
                percentage,
            } => (breaks, Some((*average_delta, *percentage)), false),
            LibrationOutcome::ApocentricPure { breaks } => (breaks, None, true),
            LibrationOutcome::Discarded => return None,
        };

        Some(Libration {
            resonance_id,
            circulation_breaks: breaks.clone(),
            average_delta: stats.map(|s| s.0),
            percentage: stats.map(|s| s.1),
            is_apocentric,
        })
    }

    /// Outcome a stored libration stands for.
    ///
    /// Transient rows written without statistics get them recomputed from their breaks.
    pub fn from_libration(libration: &Libration, config: &ResonanceConfig) -> Self {
        let breaks = libration.circulation_breaks.clone();
        if libration.is_apocentric {
            return LibrationOutcome::ApocentricPure { breaks };
        }
        if libration.is_pure() {
            return LibrationOutcome::Pure { breaks };
        }

        let (average_delta, percentage) = match libration.average_delta.zip(libration.percentage) {
            Some(stats) => stats,
            None => {
                let stats = break_statistics(
                    &breaks,
                    config.libration_min_years,
                    config.integration_years,
                );
                (stats.average_delta, stats.percentage)
            }
        };
        LibrationOutcome::Transient {
            breaks,
            average_delta,
            percentage,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LibrationOutcome::Pure { .. } => "pure",
            LibrationOutcome::Transient { .. } => "transient",
            LibrationOutcome::ApocentricPure { .. } => "apocentric pure",
            LibrationOutcome::Discarded => "discarded",
        }
    }

    pub fn is_discarded(&self) -> bool {
        matches!(self, LibrationOutcome::Discarded)
    }
}

/// Classify a phase series.
///
/// Return
/// ----------
/// * The outcome, or [`ResonanceError::NoPhase`] for an empty series.
pub fn classify_phases(
    phases: &[PhaseSample],
    libration_min_years: Years,
    integration_years: Years,
) -> Result<LibrationOutcome, ResonanceError> {
    let breaks = CirculationFinder::find(phases.iter().copied(), false)?;
    if breaks.len() < 2 {
        return Ok(LibrationOutcome::Pure { breaks });
    }

    let stats = break_statistics(&breaks, libration_min_years, integration_years);
    if stats.percentage > 0.0 {
        return Ok(LibrationOutcome::Transient {
            breaks,
            average_delta: stats.average_delta,
            percentage: stats.percentage,
        });
    }

    let apocentric_breaks = CirculationFinder::find(phases.iter().copied(), true)?;
    if apocentric_breaks.len() < 2 {
        Ok(LibrationOutcome::ApocentricPure {
            breaks: apocentric_breaks,
        })
    } else {
        Ok(LibrationOutcome::Discarded)
    }
}

/// Whether stored librations are reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClassifyMode {
    /// Always recompute and overwrite the stored libration
    #[default]
    Build,
    /// Reuse a stored libration when there is one
    ReadFromCatalog,
}

/// Outcome of one resonance, and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub resonance_id: CatalogId,
    pub outcome: LibrationOutcome,
    pub from_catalog: bool,
}

/// Classifies catalog resonances and stores the results.
pub struct LibrationClassifier<'c> {
    catalog: &'c Catalog,
    config: &'c ResonanceConfig,
    mode: ClassifyMode,
}

impl<'c> LibrationClassifier<'c> {
    pub fn new(catalog: &'c Catalog, config: &'c ResonanceConfig, mode: ClassifyMode) -> Self {
        LibrationClassifier {
            catalog,
            config,
            mode,
        }
    }

    pub fn mode(&self) -> ClassifyMode {
        self.mode
    }

    /// Stored outcome of `resonance`, only in [`ClassifyMode::ReadFromCatalog`].
    pub fn stored(&self, resonance: &StoredResonance) -> Result<Option<Classification>, ResonanceError> {
        if self.mode != ClassifyMode::ReadFromCatalog {
            return Ok(None);
        }
        let stored = self.catalog.libration(resonance.kind, resonance.id)?;
        Ok(stored.map(|libration| Classification {
            resonance_id: resonance.id,
            outcome: LibrationOutcome::from_libration(&libration, self.config),
            from_catalog: true,
        }))
    }

    /// Classify `resonance` from the element series of its bodies.
    ///
    /// Arguments
    /// -----------------
    /// * `big_bodies` – Series of the planets, in the role order of the resonance.
    /// * `asteroid` – Series of the asteroid.
    ///
    /// Return
    /// ----------
    /// * The classification. A non-discarded outcome has been written to the catalog,
    ///   a discarded one left the catalog untouched.
    /// * The alignment errors of [`PhaseComputer`] and [`ResonanceError::NoPhase`] leave
    ///   the catalog untouched as well.
    pub fn classify(
        &self,
        resonance: &StoredResonance,
        big_bodies: &[&OrbitalElementSeries],
        asteroid: &OrbitalElementSeries,
    ) -> Result<Classification, ResonanceError> {
        if let Some(stored) = self.stored(resonance)? {
            tracing::debug!(
                resonance = %resonance,
                outcome = stored.outcome.label(),
                "libration read from catalog"
            );
            return Ok(stored);
        }

        let computer = PhaseComputer::new(big_bodies, &resonance.coefficients)?;
        let phases = computer.compute(asteroid)?;
        let outcome = classify_phases(
            &phases,
            self.config.libration_min_years,
            self.config.integration_years,
        )?;

        if let Some(libration) = outcome.to_libration(resonance.id) {
            self.catalog
                .transaction(|tx| librations::upsert_libration(tx, resonance.kind, &libration))?;
        }

        tracing::debug!(
            resonance = %resonance,
            outcome = outcome.label(),
            "libration classified"
        );
        Ok(Classification {
            resonance_id: resonance.id,
            outcome,
            from_catalog: false,
        })
    }
}
