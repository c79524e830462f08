#![allow(dead_code)]

use std::fmt::Write as _;

use approx::assert_relative_eq;
use camino::{Utf8Path, Utf8PathBuf};
use resonances::{config::ResonanceConfig, libration::Libration};
use tempfile::TempDir;

/// Rows of every synthetic element file.
pub const ROWS: usize = 1001;
/// Years between two rows, so that the last row lands on 100 000 years.
pub const STEP: f64 = 100.0;
/// Semi-major axis shared by the synthetic asteroids.
pub const AXIS: f64 = 5.2;

const HEADER: &str = "\
    Mercury (v6) output file\n\
    \n\
    Initial epoch 0\n\
    Time (years)  long  M  a  e  i  peri  node  mass\n";

/// aei text from `(time, ϖ, M, a)` rows, angles in degrees.
pub fn aei_text(rows: impl IntoIterator<Item = (f64, f64, f64, f64)>) -> String {
    let mut text = HEADER.to_string();
    for (time, perihelion, mean_anomaly, axis) in rows {
        writeln!(
            text,
            "{time:>14.4} {perihelion:>10.5} {mean_anomaly:>10.5} {axis:>9.5} 0.04810 1.30400 0.00000 100.46400 0.0"
        )
        .unwrap();
    }
    text
}

/// Element file of a body at rest on the reference direction.
pub fn still_body(rows: usize) -> String {
    aei_text((0..rows).map(|i| (i as f64 * STEP, 0.0, 0.0, AXIS)))
}

/// Element file of an asteroid whose phase against a still planet, with coefficients
/// `1 -1 0 0`, is `phase_deg(row)`.
pub fn asteroid_with_phase(rows: usize, phase_deg: impl Fn(usize) -> f64) -> String {
    aei_text((0..rows).map(|i| (i as f64 * STEP, 0.0, -phase_deg(i), AXIS)))
}

/// Phase advancing by 72° per row, crossing ±180° every five rows.
pub fn circulating(row: usize) -> f64 {
    72.0 * row as f64
}

/// Phase oscillating with a 30° amplitude around 0.
pub fn librating(row: usize) -> f64 {
    30.0 * (row as f64 * 0.3).sin()
}

/// Circulation for 15 000 years, libration for 30 000 years, circulation again.
pub fn transient(row: usize) -> f64 {
    if (150..450).contains(&row) {
        librating(row)
    } else {
        circulating(row)
    }
}

pub struct AeiDir {
    _dir: TempDir,
    pub path: Utf8PathBuf,
}

impl AeiDir {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        AeiDir { _dir: dir, path }
    }

    pub fn write(&self, stem: &str, text: &str) -> &Self {
        std::fs::write(self.path.join(format!("{stem}.aei")), text).unwrap();
        self
    }

    pub fn file(&self, name: &str) -> Utf8PathBuf {
        self.path.join(name)
    }
}

/// Two-body configuration over `dir` with a single `JUPITER` planet.
pub fn jupiter_config(dir: &Utf8Path) -> ResonanceConfig {
    ResonanceConfig::builder()
        .planets(["JUPITER"])
        .aei_dir(dir)
        .build()
        .unwrap()
}

pub fn assert_libration_close(actual: &Libration, expected: &Libration, epsilon: f64) {
    assert_eq!(actual.resonance_id, expected.resonance_id);
    assert_eq!(actual.is_apocentric, expected.is_apocentric);
    assert_eq!(
        actual.circulation_breaks.len(),
        expected.circulation_breaks.len()
    );
    for (a, e) in actual
        .circulation_breaks
        .iter()
        .zip(&expected.circulation_breaks)
    {
        assert_relative_eq!(*a, *e, epsilon = epsilon);
    }
    match (actual.average_delta, expected.average_delta) {
        (Some(a), Some(e)) => assert_relative_eq!(a, e, epsilon = epsilon),
        (a, e) => assert_eq!(a, e),
    }
    match (actual.percentage, expected.percentage) {
        (Some(a), Some(e)) => assert_relative_eq!(a, e, epsilon = epsilon),
        (a, e) => assert_eq!(a, e),
    }
}
