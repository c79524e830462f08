//! # Pipeline configuration
//!
//! This module defines [`ResonanceConfig`], the set of parameters shared by the catalog
//! builder, the libration classifier and the batch drivers, together with its fluent,
//! validating builder [`ResonanceConfigBuilder`].
//!
//! ## Parameters
//! -----------------
//! * `libration_min_years` – A gap between two circulation breaks longer than this is
//!   counted as libration time (transient libration).
//! * `integration_years` – Length of the integration, the denominator of the libration
//!   percentage.
//! * `planets` – Names of the big bodies in role order: one for two-body resonances,
//!   two for three-body ones.
//! * `aei_dir` – Directory holding the integrator aei files.
//! * `axis_swing` – Half width (AU) of the window used to match table rows against the
//!   semi-major axis of an asteroid.
//! * `conflict_policy` – How catalog rows are deduplicated, see [`ConflictPolicy`].
//! * `validate_dalembert` – Reject coefficient rows breaking the D'Alembert rule.
//!
//! ## Usage
//! -----------------
//! ```rust
//! use resonances::config::ResonanceConfig;
//!
//! let config = ResonanceConfig::builder()
//!     .planets(["JUPITER"])
//!     .libration_min_years(15_000.0)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.planets.len(), 1);
//!
//! let from_file = ResonanceConfig::from_toml_str(
//!     r#"
//!     planets = ["JUPITER", "SATURN"]
//!     integration_years = 200000.0
//!     conflict_policy = "check_then_insert"
//!     "#,
//! )
//! .unwrap();
//! assert_eq!(from_file.integration_years, 200_000.0);
//! ```
use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;

use crate::{
    constants::{Au, Years},
    resonance_errors::ResonanceError,
};

/// Deduplication strategy used when catalog rows are created.
///
/// * `Native` – one atomic `INSERT … ON CONFLICT DO NOTHING` per table. Safe with
///   several writers, within the guarantees of the store.
/// * `CheckThenInsert` – explicit existence query, then a plain insert. Only correct
///   with a single writer per asteroid range; kept for stores lacking conflict clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    #[default]
    Native,
    CheckThenInsert,
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictPolicy::Native => write!(f, "native"),
            ConflictPolicy::CheckThenInsert => write!(f, "check_then_insert"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResonanceConfig {
    pub libration_min_years: Years,
    pub integration_years: Years,
    pub planets: Vec<String>,
    pub aei_dir: Utf8PathBuf,
    pub axis_swing: Au,
    pub conflict_policy: ConflictPolicy,
    pub validate_dalembert: bool,
}

impl Default for ResonanceConfig {
    fn default() -> Self {
        ResonanceConfig {
            libration_min_years: 20_000.0,
            integration_years: 100_000.0,
            planets: vec!["JUPITER".into(), "SATURN".into()],
            aei_dir: Utf8PathBuf::from("aei"),
            axis_swing: 0.01,
            conflict_policy: ConflictPolicy::Native,
            validate_dalembert: true,
        }
    }
}

impl ResonanceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> ResonanceConfigBuilder {
        ResonanceConfigBuilder::new()
    }

    /// Parse and validate a TOML document. Missing keys take their default value.
    pub fn from_toml_str(text: &str) -> Result<Self, ResonanceError> {
        let config: ResonanceConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Utf8Path) -> Result<Self, ResonanceError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Number of big bodies, i.e. 1 for two-body and 2 for three-body resonances.
    pub fn big_body_count(&self) -> usize {
        self.planets.len()
    }

    fn validate(&self) -> Result<(), ResonanceError> {
        let invalid = |msg: &str| Err(ResonanceError::InvalidConfig(msg.into()));

        if !(self.libration_min_years > 0.0) {
            return invalid("libration_min_years must be > 0");
        }
        if !(self.integration_years > 0.0) {
            return invalid("integration_years must be > 0");
        }
        if self.libration_min_years >= self.integration_years {
            return invalid("libration_min_years must be < integration_years");
        }
        if !(1..=2).contains(&self.planets.len()) {
            return invalid("planets must name one or two bodies");
        }
        if self.planets.iter().any(|p| p.trim().is_empty()) {
            return invalid("planet names must not be empty");
        }
        if !(self.axis_swing >= 0.0) {
            return invalid("axis_swing must be >= 0");
        }
        Ok(())
    }
}

/// Builder for [`ResonanceConfig`], with validation.
#[derive(Debug, Clone)]
pub struct ResonanceConfigBuilder {
    config: ResonanceConfig,
}

impl Default for ResonanceConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResonanceConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ResonanceConfig::default(),
        }
    }

    pub fn libration_min_years(mut self, v: Years) -> Self {
        self.config.libration_min_years = v;
        self
    }
    pub fn integration_years(mut self, v: Years) -> Self {
        self.config.integration_years = v;
        self
    }
    pub fn planets<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.planets = names.into_iter().map(Into::into).collect();
        self
    }
    pub fn aei_dir(mut self, v: impl Into<Utf8PathBuf>) -> Self {
        self.config.aei_dir = v.into();
        self
    }
    pub fn axis_swing(mut self, v: Au) -> Self {
        self.config.axis_swing = v;
        self
    }
    pub fn conflict_policy(mut self, v: ConflictPolicy) -> Self {
        self.config.conflict_policy = v;
        self
    }
    pub fn validate_dalembert(mut self, v: bool) -> Self {
        self.config.validate_dalembert = v;
        self
    }

    /// Finalize the builder.
    ///
    /// Validation rules
    /// -----------------
    /// * `libration_min_years > 0`, `integration_years > 0`
    /// * `libration_min_years < integration_years`
    /// * one or two non-empty planet names
    /// * `axis_swing >= 0`
    pub fn build(self) -> Result<ResonanceConfig, ResonanceError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl fmt::Display for ResonanceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            const PARAM_COL: usize = 44;
            writeln!(f, "Resonance Pipeline Parameters")?;
            writeln!(f, "-----------------------------")?;

            macro_rules! line {
                ($fmt:expr, $val:expr, $comment:expr) => {{
                    let s = format!($fmt, $val);
                    let pad = if s.len() < PARAM_COL {
                        " ".repeat(PARAM_COL - s.len())
                    } else {
                        " ".to_string()
                    };
                    writeln!(f, "  {}{}# {}", s, pad, $comment)
                }};
            }

            line!(
                "libration_min_years = {:.1} y",
                self.libration_min_years,
                "Minimal gap counted as libration"
            )?;
            line!(
                "integration_years   = {:.1} y",
                self.integration_years,
                "Length of the integration"
            )?;
            line!(
                "planets             = {}",
                self.planets.join(", "),
                "Big bodies in role order"
            )?;
            line!("aei_dir             = {}", self.aei_dir, "Element files")?;
            line!(
                "axis_swing          = {:.4} AU",
                self.axis_swing,
                "Table axis matching window"
            )?;
            line!(
                "conflict_policy     = {}",
                self.conflict_policy,
                "Catalog deduplication"
            )?;
            line!(
                "validate_dalembert  = {}",
                self.validate_dalembert,
                "Reject unbalanced coefficients"
            )
        } else {
            write!(
                f,
                "ResonanceConfig(libration_min={:.1}y, years={:.1}, planets=[{}], aei_dir={}, swing={:.4}, policy={}, dalembert={})",
                self.libration_min_years,
                self.integration_years,
                self.planets.join(", "),
                self.aei_dir,
                self.axis_swing,
                self.conflict_policy,
                self.validate_dalembert
            )
        }
    }
}

#[cfg(test)]
mod config_test {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_default_is_valid() {
        let config = ResonanceConfig::builder().build().unwrap();
        assert_eq!(config, ResonanceConfig::default());
        assert_eq!(config.big_body_count(), 2);
    }

    #[rstest]
    #[case(ResonanceConfig::builder().libration_min_years(0.0))]
    #[case(ResonanceConfig::builder().integration_years(-1.0))]
    #[case(ResonanceConfig::builder().libration_min_years(200_000.0))]
    #[case(ResonanceConfig::builder().planets(Vec::<String>::new()))]
    #[case(ResonanceConfig::builder().planets(["JUPITER", "SATURN", "URANUS"]))]
    #[case(ResonanceConfig::builder().planets([" "]))]
    #[case(ResonanceConfig::builder().axis_swing(-0.1))]
    #[case(ResonanceConfig::builder().axis_swing(f64::NAN))]
    fn test_invalid_builder(#[case] builder: ResonanceConfigBuilder) {
        assert!(matches!(
            builder.build(),
            Err(ResonanceError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_from_toml_partial() {
        let config = ResonanceConfig::from_toml_str(
            r#"
            planets = ["JUPITER"]
            aei_dir = "/data/aei"
            validate_dalembert = false
            "#,
        )
        .unwrap();

        assert_eq!(config.planets, vec!["JUPITER".to_string()]);
        assert_eq!(config.aei_dir.as_str(), "/data/aei");
        assert!(!config.validate_dalembert);
        assert_eq!(config.libration_min_years, 20_000.0);
        assert_eq!(config.conflict_policy, ConflictPolicy::Native);
    }

    #[test]
    fn test_from_toml_rejects_invalid() {
        let result = ResonanceConfig::from_toml_str("integration_years = 10.0");
        assert!(matches!(result, Err(ResonanceError::InvalidConfig(_))));

        let result = ResonanceConfig::from_toml_str("unknown_key = 1");
        assert!(matches!(result, Err(ResonanceError::Toml(_))));
    }

    #[test]
    fn test_display() {
        let config = ResonanceConfig::default();
        let compact = format!("{config}");
        assert!(compact.starts_with("ResonanceConfig(libration_min=20000.0y"));
        let pretty = format!("{config:#}");
        assert!(pretty.contains("planets             = JUPITER, SATURN"));
    }
}
