//! Detection configuration
//!
//! Thresholds for the anomaly and recurring detectors. Every threshold is a
//! named constant with an overridable field on [`DetectionConfig`].
//!
//! ## Configuration Resolution
//!
//! Config is loaded with a two-layer resolution:
//! 1. Explicit path (must exist), or the override in the data dir
//!    (~/.local/share/tally/config/detection.toml) when present
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Keys missing from an override file keep their default values.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/detection.toml");

/// Method identifier reported by the anomaly detector
pub const ANOMALY_METHOD: &str = "iqr";

/// Minimum expenses before anomaly detection runs
pub const ANOMALY_MIN_SAMPLE_SIZE: usize = 6;

/// Tukey fence multiplier
pub const IQR_MULTIPLIER: f64 = 1.5;

/// Anomalies above `upper_bound * HIGH_SEVERITY_MULTIPLIER` escalate to HIGH
pub const HIGH_SEVERITY_MULTIPLIER: f64 = 1.5;

/// Relative amount tolerance for joining a recurring cluster
pub const RECURRING_AMOUNT_TOLERANCE: f64 = 0.05;

/// Distinct UTC months a cluster must span to count as recurring
pub const RECURRING_MIN_DISTINCT_MONTHS: usize = 3;

/// Detection thresholds
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionConfig {
    /// Sample size below which anomaly detection is skipped
    pub anomaly_min_sample_size: usize,
    /// Multiplier `k` of the Tukey fence
    pub iqr_multiplier: f64,
    /// Severity escalation factor applied to the upper bound
    pub high_severity_multiplier: f64,
    /// Relative tolerance (0.05 = 5%) against the running cluster average
    pub recurring_amount_tolerance: f64,
    /// Minimum distinct `YYYY-MM` months for a recurring pattern
    pub recurring_min_distinct_months: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            anomaly_min_sample_size: ANOMALY_MIN_SAMPLE_SIZE,
            iqr_multiplier: IQR_MULTIPLIER,
            high_severity_multiplier: HIGH_SEVERITY_MULTIPLIER,
            recurring_amount_tolerance: RECURRING_AMOUNT_TOLERANCE,
            recurring_min_distinct_months: RECURRING_MIN_DISTINCT_MONTHS,
        }
    }
}

impl DetectionConfig {
    /// Load config from an explicit path, the default override location, or
    /// the embedded defaults, in that order
    ///
    /// An explicit path that does not exist is an error; a missing default
    /// override is not.
    pub fn load(override_path: Option<&Path>) -> Result<Self> {
        let path = match override_path {
            Some(path) if !path.exists() => {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )))
            }
            Some(path) => Some(path.to_path_buf()),
            None => default_config_path().filter(|p| p.exists()),
        };

        match path {
            Some(path) => {
                debug!("Loading detection config from {}", path.display());
                let content = fs::read_to_string(&path).map_err(|e| {
                    Error::Config(format!("Failed to read {}: {}", path.display(), e))
                })?;
                Self::from_toml(&content)
            }
            None => Self::from_toml(DEFAULT_CONFIG),
        }
    }

    /// Parse config from TOML content, filling gaps with defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

        let mut config = Self::default();

        if let Some(anomaly) = raw.anomaly {
            if let Some(v) = anomaly.min_sample_size {
                config.anomaly_min_sample_size = v;
            }
            if let Some(v) = anomaly.iqr_multiplier {
                config.iqr_multiplier = v;
            }
            if let Some(v) = anomaly.high_severity_multiplier {
                config.high_severity_multiplier = v;
            }
        }

        if let Some(recurring) = raw.recurring {
            if let Some(v) = recurring.amount_tolerance {
                config.recurring_amount_tolerance = v;
            }
            if let Some(v) = recurring.min_distinct_months {
                config.recurring_min_distinct_months = v;
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject thresholds that would make detection meaningless
    pub fn validate(&self) -> Result<()> {
        if self.anomaly_min_sample_size == 0 {
            return Err(Error::Config(
                "anomaly min_sample_size must be at least 1".to_string(),
            ));
        }
        if self.recurring_min_distinct_months == 0 {
            return Err(Error::Config(
                "recurring min_distinct_months must be at least 1".to_string(),
            ));
        }

        let non_negative = [
            ("anomaly iqr_multiplier", self.iqr_multiplier),
            (
                "anomaly high_severity_multiplier",
                self.high_severity_multiplier,
            ),
            ("recurring amount_tolerance", self.recurring_amount_tolerance),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::Config(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("tally").join("config").join("detection.toml"))
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawConfig {
    anomaly: Option<RawAnomaly>,
    recurring: Option<RawRecurring>,
}

#[derive(Debug, Deserialize)]
struct RawAnomaly {
    min_sample_size: Option<usize>,
    iqr_multiplier: Option<f64>,
    high_severity_multiplier: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawRecurring {
    amount_tolerance: Option<f64>,
    min_distinct_months: Option<usize>,
}
