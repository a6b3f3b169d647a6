//! Amount anomalies via the interquartile-range rule
//!
//! A sample is anomalous when its amount falls outside the Tukey fence
//! `[Q1 - k*IQR, Q3 + k*IQR]` of the whole sample. Small samples are skipped
//! outright: with sparse history every fence is noise.

use serde::Serialize;
use tracing::debug;

use super::quantile::quantile;
use super::AmountSample;
use crate::config::{DetectionConfig, ANOMALY_METHOD};

/// Why a detection run produced no bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalySkipReason {
    InsufficientSampleSize,
}

impl AnomalySkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InsufficientSampleSize => "insufficient_sample_size",
        }
    }
}

impl std::fmt::Display for AnomalySkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Quartiles and fence derived from a sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IqrStats {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

/// Outcome of an anomaly detection run
///
/// A skipped run is a valid result, not a failure: callers should simply
/// show no anomalies.
#[derive(Debug, Clone)]
pub struct AnomalyResult<'a, T> {
    pub method: &'static str,
    pub sample_size: usize,
    pub min_sample_size: usize,
    pub skipped: bool,
    pub reason: Option<AnomalySkipReason>,
    /// Present exactly when the run was not skipped
    pub stats: Option<IqrStats>,
    /// Anomalous samples, in input order
    pub anomalies: Vec<&'a T>,
}

impl<T> AnomalyResult<'_, T> {
    pub fn q1(&self) -> Option<f64> {
        self.stats.map(|s| s.q1)
    }

    pub fn q3(&self) -> Option<f64> {
        self.stats.map(|s| s.q3)
    }

    pub fn iqr(&self) -> Option<f64> {
        self.stats.map(|s| s.iqr)
    }

    pub fn lower_bound(&self) -> Option<f64> {
        self.stats.map(|s| s.lower_bound)
    }

    pub fn upper_bound(&self) -> Option<f64> {
        self.stats.map(|s| s.upper_bound)
    }
}

/// Classify samples against the IQR fence of the whole sample
pub fn detect_iqr_anomalies<'a, T: AmountSample>(
    samples: &'a [T],
    config: &DetectionConfig,
) -> AnomalyResult<'a, T> {
    let sample_size = samples.len();

    if sample_size < config.anomaly_min_sample_size {
        debug!(
            "Skipping anomaly detection: {} samples < minimum {}",
            sample_size, config.anomaly_min_sample_size
        );
        return AnomalyResult {
            method: ANOMALY_METHOD,
            sample_size,
            min_sample_size: config.anomaly_min_sample_size,
            skipped: true,
            reason: Some(AnomalySkipReason::InsufficientSampleSize),
            stats: None,
            anomalies: Vec::new(),
        };
    }

    let mut amounts: Vec<f64> = samples.iter().map(|s| s.amount()).collect();
    amounts.sort_by(f64::total_cmp);

    let q1 = quantile(&amounts, 0.25);
    let q3 = quantile(&amounts, 0.75);
    let iqr = q3 - q1;
    let lower_bound = q1 - config.iqr_multiplier * iqr;
    let upper_bound = q3 + config.iqr_multiplier * iqr;

    let anomalies: Vec<&T> = samples
        .iter()
        .filter(|s| s.amount() < lower_bound || s.amount() > upper_bound)
        .collect();

    debug!(
        "IQR fence [{:.2}, {:.2}] over {} samples flagged {} anomalies",
        lower_bound,
        upper_bound,
        sample_size,
        anomalies.len()
    );

    AnomalyResult {
        method: ANOMALY_METHOD,
        sample_size,
        min_sample_size: config.anomaly_min_sample_size,
        skipped: false,
        reason: None,
        stats: Some(IqrStats {
            q1,
            q3,
            iqr,
            lower_bound,
            upper_bound,
        }),
        anomalies,
    }
}
