//! Alert synthesis
//!
//! Runs both detectors over a user's transactions and turns their output
//! into [`DetectionAlert`] records ready for persistence.

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::debug;

use super::anomaly::{detect_iqr_anomalies, AnomalyResult};
use super::recurring::{detect_recurring_transactions, RecurringPattern};
use super::{AmountSample, RecurringSample};
use crate::config::DetectionConfig;
use crate::models::{DetectionAlert, DetectionKind, Severity, Transaction};
use crate::money::format_usd;

const ANOMALY_TITLE: &str = "Anomalous expense detected";
const RECURRING_TITLE: &str = "Recurring payment detected";

/// An expense with its amount normalised to an unsigned magnitude
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseSample<'a> {
    pub id: &'a str,
    pub account_id: &'a str,
    pub merchant: &'a str,
    pub amount: f64,
    pub date: DateTime<Utc>,
}

impl<'a> ExpenseSample<'a> {
    /// Borrow an expense transaction; `None` for income
    pub fn from_transaction(tx: &'a Transaction) -> Option<Self> {
        tx.is_expense().then(|| Self {
            id: &tx.id,
            account_id: &tx.account_id,
            merchant: &tx.merchant,
            amount: tx.amount.abs(),
            date: tx.date,
        })
    }
}

impl AmountSample for ExpenseSample<'_> {
    fn amount(&self) -> f64 {
        self.amount
    }
}

impl RecurringSample for ExpenseSample<'_> {
    fn id(&self) -> &str {
        self.id
    }

    fn merchant(&self) -> &str {
        self.merchant
    }

    fn date(&self) -> DateTime<Utc> {
        self.date
    }
}

/// Build every detection alert for a transaction snapshot
///
/// Income is ignored. Anomalies are judged against the pooled distribution
/// of all expenses, not per merchant or category. The output holds all
/// anomaly alerts first, then all recurring alerts.
pub fn build_detection_alerts(
    transactions: &[Transaction],
    config: &DetectionConfig,
) -> Vec<DetectionAlert> {
    let expenses: Vec<ExpenseSample<'_>> = transactions
        .iter()
        .filter_map(ExpenseSample::from_transaction)
        .collect();

    let anomaly_result = detect_iqr_anomalies(&expenses, config);
    let anomaly_alerts = anomaly_result
        .anomalies
        .iter()
        .map(|sample| anomaly_alert(sample, &anomaly_result, config));

    let patterns = detect_recurring_transactions(&expenses, config);
    let recurring_alerts = patterns.iter().map(recurring_alert);

    let alerts: Vec<DetectionAlert> = anomaly_alerts.chain(recurring_alerts).collect();

    debug!(
        "Synthesized {} alerts from {} expenses ({} anomalies, {} recurring)",
        alerts.len(),
        expenses.len(),
        anomaly_result.anomalies.len(),
        patterns.len()
    );

    alerts
}

/// HIGH only when the amount clears the escalated upper bound
///
/// Low-side outliers never escalate. A zero upper bound never escalates
/// either: the fence collapsed on a zero-amount history.
pub fn anomaly_severity(amount: f64, upper_bound: Option<f64>, config: &DetectionConfig) -> Severity {
    match upper_bound {
        Some(upper) if upper != 0.0 && amount > upper * config.high_severity_multiplier => {
            Severity::High
        }
        _ => Severity::Medium,
    }
}

fn anomaly_alert(
    sample: &ExpenseSample<'_>,
    result: &AnomalyResult<'_, ExpenseSample<'_>>,
    config: &DetectionConfig,
) -> DetectionAlert {
    DetectionAlert {
        kind: DetectionKind::Anomaly,
        account_id: Some(sample.account_id.to_string()),
        transaction_id: Some(sample.id.to_string()),
        severity: anomaly_severity(sample.amount, result.upper_bound(), config),
        title: ANOMALY_TITLE.to_string(),
        message: format!(
            "{} at {} is outside your normal spending range.",
            sample.merchant,
            format_usd(sample.amount)
        ),
        metadata: json!({
            "detectionKind": DetectionKind::Anomaly.as_str(),
            "method": result.method,
            "q1": result.q1(),
            "q3": result.q3(),
            "iqr": result.iqr(),
            "lowerBound": result.lower_bound(),
            "upperBound": result.upper_bound(),
            "sampleSize": result.sample_size,
        }),
    }
}

fn recurring_alert(pattern: &RecurringPattern<'_, ExpenseSample<'_>>) -> DetectionAlert {
    DetectionAlert {
        kind: DetectionKind::Recurring,
        account_id: None,
        transaction_id: pattern.latest_transaction().map(|tx| tx.id.to_string()),
        severity: Severity::Low,
        title: RECURRING_TITLE.to_string(),
        message: format!(
            "{} appears recurring ({} months, avg {}).",
            pattern.merchant,
            pattern.distinct_month_count,
            format_usd(pattern.average_amount)
        ),
        metadata: json!({
            "detectionKind": DetectionKind::Recurring.as_str(),
            "merchant": pattern.merchant,
            "averageAmount": pattern.average_amount,
            "minAmount": pattern.min_amount,
            "maxAmount": pattern.max_amount,
            "transactionCount": pattern.transaction_count,
            "distinctMonthCount": pattern.distinct_month_count,
            "tolerance": pattern.tolerance,
            "transactionIds": pattern.transaction_ids(),
        }),
    }
}
