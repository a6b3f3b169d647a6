//! Alert sync
//!
//! Re-runs detection over a user's full transaction history and replaces the
//! persisted detection alerts with the result. Read state on previously
//! stored alerts does not survive a sync. Budget alerts are refreshed the
//! same way, one month at a time.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::budget::{
    budget_categories, build_budget_alerts, build_budget_progress_rows, expense_records,
    month_start_utc, next_month_start_utc, BudgetProgressRow, BudgetRecord,
};
use crate::config::DetectionConfig;
use crate::db::Database;
use crate::detect::{build_detection_alerts, month_key};
use crate::error::Result;
use crate::models::{DetectionKind, StoredAlert};

/// Maximum alerts of each kind returned after a sync
pub const SYNC_READBACK_LIMIT: usize = 50;

/// Persisted alerts after a sync, newest first per kind
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncedAlerts {
    pub anomaly_alerts: Vec<StoredAlert>,
    pub recurring_alerts: Vec<StoredAlert>,
}

/// Detect, replace, and read back a user's alerts
///
/// Database failures propagate. Detection itself cannot fail.
pub fn sync_alerts_for_user(
    db: &Database,
    user_id: &str,
    config: &DetectionConfig,
) -> Result<SyncedAlerts> {
    let transactions = db.list_transactions_for_user(user_id)?;
    let alerts = build_detection_alerts(&transactions, config);

    let replaced = db.replace_detection_alerts(user_id, &alerts)?;
    info!(
        user_id,
        transactions = transactions.len(),
        alerts = alerts.len(),
        replaced,
        "Synced detection alerts"
    );

    Ok(SyncedAlerts {
        anomaly_alerts: db.list_detection_alerts(
            user_id,
            DetectionKind::Anomaly,
            SYNC_READBACK_LIMIT,
        )?,
        recurring_alerts: db.list_detection_alerts(
            user_id,
            DetectionKind::Recurring,
            SYNC_READBACK_LIMIT,
        )?,
    })
}

/// Budget progress for one month and the alerts now stored for it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetReport {
    /// `YYYY-MM`
    pub month: String,
    pub rows: Vec<BudgetProgressRow>,
    pub alerts: Vec<StoredAlert>,
}

/// Compute budget progress for the month containing `month` and replace
/// that month's budget alerts
pub fn sync_budget_alerts_for_user(
    db: &Database,
    user_id: &str,
    month: DateTime<Utc>,
) -> Result<BudgetReport> {
    let start = month_start_utc(month);
    let key = month_key(start);

    let budgets: Vec<BudgetRecord> = db
        .list_budgets(user_id, start)?
        .into_iter()
        .map(|b| BudgetRecord {
            category_id: b.category,
            amount: b.amount,
        })
        .collect();
    let transactions = db.list_transactions_between(user_id, start, next_month_start_utc(start))?;
    let expenses = expense_records(&transactions);

    let categories = budget_categories(&budgets, &expenses);
    let rows = build_budget_progress_rows(&categories, &budgets, &expenses);
    let alerts = build_budget_alerts(start, &rows);

    let replaced = db.replace_budget_alerts(user_id, &key, &alerts)?;
    info!(
        user_id,
        month = %key,
        categories = rows.len(),
        over_budget = alerts.len(),
        replaced,
        "Synced budget alerts"
    );

    Ok(BudgetReport {
        alerts: db.list_budget_alerts(user_id, &key)?,
        month: key,
        rows,
    })
}
