//! Alert persistence
//!
//! Detection alerts are stored with type `ANOMALY`; the detector that produced
//! them is recorded in `metadata.detectionKind`. A sync replaces the user's
//! whole `ANOMALY` set in one SQLite transaction so readers never observe a
//! half-written set. Budget alerts use type `BUDGET` and are replaced per
//! month, keyed by `metadata.month`.

use rusqlite::params;
use tracing::debug;

use super::{invalid_text, parse_datetime, Database};
use crate::budget::BudgetAlert;
use crate::error::{Error, Result};
use crate::models::{AlertType, DetectionAlert, DetectionKind, Severity, StoredAlert};

const ALERT_COLUMNS: &str = "id, user_id, account_id, transaction_id, type, severity, title, message, metadata, is_read, created_at";

fn row_to_alert(row: &rusqlite::Row) -> rusqlite::Result<StoredAlert> {
    let type_str: String = row.get(4)?;
    let severity_str: String = row.get(5)?;
    let metadata_str: String = row.get(8)?;
    let created_at_str: String = row.get(10)?;

    let metadata = serde_json::from_str(&metadata_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(StoredAlert {
        id: row.get(0)?,
        user_id: row.get(1)?,
        account_id: row.get(2)?,
        transaction_id: row.get(3)?,
        alert_type: type_str
            .parse::<AlertType>()
            .map_err(|e| invalid_text(4, e))?,
        severity: severity_str
            .parse::<Severity>()
            .map_err(|e| invalid_text(5, e))?,
        title: row.get(6)?,
        message: row.get(7)?,
        metadata,
        is_read: row.get(9)?,
        created_at: parse_datetime(&created_at_str),
    })
}

impl Database {
    /// Replace a user's detection alerts with a freshly synthesized set
    ///
    /// Deletes every `ANOMALY` row for the user and inserts `alerts` in order,
    /// atomically. `BUDGET` rows are left alone. Returns how many rows were
    /// removed.
    pub fn replace_detection_alerts(
        &self,
        user_id: &str,
        alerts: &[DetectionAlert],
    ) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let deleted = tx.execute(
            "DELETE FROM alerts WHERE user_id = ? AND type = ?",
            params![user_id, AlertType::Anomaly.as_str()],
        )?;

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO alerts (user_id, account_id, transaction_id, type, severity, title, message, metadata)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )?;

            for alert in alerts {
                let metadata = serde_json::to_string(&alert.metadata)?;
                stmt.execute(params![
                    user_id,
                    alert.account_id,
                    alert.transaction_id,
                    AlertType::Anomaly.as_str(),
                    alert.severity.as_str(),
                    alert.title,
                    alert.message,
                    metadata,
                ])?;
            }
        }

        tx.commit()?;

        debug!(
            user_id,
            deleted,
            inserted = alerts.len(),
            "Replaced detection alerts"
        );

        Ok(deleted)
    }

    /// Stored detection alerts of one kind, newest first
    ///
    /// Rows created by the same sync share a timestamp and come back in
    /// insertion order.
    pub fn list_detection_alerts(
        &self,
        user_id: &str,
        kind: DetectionKind,
        limit: usize,
    ) -> Result<Vec<StoredAlert>> {
        let conn = self.conn()?;
        let sql = format!(
            r#"
            SELECT {ALERT_COLUMNS}
            FROM alerts
            WHERE user_id = ? AND type = ? AND json_extract(metadata, '$.detectionKind') = ?
            ORDER BY created_at DESC, id ASC
            LIMIT ?
            "#
        );
        let mut stmt = conn.prepare(&sql)?;

        let alerts = stmt
            .query_map(
                params![user_id, AlertType::Anomaly.as_str(), kind.as_str(), limit as i64],
                row_to_alert,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(alerts)
    }

    /// Every alert for a user regardless of type, newest first
    pub fn list_alerts(&self, user_id: &str) -> Result<Vec<StoredAlert>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {ALERT_COLUMNS} FROM alerts WHERE user_id = ? ORDER BY created_at DESC, id ASC"
        );
        let mut stmt = conn.prepare(&sql)?;

        let alerts = stmt
            .query_map(params![user_id], row_to_alert)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(alerts)
    }

    /// Replace a user's budget alerts for one month
    ///
    /// Budget alerts of other months and all `ANOMALY` rows are untouched.
    /// Returns how many rows were removed.
    pub fn replace_budget_alerts(
        &self,
        user_id: &str,
        month: &str,
        alerts: &[BudgetAlert],
    ) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let deleted = tx.execute(
            "DELETE FROM alerts WHERE user_id = ? AND type = ? AND json_extract(metadata, '$.month') = ?",
            params![user_id, AlertType::Budget.as_str(), month],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO alerts (user_id, type, severity, title, message, metadata) VALUES (?, ?, ?, ?, ?, ?)",
            )?;
            for alert in alerts {
                stmt.execute(params![
                    user_id,
                    AlertType::Budget.as_str(),
                    alert.severity.as_str(),
                    alert.title,
                    alert.message,
                    serde_json::to_string(&alert.metadata)?,
                ])?;
            }
        }

        tx.commit()?;

        debug!(user_id, month, deleted, inserted = alerts.len(), "Replaced budget alerts");
        Ok(deleted)
    }

    /// A user's budget alerts for one month
    pub fn list_budget_alerts(&self, user_id: &str, month: &str) -> Result<Vec<StoredAlert>> {
        let conn = self.conn()?;
        let sql = format!(
            r#"
            SELECT {ALERT_COLUMNS}
            FROM alerts
            WHERE user_id = ? AND type = ? AND json_extract(metadata, '$.month') = ?
            ORDER BY created_at DESC, id ASC
            "#
        );
        let mut stmt = conn.prepare(&sql)?;

        let alerts = stmt
            .query_map(
                params![user_id, AlertType::Budget.as_str(), month],
                row_to_alert,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(alerts)
    }

    /// Mark an alert as read
    pub fn mark_alert_read(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute("UPDATE alerts SET is_read = TRUE WHERE id = ?", params![id])?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Alert {}", id)));
        }
        Ok(())
    }

    /// Count unread alerts of any type for a user
    pub fn count_unread_alerts(&self, user_id: &str) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM alerts WHERE user_id = ? AND is_read = FALSE",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
