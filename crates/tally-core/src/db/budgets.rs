//! Monthly category budgets

use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::Serialize;

use super::Database;
use crate::detect::month_key;
use crate::error::{Error, Result};

/// Budget for one category in one UTC month
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub user_id: String,
    pub category: String,
    /// `YYYY-MM`
    pub month: String,
    pub amount: f64,
}

impl Database {
    /// Set (or overwrite) the budget for a category in the month containing `month`
    pub fn set_budget(
        &self,
        user_id: &str,
        category: &str,
        month: DateTime<Utc>,
        amount: f64,
    ) -> Result<()> {
        let category = category.trim();
        if category.is_empty() {
            return Err(Error::InvalidData("Budget category is required".to_string()));
        }
        if !amount.is_finite() || amount < 0.0 {
            return Err(Error::InvalidData(format!(
                "Budget amount must be a non-negative number, got {}",
                amount
            )));
        }

        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO budgets (user_id, category, month, amount) VALUES (?, ?, ?, ?)
            ON CONFLICT (user_id, category, month)
            DO UPDATE SET amount = excluded.amount, updated_at = CURRENT_TIMESTAMP
            "#,
            params![user_id, category, month_key(month), amount],
        )?;
        Ok(())
    }

    /// A user's budgets for the month containing `month`, by category
    pub fn list_budgets(&self, user_id: &str, month: DateTime<Utc>) -> Result<Vec<Budget>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT user_id, category, month, amount FROM budgets WHERE user_id = ? AND month = ? ORDER BY category",
        )?;

        let budgets = stmt
            .query_map(params![user_id, month_key(month)], |row| {
                Ok(Budget {
                    user_id: row.get(0)?,
                    category: row.get(1)?,
                    month: row.get(2)?,
                    amount: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(budgets)
    }
}
