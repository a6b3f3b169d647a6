//! Transaction storage

use std::collections::HashSet;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::debug;

use super::accounts::ensure_account;
use super::{invalid_text, parse_timestamp, Database};
use crate::error::{Error, Result};
use crate::models::{Transaction, TransactionType};

/// Outcome of a bulk load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadResult {
    /// Distinct accounts referenced by the batch
    pub accounts: usize,
    pub imported: usize,
    /// Already present by id
    pub skipped: usize,
}

const SELECT_TRANSACTION: &str =
    "SELECT t.id, t.account_id, t.merchant, t.amount, t.date, t.type, t.category FROM transactions t";

fn row_to_transaction(row: &rusqlite::Row) -> rusqlite::Result<Transaction> {
    let date_str: String = row.get(4)?;
    let type_str: String = row.get(5)?;

    Ok(Transaction {
        id: row.get(0)?,
        account_id: row.get(1)?,
        merchant: row.get(2)?,
        amount: row.get(3)?,
        date: parse_timestamp(&date_str)?,
        transaction_type: type_str
            .parse::<TransactionType>()
            .map_err(|e| invalid_text(5, e))?,
        category: row.get(6)?,
    })
}

fn format_date(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Insert one row on `conn`; `false` when the id already exists
fn insert_on(conn: &Connection, tx: &Transaction) -> Result<bool> {
    let archived: Option<bool> = conn
        .query_row(
            "SELECT archived FROM accounts WHERE id = ?",
            params![tx.account_id],
            |row| row.get(0),
        )
        .optional()?;
    match archived {
        None => return Err(Error::NotFound(format!("Account {}", tx.account_id))),
        Some(true) => {
            return Err(Error::InvalidData(format!(
                "Account {} is archived",
                tx.account_id
            )))
        }
        Some(false) => {}
    }

    let inserted = conn.execute(
        r#"
        INSERT OR IGNORE INTO transactions (id, account_id, merchant, amount, date, type, category)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
        params![
            tx.id,
            tx.account_id,
            tx.merchant,
            tx.amount,
            format_date(tx.date),
            tx.transaction_type.as_str(),
            tx.category,
        ],
    )?;

    Ok(inserted > 0)
}

impl Database {
    /// Insert a transaction into an existing, unarchived account
    ///
    /// Returns `false` when a transaction with the same id already exists.
    pub fn insert_transaction(&self, tx: &Transaction) -> Result<bool> {
        insert_on(&*self.conn()?, tx)
    }

    /// Load a batch for a user, creating referenced accounts on the way
    ///
    /// All or nothing: any failing row rolls back every account and
    /// transaction written by the batch.
    pub fn load_transactions(&self, user_id: &str, batch: &[Transaction]) -> Result<LoadResult> {
        let mut conn = self.conn()?;
        let sql_tx = conn.transaction()?;

        let mut accounts = HashSet::new();
        let mut result = LoadResult::default();

        for tx in batch {
            if accounts.insert(tx.account_id.as_str()) {
                ensure_account(&sql_tx, &tx.account_id, user_id, &tx.account_id)?;
            }
            if insert_on(&sql_tx, tx)? {
                result.imported += 1;
            } else {
                debug!(id = %tx.id, "Skipping duplicate transaction");
                result.skipped += 1;
            }
        }

        sql_tx.commit()?;

        result.accounts = accounts.len();
        Ok(result)
    }

    pub fn get_transaction(&self, id: &str) -> Result<Option<Transaction>> {
        let conn = self.conn()?;
        let tx = conn
            .query_row(
                &format!("{} WHERE t.id = ?", SELECT_TRANSACTION),
                params![id],
                row_to_transaction,
            )
            .optional()?;
        Ok(tx)
    }

    /// Every transaction across a user's accounts, oldest first
    ///
    /// Read in a single statement so detection sees a consistent snapshot.
    pub fn list_transactions_for_user(&self, user_id: &str) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} JOIN accounts a ON t.account_id = a.id WHERE a.user_id = ? ORDER BY t.date, t.id",
            SELECT_TRANSACTION
        ))?;

        let transactions = stmt
            .query_map(params![user_id], row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    /// A user's transactions dated in `[from, to)`, oldest first
    pub fn list_transactions_between(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"{} JOIN accounts a ON t.account_id = a.id
            WHERE a.user_id = ? AND t.date >= ? AND t.date < ?
            ORDER BY t.date, t.id"#,
            SELECT_TRANSACTION
        ))?;

        let transactions = stmt
            .query_map(
                params![user_id, format_date(from), format_date(to)],
                row_to_transaction,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    /// Delete a transaction; returns whether a row was removed
    pub fn delete_transaction(&self, id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM transactions WHERE id = ?", params![id])?;
        Ok(deleted > 0)
    }
}
