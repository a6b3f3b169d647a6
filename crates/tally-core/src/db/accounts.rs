//! Account operations

use rusqlite::{params, Connection, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::Account;

fn row_to_account(row: &rusqlite::Row) -> rusqlite::Result<Account> {
    let created_at_str: String = row.get(4)?;
    Ok(Account {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        archived: row.get(3)?,
        created_at: parse_datetime(&created_at_str),
    })
}

/// Create the account unless it exists; refuse ids owned by another user
///
/// Takes a bare connection so it can run inside a caller's SQL transaction.
pub(crate) fn ensure_account(conn: &Connection, id: &str, user_id: &str, name: &str) -> Result<()> {
    let owner: Option<String> = conn
        .query_row(
            "SELECT user_id FROM accounts WHERE id = ?",
            params![id],
            |row| row.get(0),
        )
        .optional()?;

    match owner {
        Some(owner) if owner != user_id => Err(Error::InvalidData(format!(
            "Account {} belongs to another user",
            id
        ))),
        Some(_) => Ok(()),
        None => {
            conn.execute(
                "INSERT INTO accounts (id, user_id, name) VALUES (?, ?, ?)",
                params![id, user_id, name],
            )?;
            Ok(())
        }
    }
}

impl Database {
    /// Create an account for a user, or return the existing one
    pub fn upsert_account(&self, id: &str, user_id: &str, name: &str) -> Result<Account> {
        ensure_account(&*self.conn()?, id, user_id, name)?;
        self.get_account(id)?
            .ok_or_else(|| Error::NotFound(format!("Account {}", id)))
    }

    pub fn get_account(&self, id: &str) -> Result<Option<Account>> {
        let conn = self.conn()?;
        let account = conn
            .query_row(
                "SELECT id, user_id, name, archived, created_at FROM accounts WHERE id = ?",
                params![id],
                row_to_account,
            )
            .optional()?;
        Ok(account)
    }

    /// A user's accounts by name
    pub fn list_accounts(&self, user_id: &str) -> Result<Vec<Account>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, name, archived, created_at FROM accounts WHERE user_id = ? ORDER BY name",
        )?;

        let accounts = stmt
            .query_map(params![user_id], row_to_account)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(accounts)
    }

    /// Archive an account; its transactions stay in detection snapshots
    pub fn archive_account(&self, id: &str) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE accounts SET archived = TRUE WHERE id = ?",
            params![id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Account {}", id)));
        }
        Ok(())
    }

    /// Delete an account and, by cascade, its transactions
    pub fn delete_account(&self, id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM accounts WHERE id = ?", params![id])?;
        Ok(deleted > 0)
    }
}
