//! SQLite storage for accounts, transactions, budgets and alerts
//!
//! One file per table family:
//! - `accounts` - user-owned accounts
//! - `transactions` - transaction rows and the per-user detection snapshot
//! - `budgets` - monthly category budgets
//! - `alerts` - detection and budget alerts, replaced wholesale on sync

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;

use crate::error::{Error, Result};

mod accounts;
mod alerts;
mod budgets;
mod transactions;

#[cfg(test)]
mod tests;

pub use budgets::Budget;
pub use transactions::LoadResult;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Passphrase variable for encrypted databases
pub const DB_KEY_ENV: &str = "TALLY_DB_KEY";

const POOL_SIZE: u32 = 8;

/// Tally's Argon2 salt. Fixed so a database can be moved or renamed and still
/// open with the same passphrase.
const KEY_SALT: &[u8; 16] = b"tally-salt-v1-fx";

/// Turn a passphrase into a hex SQLCipher raw key
fn derive_key(passphrase: &str) -> Result<String> {
    use argon2::{password_hash::SaltString, Argon2, PasswordHasher};

    let salt = SaltString::encode_b64(KEY_SALT)
        .map_err(|e| Error::Encryption(format!("Bad key salt: {}", e)))?;
    let hashed = Argon2::default()
        .hash_password(passphrase.as_bytes(), &salt)
        .map_err(|e| Error::Encryption(format!("Key derivation failed: {}", e)))?;
    let output = hashed
        .hash
        .ok_or_else(|| Error::Encryption("Key derivation produced no output".to_string()))?;

    Ok(hex::encode(output.as_bytes()))
}

/// Statements run on every pooled connection before first use
///
/// `foreign_keys` and `synchronous` are per-connection settings in SQLite,
/// so they cannot live in the one-off migration batch.
fn connection_pragmas(raw_key: Option<&str>) -> String {
    let mut pragmas = String::new();
    if let Some(key) = raw_key {
        // The key must be the first statement on an encrypted connection
        pragmas.push_str(&format!("PRAGMA key = 'x\"{}\"';\n", key));
    }
    pragmas.push_str("PRAGMA foreign_keys = ON;\nPRAGMA synchronous = NORMAL;\n");
    pragmas
}

/// Parse SQLite's `CURRENT_TIMESTAMP` format
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Parse an RFC 3339 timestamp column
pub(crate) fn parse_timestamp(s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}

/// Surface a bad enum value in a text column as a conversion failure
pub(crate) fn invalid_text(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        column,
        rusqlite::types::Type::Text,
        message.into(),
    )
}

/// Pooled handle to a Tally database
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Open an encrypted database keyed from `TALLY_DB_KEY`
    ///
    /// Fails when the variable is unset; pass `--no-encrypt` (or call
    /// `new_unencrypted`) to opt out.
    pub fn new(path: &str) -> Result<Self> {
        let passphrase = std::env::var(DB_KEY_ENV).map_err(|_| {
            Error::Encryption(format!(
                "{} is not set. Export a passphrase, or use --no-encrypt for a plaintext database.",
                DB_KEY_ENV
            ))
        })?;
        Self::new_with_key(path, Some(&passphrase))
    }

    /// Open a plaintext database (development and tests)
    pub fn new_unencrypted(path: &str) -> Result<Self> {
        Self::new_with_key(path, None)
    }

    /// Open a database, encrypting it when a passphrase is given
    pub fn new_with_key(path: &str, passphrase: Option<&str>) -> Result<Self> {
        let raw_key = passphrase.map(derive_key).transpose()?;
        let pragmas = connection_pragmas(raw_key.as_deref());

        let manager = SqliteConnectionManager::file(path)
            .with_init(move |conn| conn.execute_batch(&pragmas));
        let pool = Pool::builder().max_size(POOL_SIZE).build(manager)?;

        let db = Self { pool };
        db.run_migrations()?;
        Ok(db)
    }

    /// Fresh plaintext database in the temp dir, for tests
    ///
    /// A file rather than `:memory:` so every pooled connection sees the
    /// same data.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static NEXT_ID: AtomicU64 = AtomicU64::new(0);

        let file = std::env::temp_dir().join(format!(
            "tally_test_{}_{}.db",
            std::process::id(),
            NEXT_ID.fetch_add(1, Ordering::SeqCst)
        ));
        let _ = std::fs::remove_file(&file);

        Self::new_unencrypted(&file.to_string_lossy())
    }

    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- Persistent once set; lets readers run during a sync
            PRAGMA journal_mode = WAL;

            CREATE TABLE IF NOT EXISTS accounts (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                archived BOOLEAN DEFAULT FALSE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_accounts_user ON accounts(user_id);

            CREATE TABLE IF NOT EXISTS transactions (
                id TEXT PRIMARY KEY,
                account_id TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
                merchant TEXT NOT NULL,
                amount REAL NOT NULL,
                date TEXT NOT NULL,                        -- RFC 3339, UTC
                type TEXT NOT NULL,                        -- INCOME, EXPENSE
                category TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_transactions_account ON transactions(account_id);
            CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);

            -- One amount per user, category and month
            CREATE TABLE IF NOT EXISTS budgets (
                user_id TEXT NOT NULL,
                category TEXT NOT NULL,
                month TEXT NOT NULL,                       -- YYYY-MM, UTC
                amount REAL NOT NULL CHECK (amount >= 0),
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (user_id, category, month)
            );

            CREATE TABLE IF NOT EXISTS alerts (
                id INTEGER PRIMARY KEY,
                user_id TEXT NOT NULL,
                account_id TEXT,
                transaction_id TEXT,
                type TEXT NOT NULL,                        -- ANOMALY, BUDGET
                severity TEXT NOT NULL,                    -- LOW, MEDIUM, HIGH
                title TEXT NOT NULL,
                message TEXT NOT NULL,
                metadata TEXT NOT NULL DEFAULT '{}',       -- JSON
                is_read BOOLEAN DEFAULT FALSE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_alerts_user_type ON alerts(user_id, type);
            "#,
        )?;

        Ok(())
    }
}
