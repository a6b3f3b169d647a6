//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `cmd_init` - Initialize the database
//! - `cmd_load` - Load transactions from JSON
//! - `cmd_detect` - Run detection over a JSON snapshot

use std::path::Path;

use anyhow::{Context, Result};
use tally_core::models::{DetectionAlert, DetectionKind, Transaction};
use tally_core::{build_detection_alerts, db::Database, DetectionConfig, LoadResult};
use tracing::warn;

use super::truncate;

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path is not valid UTF-8")?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

/// Read a JSON array of transactions
pub fn read_transactions(file: &Path) -> Result<Vec<Transaction>> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse transactions in {}", file.display()))
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    open_db(db_path, no_encrypt)?;

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   🔒 Encryption: ENABLED");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Load transactions: tally load --file transactions.json --user <id>");
    println!("  2. Detect and store alerts: tally sync --user <id>");

    Ok(())
}

/// Load transactions for a user, creating their accounts as needed
///
/// The whole file is loaded in one database transaction; a failing row
/// leaves nothing behind.
pub fn cmd_load(db: &Database, file: &Path, user_id: &str) -> Result<LoadResult> {
    let transactions = read_transactions(file)?;
    println!(
        "📥 Loading {} transactions from {}...",
        transactions.len(),
        file.display()
    );

    let result = db
        .load_transactions(user_id, &transactions)
        .with_context(|| format!("Failed to load {}", file.display()))?;

    if result.skipped > 0 {
        warn!(skipped = result.skipped, "Some transactions were already loaded");
    }

    println!("   Accounts: {}", result.accounts);
    println!("   Imported: {}", result.imported);
    println!("   Skipped (duplicates): {}", result.skipped);
    println!("✅ Load complete. Run 'tally sync --user {}' to refresh alerts.", user_id);

    Ok(result)
}

/// Print one synthesized alert
pub fn print_alert(alert: &DetectionAlert) {
    let icon = match alert.kind {
        DetectionKind::Anomaly => "🚨",
        DetectionKind::Recurring => "🔁",
    };
    println!(
        "   {} [{}] {}",
        icon,
        alert.severity,
        truncate(&alert.message, 72)
    );
}

pub fn cmd_detect(file: &Path, config: &DetectionConfig, json: bool) -> Result<()> {
    let transactions = read_transactions(file)?;
    let alerts = build_detection_alerts(&transactions, config);

    if json {
        println!("{}", serde_json::to_string_pretty(&alerts)?);
        return Ok(());
    }

    println!("🔍 Running detection over {} transactions...", transactions.len());
    println!();

    if alerts.is_empty() {
        println!("✅ Nothing unusual or recurring found.");
        return Ok(());
    }

    for kind in [DetectionKind::Anomaly, DetectionKind::Recurring] {
        let of_kind: Vec<&DetectionAlert> = alerts.iter().filter(|a| a.kind == kind).collect();
        println!("{} ({})", kind.label(), of_kind.len());
        println!("   ─────────────────────────────");
        for alert in of_kind {
            print_alert(alert);
        }
        println!();
    }

    Ok(())
}
