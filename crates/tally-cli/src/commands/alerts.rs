//! Alert command implementations (sync, alerts)

use anyhow::{anyhow, Result};
use tally_core::db::Database;
use tally_core::models::{DetectionKind, StoredAlert};
use tally_core::sync::SYNC_READBACK_LIMIT;
use tally_core::{sync_alerts_for_user, DetectionConfig};

use super::truncate;

fn print_stored(alert: &StoredAlert) {
    let marker = if alert.is_read { "  " } else { "● " };
    println!(
        "   {}#{} [{}] {}",
        marker,
        alert.id,
        alert.severity,
        truncate(&alert.message, 68)
    );
}

fn print_section(kind: DetectionKind, alerts: &[StoredAlert]) {
    println!();
    println!("{} ({})", kind.label(), alerts.len());
    println!("   ─────────────────────────────");
    if alerts.is_empty() {
        println!("   (none)");
    }
    for alert in alerts {
        print_stored(alert);
    }
}

pub fn cmd_sync(db: &Database, user_id: &str, config: &DetectionConfig, json: bool) -> Result<()> {
    let synced = sync_alerts_for_user(db, user_id, config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&synced)?);
        return Ok(());
    }

    println!("🔄 Synced alerts for {}", user_id);
    print_section(DetectionKind::Anomaly, &synced.anomaly_alerts);
    print_section(DetectionKind::Recurring, &synced.recurring_alerts);
    println!();

    Ok(())
}

pub fn cmd_alerts(db: &Database, user_id: &str, kind: Option<&str>) -> Result<()> {
    let kinds = match kind {
        Some(k) => vec![k.parse::<DetectionKind>().map_err(|e| anyhow!(e))?],
        None => vec![DetectionKind::Anomaly, DetectionKind::Recurring],
    };

    let unread = db.count_unread_alerts(user_id)?;
    println!("🔔 Alerts for {} ({} unread)", user_id, unread);

    for kind in kinds {
        let alerts = db.list_detection_alerts(user_id, kind, SYNC_READBACK_LIMIT)?;
        print_section(kind, &alerts);
    }
    println!();

    Ok(())
}
