//! Budget commands (set, show)

use anyhow::Result;
use chrono::{DateTime, Utc};
use tally_core::db::Database;
use tally_core::{format_usd, parse_month_key_or_now, sync_budget_alerts_for_user, BudgetReport};

use super::{parse_now, truncate};

/// Month named by `--month`, else the month of `--now`
///
/// A malformed month falls back the same way.
pub fn resolve_month(month: Option<&str>, now: Option<&str>) -> Result<DateTime<Utc>> {
    Ok(parse_month_key_or_now(month, parse_now(now)?))
}

pub fn cmd_budget_set(
    db: &Database,
    user_id: &str,
    category: &str,
    amount: f64,
    month: Option<&str>,
) -> Result<()> {
    let month = resolve_month(month, None)?;
    db.set_budget(user_id, category, month, amount)?;

    println!(
        "✅ Budget for {} in {} set to {}",
        category.trim(),
        month.format("%Y-%m"),
        format_usd(amount)
    );
    Ok(())
}

pub fn cmd_budget_show(
    db: &Database,
    user_id: &str,
    month: Option<&str>,
    now: Option<&str>,
    json: bool,
) -> Result<BudgetReport> {
    let month = resolve_month(month, now)?;
    let report = sync_budget_alerts_for_user(db, user_id, month)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(report);
    }

    println!();
    println!("💵 Budgets for {} ({})", user_id, report.month);
    println!("   ─────────────────────────────────────────────────────");
    if report.rows.is_empty() {
        println!("   (no budgets or spending this month)");
    }
    for row in &report.rows {
        let budget = row
            .budget_amount
            .map(format_usd)
            .unwrap_or_else(|| "-".to_string());
        let marker = if row.is_over_budget { "⚠️ " } else { "  " };
        println!(
            "   {}{:<18} {:>11} of {:>11}  {:>5.0}%",
            marker,
            truncate(&row.category_name, 18),
            format_usd(row.spent_amount),
            budget,
            row.progress_percent
        );
    }

    if !report.alerts.is_empty() {
        println!();
        println!("   {} categories over budget", report.alerts.len());
    }
    println!();

    Ok(report)
}
