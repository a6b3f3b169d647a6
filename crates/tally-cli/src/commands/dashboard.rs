//! Dashboard command

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tally_core::db::Database;
use tally_core::{build_dashboard_analytics, format_usd};

/// Parse `--now`, defaulting to the current time
pub fn parse_now(now: Option<&str>) -> Result<DateTime<Utc>> {
    match now {
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .with_context(|| format!("Invalid --now timestamp: {}", s)),
        None => Ok(Utc::now()),
    }
}

pub fn cmd_dashboard(db: &Database, user_id: &str, now: Option<&str>) -> Result<()> {
    let now = parse_now(now)?;
    let transactions = db.list_transactions_for_user(user_id)?;
    let analytics = build_dashboard_analytics(&transactions, now);

    println!();
    println!("╭─────────────────────────────────────────╮");
    println!("│           💰 Tally Dashboard            │");
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!("  Income:          {}", format_usd(analytics.total_income));
    println!("  Expenses:        {}", format_usd(analytics.total_expense));
    println!();
    println!("  📈 Expense Trend");
    for point in &analytics.trend {
        println!("     {:<10} {:>12}", point.label, format_usd(point.expense_total));
    }

    println!();
    println!("  🗂️  This Month by Category");
    if analytics.category_breakdown.is_empty() {
        println!("     (no expenses yet)");
    }
    for item in &analytics.category_breakdown {
        println!("     {:<20} {:>12}", item.category, format_usd(item.amount));
    }
    println!();

    let unread = db.count_unread_alerts(user_id)?;
    if unread > 0 {
        println!("  ⚠️  {} unread alerts. Run 'tally alerts --user {}'.", unread, user_id);
    }

    Ok(())
}
