//! Dashboard analytics
//!
//! Income/expense totals, a six-month expense trend, and the current
//! month's spending by category. The reference instant is always passed in
//! so results are reproducible.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;

use crate::detect::month_key;
use crate::models::{Transaction, TransactionType};

/// Number of calendar months in the expense trend, including the current one
pub const TREND_MONTHS: u32 = 6;

/// Category used for expenses without one
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Expense total for one UTC calendar month
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub month_key: String,
    /// e.g. "Jan 2026"
    pub label: String,
    pub expense_total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryBreakdownItem {
    pub category: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardAnalytics {
    pub total_income: f64,
    pub total_expense: f64,
    /// Oldest month first, ending with the month of `now`
    pub trend: Vec<TrendPoint>,
    /// Current month only, largest first
    pub category_breakdown: Vec<CategoryBreakdownItem>,
}

/// First day of the month `back` months before `now`'s UTC month
fn month_start(now: DateTime<Utc>, back: u32) -> NaiveDate {
    let months = now.year() * 12 + now.month0() as i32 - back as i32;
    let year = months.div_euclid(12);
    let month0 = months.rem_euclid(12) as u32;
    NaiveDate::from_ymd_opt(year, month0 + 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Summarise transactions relative to `now`
pub fn build_dashboard_analytics(
    transactions: &[Transaction],
    now: DateTime<Utc>,
) -> DashboardAnalytics {
    let mut trend: Vec<TrendPoint> = (0..TREND_MONTHS)
        .rev()
        .map(|back| {
            let start = month_start(now, back);
            TrendPoint {
                month_key: format!("{:04}-{:02}", start.year(), start.month()),
                label: start.format("%b %Y").to_string(),
                expense_total: 0.0,
            }
        })
        .collect();

    let current_month = month_key(now);
    let mut total_income = 0.0;
    let mut total_expense = 0.0;
    let mut category_order: Vec<String> = Vec::new();
    let mut category_totals: HashMap<String, f64> = HashMap::new();

    for tx in transactions {
        let amount = tx.amount.abs();

        match tx.transaction_type {
            TransactionType::Income => total_income += amount,
            TransactionType::Expense => {
                total_expense += amount;

                let key = month_key(tx.date);
                if let Some(point) = trend.iter_mut().find(|p| p.month_key == key) {
                    point.expense_total += amount;
                }

                if key == current_month {
                    let category = tx.category.as_deref().unwrap_or(UNCATEGORIZED);
                    *category_totals
                        .entry(category.to_string())
                        .or_insert_with(|| {
                            category_order.push(category.to_string());
                            0.0
                        }) += amount;
                }
            }
        }
    }

    let mut category_breakdown: Vec<CategoryBreakdownItem> = category_order
        .into_iter()
        .map(|category| {
            let amount = category_totals.get(&category).copied().unwrap_or(0.0);
            CategoryBreakdownItem { category, amount }
        })
        .collect();
    // Stable sort keeps first-seen order among equal totals
    category_breakdown.sort_by(|a, b| b.amount.total_cmp(&a.amount));

    DashboardAnalytics {
        total_income,
        total_expense,
        trend,
        category_breakdown,
    }
}
