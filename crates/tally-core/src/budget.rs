//! Budget tracking
//!
//! Per-category spending against a monthly budget, and the alerts raised for
//! categories that overrun. Months are UTC calendar months; the reference
//! instant is always passed in.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::Serialize;
use serde_json::json;

use crate::detect::month_key;
use crate::models::{Severity, Transaction};
use crate::money::format_usd;

const BUDGET_TITLE: &str = "Budget exceeded";

#[derive(Debug, Clone, PartialEq)]
pub struct BudgetCategory {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BudgetRecord {
    pub category_id: String,
    pub amount: f64,
}

/// An expense attributed (or not) to a category
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseRecord {
    pub category_id: Option<String>,
    pub amount: f64,
}

/// Spending against budget for one category
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetProgressRow {
    pub category_id: String,
    pub category_name: String,
    /// `None` when no budget is set for the category
    pub budget_amount: Option<f64>,
    pub spent_amount: f64,
    pub remaining_amount: Option<f64>,
    pub progress_percent: f64,
    pub is_over_budget: bool,
}

/// A budget alert ready to persist
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetAlert {
    pub category_id: String,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    /// Carries `month` so a month's alerts can be replaced together
    pub metadata: serde_json::Value,
}

/// Midnight UTC on the first of `date`'s month
pub fn month_start_utc(date: DateTime<Utc>) -> DateTime<Utc> {
    first_of_month(date.year(), date.month()).unwrap_or(date)
}

/// Midnight UTC on the first of the month after `date`'s
pub fn next_month_start_utc(date: DateTime<Utc>) -> DateTime<Utc> {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    first_of_month(year, month).unwrap_or(date)
}

fn first_of_month(year: i32, month: u32) -> Option<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).single()
}

/// Parse a `YYYY-MM` key to its month start, or use `now`'s month
///
/// Anything that is not four digits, a dash, and a month 01-12 falls back
/// to the current month.
pub fn parse_month_key_or_now(month: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    month
        .and_then(parse_month_key)
        .unwrap_or_else(|| month_start_utc(now))
}

fn parse_month_key(key: &str) -> Option<DateTime<Utc>> {
    let (year, month) = key.split_once('-')?;
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if year.len() != 4 || month.len() != 2 || !all_digits(year) || !all_digits(month) {
        return None;
    }

    let month: u32 = month.parse().ok()?;
    if !(1..=12).contains(&month) {
        return None;
    }
    first_of_month(year.parse().ok()?, month)
}

/// One row per category, in `categories` order
///
/// Expenses without a category are ignored. A category without a budget
/// reports zero progress and is never over budget; a zero budget also
/// reports zero progress but is over budget once anything is spent.
pub fn build_budget_progress_rows(
    categories: &[BudgetCategory],
    budgets: &[BudgetRecord],
    expenses: &[ExpenseRecord],
) -> Vec<BudgetProgressRow> {
    let budget_by_category: HashMap<&str, f64> = budgets
        .iter()
        .map(|b| (b.category_id.as_str(), b.amount))
        .collect();

    let mut spent_by_category: HashMap<&str, f64> = HashMap::new();
    for expense in expenses {
        if let Some(category_id) = expense.category_id.as_deref() {
            *spent_by_category.entry(category_id).or_insert(0.0) += expense.amount;
        }
    }

    categories
        .iter()
        .map(|category| {
            let spent_amount = spent_by_category
                .get(category.id.as_str())
                .copied()
                .unwrap_or(0.0);

            match budget_by_category.get(category.id.as_str()).copied() {
                None => BudgetProgressRow {
                    category_id: category.id.clone(),
                    category_name: category.name.clone(),
                    budget_amount: None,
                    spent_amount,
                    remaining_amount: None,
                    progress_percent: 0.0,
                    is_over_budget: false,
                },
                Some(budget) => BudgetProgressRow {
                    category_id: category.id.clone(),
                    category_name: category.name.clone(),
                    budget_amount: Some(budget),
                    spent_amount,
                    remaining_amount: Some(budget - spent_amount),
                    progress_percent: if budget <= 0.0 {
                        0.0
                    } else {
                        spent_amount / budget * 100.0
                    },
                    is_over_budget: spent_amount > budget,
                },
            }
        })
        .collect()
}

/// Expense records for budget tracking; income is dropped, amounts unsigned
pub fn expense_records(transactions: &[Transaction]) -> Vec<ExpenseRecord> {
    transactions
        .iter()
        .filter(|tx| tx.is_expense())
        .map(|tx| ExpenseRecord {
            category_id: tx.category.clone(),
            amount: tx.amount.abs(),
        })
        .collect()
}

/// Categories to report: budgeted ones first, then any other category spent in
///
/// Transaction categories are free text, so a category's id is its name.
pub fn budget_categories(budgets: &[BudgetRecord], expenses: &[ExpenseRecord]) -> Vec<BudgetCategory> {
    let mut names: Vec<&str> = Vec::new();
    let budgeted = budgets.iter().map(|b| b.category_id.as_str());
    let spent = expenses.iter().filter_map(|e| e.category_id.as_deref());
    for name in budgeted.chain(spent) {
        if !names.contains(&name) {
            names.push(name);
        }
    }

    names
        .into_iter()
        .map(|name| BudgetCategory {
            id: name.to_string(),
            name: name.to_string(),
        })
        .collect()
}

/// One alert per over-budget row
pub fn build_budget_alerts(month: DateTime<Utc>, rows: &[BudgetProgressRow]) -> Vec<BudgetAlert> {
    let month = month_key(month);

    rows.iter()
        .filter(|row| row.is_over_budget)
        .filter_map(|row| {
            let budget = row.budget_amount?;
            Some(BudgetAlert {
                category_id: row.category_id.clone(),
                severity: Severity::Medium,
                title: BUDGET_TITLE.to_string(),
                message: format!(
                    "{} is over budget for {}: {} spent of {}.",
                    row.category_name,
                    month,
                    format_usd(row.spent_amount),
                    format_usd(budget)
                ),
                metadata: json!({
                    "month": month,
                    "categoryId": row.category_id,
                    "budgetAmount": budget,
                    "spentAmount": row.spent_amount,
                    "progressPercent": row.progress_percent,
                }),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionType;

    fn category(id: &str, name: &str) -> BudgetCategory {
        BudgetCategory {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    fn budget(category_id: &str, amount: f64) -> BudgetRecord {
        BudgetRecord {
            category_id: category_id.to_string(),
            amount,
        }
    }

    fn expense(category_id: Option<&str>, amount: f64) -> ExpenseRecord {
        ExpenseRecord {
            category_id: category_id.map(str::to_string),
            amount,
        }
    }

    fn row<'a>(rows: &'a [BudgetProgressRow], id: &str) -> &'a BudgetProgressRow {
        rows.iter().find(|r| r.category_id == id).unwrap()
    }

    #[test]
    fn test_parse_month_key_or_now() {
        let now = Utc.with_ymd_and_hms(2026, 6, 20, 12, 0, 0).unwrap();

        assert_eq!(
            parse_month_key_or_now(Some("2026-02"), now),
            Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap()
        );
        let june = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_month_key_or_now(None, now), june);
    }

    #[test]
    fn test_malformed_month_keys_fall_back_to_now() {
        let now = Utc.with_ymd_and_hms(2026, 6, 20, 12, 0, 0).unwrap();
        let june = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();

        for key in ["", "2026", "2026-13", "2026-00", "2026-2", "26-02", "2026-02-01", "abcd-ef", "+026-02"] {
            assert_eq!(parse_month_key_or_now(Some(key), now), june, "{key}");
        }
    }

    #[test]
    fn test_month_boundaries() {
        let mid = Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(
            month_start_utc(mid),
            Utc.with_ymd_and_hms(2025, 12, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            next_month_start_utc(mid),
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_progress_rows_and_over_budget_flags() {
        let rows = build_budget_progress_rows(
            &[category("food", "Food"), category("transport", "Transport")],
            &[budget("food", 300.0), budget("transport", 100.0)],
            &[
                expense(Some("food"), 120.0),
                expense(Some("food"), 230.0),
                expense(Some("transport"), 50.0),
            ],
        );

        let food = row(&rows, "food");
        assert_eq!(food.spent_amount, 350.0);
        assert!(food.is_over_budget);
        assert_eq!(food.remaining_amount, Some(-50.0));

        let transport = row(&rows, "transport");
        assert_eq!(transport.spent_amount, 50.0);
        assert!(!transport.is_over_budget);
        assert_eq!(transport.remaining_amount, Some(50.0));
        assert_eq!(transport.progress_percent, 50.0);
    }

    #[test]
    fn test_unbudgeted_and_zero_budget_categories() {
        let rows = build_budget_progress_rows(
            &[category("fun", "Fun"), category("gifts", "Gifts")],
            &[budget("gifts", 0.0)],
            &[
                expense(Some("fun"), 80.0),
                expense(Some("gifts"), 10.0),
                expense(None, 999.0),
            ],
        );

        let fun = row(&rows, "fun");
        assert_eq!(fun.budget_amount, None);
        assert_eq!(fun.remaining_amount, None);
        assert_eq!(fun.progress_percent, 0.0);
        assert!(!fun.is_over_budget);
        assert_eq!(fun.spent_amount, 80.0);

        let gifts = row(&rows, "gifts");
        assert_eq!(gifts.progress_percent, 0.0);
        assert!(gifts.is_over_budget);
    }

    #[test]
    fn test_rows_follow_category_order() {
        let rows = build_budget_progress_rows(
            &[category("b", "B"), category("a", "A")],
            &[],
            &[],
        );
        let ids: Vec<&str> = rows.iter().map(|r| r.category_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert!(rows.iter().all(|r| r.spent_amount == 0.0));
    }

    #[test]
    fn test_expense_records_and_categories() {
        let date = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();
        let tx = |id: &str, amount: f64, kind: TransactionType, category: Option<&str>| Transaction {
            id: id.to_string(),
            account_id: "a1".to_string(),
            merchant: "Shop".to_string(),
            amount,
            date,
            transaction_type: kind,
            category: category.map(str::to_string),
        };
        let transactions = vec![
            tx("1", -25.0, TransactionType::Expense, Some("Dining")),
            tx("2", 1000.0, TransactionType::Income, Some("Salary")),
            tx("3", 40.0, TransactionType::Expense, Some("Groceries")),
            tx("4", 5.0, TransactionType::Expense, None),
        ];

        let expenses = expense_records(&transactions);
        assert_eq!(expenses.len(), 3);
        assert_eq!(expenses[0].amount, 25.0);

        let categories = budget_categories(&[budget("Groceries", 200.0)], &expenses);
        let names: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Groceries", "Dining"]);
    }

    #[test]
    fn test_budget_alerts_only_for_overruns() {
        let rows = build_budget_progress_rows(
            &[category("Food", "Food"), category("Travel", "Travel")],
            &[budget("Food", 300.0), budget("Travel", 500.0)],
            &[expense(Some("Food"), 350.0), expense(Some("Travel"), 20.0)],
        );
        let month = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();

        let alerts = build_budget_alerts(month, &rows);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].category_id, "Food");
        assert_eq!(alerts[0].severity, Severity::Medium);
        assert_eq!(
            alerts[0].message,
            "Food is over budget for 2026-02: $350.00 spent of $300.00."
        );
        assert_eq!(alerts[0].metadata["month"], "2026-02");
    }
}
