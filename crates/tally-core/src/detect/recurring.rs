//! Recurring payment detection
//!
//! Groups expenses by merchant (trimmed, case-insensitive, exact match),
//! clusters each merchant's expenses by amount, and reports clusters that
//! span enough distinct UTC calendar months.
//!
//! Clustering is order-sensitive on purpose. Each merchant's expenses are
//! walked oldest first; a transaction joins the *first* cluster whose
//! running average is within tolerance, and that average is recomputed
//! after every join. A slowly drifting bill (78, 81, 83) therefore stays in
//! one cluster even though its first and last amounts differ by more than
//! the tolerance.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use super::{month_key, RecurringSample};
use crate::config::DetectionConfig;

/// A cluster of same-merchant expenses that recurs across months
#[derive(Debug, Clone)]
pub struct RecurringPattern<'a, T> {
    /// Merchant as spelled by the cluster's oldest transaction
    pub merchant: String,
    pub average_amount: f64,
    pub min_amount: f64,
    pub max_amount: f64,
    pub transaction_count: usize,
    pub distinct_month_count: usize,
    /// Relative tolerance the cluster was built with
    pub tolerance: f64,
    /// Members, oldest first
    pub transactions: Vec<&'a T>,
}

impl<'a, T: RecurringSample> RecurringPattern<'a, T> {
    /// Most recent member; ties keep the earliest-joined member
    pub fn latest_transaction(&self) -> Option<&'a T> {
        self.transactions
            .iter()
            .copied()
            .reduce(|latest, tx| if tx.date() > latest.date() { tx } else { latest })
    }

    pub fn transaction_ids(&self) -> Vec<&'a str> {
        self.transactions.iter().map(|tx| tx.id()).collect()
    }
}

/// An open cluster during the walk
struct Cluster<'a, T> {
    merchant: &'a str,
    members: Vec<&'a T>,
    total: f64,
    average: f64,
}

impl<'a, T: RecurringSample> Cluster<'a, T> {
    fn seed(tx: &'a T) -> Self {
        Self {
            merchant: tx.merchant(),
            members: vec![tx],
            total: tx.amount(),
            average: tx.amount(),
        }
    }

    fn push(&mut self, tx: &'a T) {
        self.members.push(tx);
        self.total += tx.amount();
        self.average = self.total / self.members.len() as f64;
    }

    fn into_pattern(self, tolerance: f64) -> RecurringPattern<'a, T> {
        let amounts = self.members.iter().map(|tx| tx.amount());
        let min_amount = amounts.clone().fold(f64::INFINITY, f64::min);
        let max_amount = amounts.fold(f64::NEG_INFINITY, f64::max);
        let months: BTreeSet<String> = self.members.iter().map(|tx| month_key(tx.date())).collect();

        RecurringPattern {
            merchant: self.merchant.to_string(),
            average_amount: self.average,
            min_amount,
            max_amount,
            transaction_count: self.members.len(),
            distinct_month_count: months.len(),
            tolerance,
            transactions: self.members,
        }
    }
}

/// Grouping key: trimmed, lower-cased merchant
pub fn normalize_merchant(merchant: &str) -> String {
    merchant.trim().to_lowercase()
}

/// Relative-difference check against a cluster average
///
/// A zero average only matches a zero amount.
fn is_within_tolerance(average: f64, amount: f64, tolerance: f64) -> bool {
    if average == 0.0 {
        return amount == 0.0;
    }

    (amount - average).abs() / average.abs() <= tolerance
}

/// Find recurring payment patterns among unsigned-amount expenses
///
/// Patterns come out grouped by merchant in order of each merchant's first
/// appearance in `transactions`, and by cluster creation order within a
/// merchant.
pub fn detect_recurring_transactions<'a, T: RecurringSample>(
    transactions: &'a [T],
    config: &DetectionConfig,
) -> Vec<RecurringPattern<'a, T>> {
    let tolerance = config.recurring_amount_tolerance;

    let mut merchant_order: Vec<String> = Vec::new();
    let mut by_merchant: HashMap<String, Vec<&'a T>> = HashMap::new();
    for tx in transactions {
        let key = normalize_merchant(tx.merchant());
        by_merchant
            .entry(key)
            .or_insert_with_key(|k| {
                merchant_order.push(k.clone());
                Vec::new()
            })
            .push(tx);
    }

    let mut recurring = Vec::new();

    for key in merchant_order {
        let Some(mut group) = by_merchant.remove(&key) else {
            continue;
        };
        // Stable: same-instant transactions keep input order
        group.sort_by_key(|tx| tx.date());

        let mut clusters: Vec<Cluster<'a, T>> = Vec::new();
        for tx in group {
            match clusters
                .iter_mut()
                .find(|c| is_within_tolerance(c.average, tx.amount(), tolerance))
            {
                Some(cluster) => cluster.push(tx),
                None => clusters.push(Cluster::seed(tx)),
            }
        }

        for cluster in clusters {
            let pattern = cluster.into_pattern(tolerance);
            if pattern.distinct_month_count >= config.recurring_min_distinct_months {
                recurring.push(pattern);
            } else {
                debug!(
                    "Dropping {} cluster at {:.2}: {} distinct months",
                    pattern.merchant, pattern.average_amount, pattern.distinct_month_count
                );
            }
        }
    }

    recurring
}
