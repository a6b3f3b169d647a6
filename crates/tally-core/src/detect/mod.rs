//! Detection engine
//!
//! Scans a user's expense history and produces two kinds of alerts:
//! - Anomalies: single expenses outside the IQR (Tukey) fence of the pooled
//!   expense distribution
//! - Recurring payments: same-merchant expenses of similar amount spanning
//!   several calendar months
//!
//! Everything in here is pure. Detectors borrow the caller's samples and
//! return references into them; nothing is mutated, nothing is persisted,
//! and no clock is read. Persistence lives in [`crate::sync`].

use chrono::{DateTime, Datelike, Utc};

pub mod anomaly;
pub mod quantile;
pub mod recurring;
pub mod synthesize;

pub use anomaly::{detect_iqr_anomalies, AnomalyResult, AnomalySkipReason};
pub use quantile::quantile;
pub use recurring::{detect_recurring_transactions, RecurringPattern};
pub use synthesize::{build_detection_alerts, ExpenseSample};

/// A sample the anomaly detector can classify
///
/// `amount` must already be an unsigned magnitude.
pub trait AmountSample {
    fn amount(&self) -> f64;
}

/// A sample the recurring detector can cluster
pub trait RecurringSample: AmountSample {
    fn id(&self) -> &str;
    fn merchant(&self) -> &str;
    fn date(&self) -> DateTime<Utc>;
}

/// UTC calendar month bucket, `YYYY-MM`
pub fn month_key(date: DateTime<Utc>) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    #[test]
    fn test_month_key_is_utc() {
        let date = Utc.with_ymd_and_hms(2025, 9, 3, 12, 0, 0).unwrap();
        assert_eq!(month_key(date), "2025-09");

        // 23:30 on Oct 31 at UTC-5 is already November in UTC
        let local = FixedOffset::west_opt(5 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 10, 31, 23, 30, 0)
            .unwrap();
        assert_eq!(month_key(local.with_timezone(&Utc)), "2025-11");
    }
}
