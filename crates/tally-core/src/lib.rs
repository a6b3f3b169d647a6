//! Tally Core Library
//!
//! Shared functionality for the Tally personal finance tool:
//! - Detection engine (IQR anomalies, recurring payments, alert synthesis)
//! - Database access and migrations
//! - Alert sync (replace-on-sync persistence of detection and budget alerts)
//! - Monthly budget progress
//! - Dashboard analytics
//! - Detection configuration

pub mod analytics;
pub mod budget;
pub mod config;
pub mod db;
pub mod detect;
pub mod error;
pub mod models;
pub mod money;
pub mod sync;

pub use analytics::{build_dashboard_analytics, DashboardAnalytics};
pub use budget::{build_budget_progress_rows, parse_month_key_or_now, BudgetProgressRow};
pub use config::DetectionConfig;
pub use db::{Budget, Database, LoadResult};
pub use detect::{
    build_detection_alerts, detect_iqr_anomalies, detect_recurring_transactions, quantile,
};
pub use error::{Error, Result};
pub use models::*;
pub use money::format_usd;
pub use sync::{sync_alerts_for_user, sync_budget_alerts_for_user, BudgetReport, SyncedAlerts};
