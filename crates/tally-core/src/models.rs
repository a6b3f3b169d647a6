//! Domain models for Tally

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A bank account owned by a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub user_id: String,
    pub name: String,
    /// Archived accounts keep their history but accept no new transactions
    pub archived: bool,
    pub created_at: DateTime<Utc>,
}

/// Direction of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "INCOME",
            Self::Expense => "EXPENSE",
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "INCOME" => Ok(Self::Income),
            "EXPENSE" => Ok(Self::Expense),
            _ => Err(format!("Unknown transaction type: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A financial transaction as stored and as fed to detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub account_id: String,
    pub merchant: String,
    /// Magnitude of the transaction. The sign is not meaningful; direction
    /// comes from `transaction_type`.
    pub amount: f64,
    pub date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Transaction {
    pub fn is_expense(&self) -> bool {
        self.transaction_type == TransactionType::Expense
    }
}

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            _ => Err(format!("Unknown severity: {}", s)),
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which detector produced an alert
///
/// Persisted in alert metadata under `detectionKind`; stored alerts are
/// read back per kind by filtering on that field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionKind {
    Anomaly,
    Recurring,
}

impl DetectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anomaly => "anomaly",
            Self::Recurring => "recurring",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Anomaly => "Anomalous Expense",
            Self::Recurring => "Recurring Payment",
        }
    }
}

impl std::str::FromStr for DetectionKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "anomaly" => Ok(Self::Anomaly),
            "recurring" => Ok(Self::Recurring),
            _ => Err(format!("Unknown detection kind: {}", s)),
        }
    }
}

impl std::fmt::Display for DetectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An alert synthesized by the detection engine (not yet persisted)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionAlert {
    pub kind: DetectionKind,
    /// Recurring alerts span accounts and carry none
    pub account_id: Option<String>,
    /// Offending transaction for anomalies, latest member for recurring
    pub transaction_id: Option<String>,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    /// Detection parameters for audit; always contains `detectionKind`
    pub metadata: serde_json::Value,
}

/// Type column of persisted alert rows
///
/// Every detection alert is stored as `Anomaly`, whichever detector produced
/// it. `Budget` rows belong to budget tracking and are never touched by sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    Anomaly,
    Budget,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anomaly => "ANOMALY",
            Self::Budget => "BUDGET",
        }
    }
}

impl std::str::FromStr for AlertType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ANOMALY" => Ok(Self::Anomaly),
            "BUDGET" => Ok(Self::Budget),
            _ => Err(format!("Unknown alert type: {}", s)),
        }
    }
}

/// A persisted alert row
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredAlert {
    pub id: i64,
    pub user_id: String,
    pub account_id: Option<String>,
    pub transaction_id: Option<String>,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub metadata: serde_json::Value,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl StoredAlert {
    /// Detection kind recorded in metadata, if any
    pub fn detection_kind(&self) -> Option<DetectionKind> {
        self.metadata
            .get("detectionKind")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok())
    }
}
