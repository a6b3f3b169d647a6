//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Tally - Spot unusual and recurring spending
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Personal finance anomaly and recurring payment detector", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "tally.db", global = true)]
    pub db: PathBuf,

    /// Detection config file (defaults to the user config dir, then built-ins)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set TALLY_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Load transactions from a JSON file
    Load {
        /// JSON array of transactions
        #[arg(short, long)]
        file: PathBuf,

        /// Owner of the accounts referenced by the file
        #[arg(short, long)]
        user: String,
    },

    /// Run detection over a JSON snapshot without touching the database
    Detect {
        /// JSON array of transactions
        #[arg(short, long)]
        file: PathBuf,

        /// Print alerts as JSON
        #[arg(long)]
        json: bool,
    },

    /// Re-run detection for a user and replace their stored alerts
    Sync {
        #[arg(short, long)]
        user: String,

        /// Print alerts as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show stored detection alerts
    Alerts {
        #[arg(short, long)]
        user: String,

        /// Only one kind: anomaly, recurring
        #[arg(short, long)]
        kind: Option<String>,
    },

    /// Set monthly category budgets and check progress against them
    Budget {
        #[command(subcommand)]
        action: BudgetAction,
    },

    /// Show income, expenses and spending trends
    Dashboard {
        #[arg(short, long)]
        user: String,

        /// Reference time (RFC 3339), defaults to now
        #[arg(long)]
        now: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum BudgetAction {
    /// Set the budget for a category
    Set {
        #[arg(short, long)]
        user: String,

        #[arg(short, long)]
        category: String,

        /// Monthly amount in dollars
        #[arg(short, long)]
        amount: f64,

        /// Month as YYYY-MM, defaults to the current month
        #[arg(short, long)]
        month: Option<String>,
    },

    /// Show spending against budgets and refresh budget alerts
    Show {
        #[arg(short, long)]
        user: String,

        /// Month as YYYY-MM, defaults to the current month
        #[arg(short, long)]
        month: Option<String>,

        /// Reference time (RFC 3339) used when no month is given
        #[arg(long)]
        now: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}
