//! Tally CLI - Personal finance anomaly and recurring payment detector
//!
//! Usage:
//!   tally init                            Initialize database
//!   tally load --file tx.json --user ID   Load transactions
//!   tally sync --user ID                  Detect and store alerts
//!   tally alerts --user ID                Show stored alerts
//!   tally budget show --user ID           Show budget progress

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tally_core::DetectionConfig;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config = DetectionConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Load { file, user } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_load(&db, &file, &user).map(|_| ())
        }
        Commands::Detect { file, json } => commands::cmd_detect(&file, &config, json),
        Commands::Sync { user, json } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_sync(&db, &user, &config, json)
        }
        Commands::Alerts { user, kind } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_alerts(&db, &user, kind.as_deref())
        }
        Commands::Budget { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                BudgetAction::Set {
                    user,
                    category,
                    amount,
                    month,
                } => commands::cmd_budget_set(&db, &user, &category, amount, month.as_deref()),
                BudgetAction::Show {
                    user,
                    month,
                    now,
                    json,
                } => commands::cmd_budget_show(&db, &user, month.as_deref(), now.as_deref(), json)
                    .map(|_| ()),
            }
        }
        Commands::Dashboard { user, now } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_dashboard(&db, &user, now.as_deref())
        }
    }
}
