//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Core commands (init, load, detect) and shared utilities (open_db)
//! - `alerts` - Alert sync and listing commands
//! - `budget` - Budget setting and progress commands
//! - `dashboard` - Dashboard analytics command

pub mod alerts;
pub mod budget;
pub mod core;
pub mod dashboard;

// Re-export command functions for main.rs
pub use alerts::*;
pub use budget::*;
pub use core::*;
pub use dashboard::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
