//! Shared display helpers for human-readable command output.

pub mod colors;
pub mod table;

pub use colors::{colorize_risk, colorize_severity, colorize_status};
pub use table::{list_table, render_list, section};
