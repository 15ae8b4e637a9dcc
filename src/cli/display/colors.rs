//! Severity, risk, and query-status color mapping for CLI output.
//!
//! `console` disables styling automatically when stdout is not a terminal
//! or `NO_COLOR` is set.

use console::{style, StyledObject};

use crate::domain::models::{RiskTier, Severity};

/// Critical = red bold, High = red, Medium = yellow, Low = dim.
pub fn colorize_severity(severity: Severity) -> StyledObject<&'static str> {
    let label = severity.as_str();
    match severity {
        Severity::Critical => style(label).red().bold(),
        Severity::High => style(label).red(),
        Severity::Medium => style(label).yellow(),
        Severity::Low => style(label).dim(),
    }
}

pub fn colorize_risk(risk: RiskTier) -> StyledObject<&'static str> {
    let label = risk.as_str();
    match risk {
        RiskTier::Critical => style(label).red().bold(),
        RiskTier::High => style(label).red(),
        RiskTier::Medium => style(label).yellow(),
        RiskTier::Low => style(label).dim(),
    }
}

/// Colors an executed-query status line by its `[ok]`/`[error]` prefix.
pub fn colorize_status(line: &str) -> StyledObject<&str> {
    if line.starts_with("[error]") {
        style(line).red()
    } else if line.starts_with("[ok]") {
        style(line).green()
    } else {
        style(line)
    }
}
