//! Command-line interface
//!
//! Clap definitions, per-command handlers, and human/JSON rendering.

pub mod commands;
pub mod display;
pub mod output;
pub mod types;

pub use output::progress::create_spinner;
pub use types::{Cli, Commands};

use console::style;

/// Print a command failure and exit with a non-zero status.
///
/// In JSON mode the error chain is emitted as a JSON object on stdout so
/// scripted callers always receive parseable output.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let chain: Vec<String> = err.chain().map(ToString::to_string).collect();
        let body = serde_json::json!({
            "success": false,
            "error": err.to_string(),
            "causes": chain.get(1..).unwrap_or_default(),
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("{} {err}", style("Error:").red().bold());
        for cause in err.chain().skip(1) {
            eprintln!("  {} {cause}", style("caused by:").dim());
        }
    }
    std::process::exit(1)
}
