//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use super::commands::{CorrelateArgs, InvestigateArgs, PatternsArgs};

#[derive(Parser, Debug)]
#[command(name = "logsleuth")]
#[command(about = "Logsleuth - autonomous log investigation and change correlation", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .logsleuth/config.yaml and .logsleuth/local.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Investigate an incident window and report ranked findings
    Investigate(InvestigateArgs),

    /// Correlate an incident with the configuration, deployment, and IAM changes around it
    Correlate(CorrelateArgs),

    /// Inspect the change-classification patterns
    Patterns(PatternsArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::patterns::PatternsCommand;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "logsleuth",
            "investigate",
            "30m",
            "--service",
            "checkout",
            "--json",
            "--config",
            "custom.yaml",
        ])
        .unwrap();

        assert!(cli.json);
        assert_eq!(cli.config, Some(PathBuf::from("custom.yaml")));
        let Commands::Investigate(args) = cli.command else {
            panic!("expected investigate");
        };
        assert_eq!(args.time_range, "30m");
        assert_eq!(args.service.as_deref(), Some("checkout"));
    }

    #[test]
    fn test_patterns_subcommands() {
        let cli = Cli::try_parse_from(["logsleuth", "patterns", "classify", "rolled back deployment"])
            .unwrap();
        let Commands::Patterns(args) = cli.command else {
            panic!("expected patterns");
        };
        assert!(matches!(
            args.command,
            PatternsCommand::Classify { ref message } if message == "rolled back deployment"
        ));
    }
}
