use clap::Parser;
use logsleuth::cli::commands::patterns::PatternsCommand;
use logsleuth::cli::{Cli, Commands};
use logsleuth::domain::models::InvestigationMode;

#[test]
fn test_parse_investigate_defaults() {
    let cli = Cli::try_parse_from(["logsleuth", "investigate"]).unwrap();

    assert!(!cli.json);
    assert!(cli.config.is_none());
    match cli.command {
        Commands::Investigate(args) => {
            assert_eq!(args.time_range, "1h");
            assert!(args.service.is_none());
            assert!(args.mode.is_none());
            assert!(!args.generate_assets);
            assert!(!args.dry_run);
        }
        _ => panic!("Wrong top-level command"),
    }
}

#[test]
fn test_parse_investigate_flow() {
    let cli = Cli::try_parse_from([
        "logsleuth",
        "--json",
        "investigate",
        "last 24h",
        "--trace-id",
        "abc-123",
        "--mode",
        "flow",
        "--max-queries",
        "3",
        "--generate-assets",
        "--deadline-secs",
        "45",
    ])
    .unwrap();

    assert!(cli.json);
    match cli.command {
        Commands::Investigate(args) => {
            assert_eq!(args.time_range, "last 24h");
            assert_eq!(args.trace_id.as_deref(), Some("abc-123"));
            assert_eq!(args.mode, Some(InvestigationMode::Flow));
            assert_eq!(args.max_queries, Some(3));
            assert!(args.generate_assets);
            assert_eq!(args.deadline_secs, Some(45));

            let request = args.to_request();
            assert_eq!(request.trace_id.as_deref(), Some("abc-123"));
            assert!(request.deadline.is_some());
        }
        _ => panic!("Wrong top-level command"),
    }
}

#[test]
fn test_parse_rejects_unknown_mode() {
    let result = Cli::try_parse_from(["logsleuth", "investigate", "--mode", "sideways"]);
    assert!(result.is_err());
}

#[test]
fn test_parse_correlate() {
    let cli = Cli::try_parse_from([
        "logsleuth",
        "correlate",
        "2026-03-01T12:00:00Z",
        "--before",
        "2h",
        "--after",
        "5m",
        "--category",
        "deployment",
        "--config",
        "/etc/logsleuth.yaml",
    ])
    .unwrap();

    assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("/etc/logsleuth.yaml")));
    match cli.command {
        Commands::Correlate(args) => {
            let request = args.to_request();
            assert_eq!(request.incident_time, "2026-03-01T12:00:00Z");
            assert_eq!(request.window_before.as_deref(), Some("2h"));
            assert_eq!(request.window_after.as_deref(), Some("5m"));
            assert_eq!(request.category.as_deref(), Some("deployment"));
            assert!(request.service.is_none());
        }
        _ => panic!("Wrong top-level command"),
    }
}

#[test]
fn test_correlate_requires_incident_time() {
    assert!(Cli::try_parse_from(["logsleuth", "correlate"]).is_err());
}

#[test]
fn test_parse_patterns_list() {
    let cli = Cli::try_parse_from(["logsleuth", "patterns", "list"]).unwrap();
    match cli.command {
        Commands::Patterns(args) => assert!(matches!(args.command, PatternsCommand::List)),
        _ => panic!("Wrong top-level command"),
    }
}
