//! End-to-end investigations against a scripted backend.

mod common;

use std::sync::Arc;

use logsleuth::adapters::ScriptedQueryExecutor;
use logsleuth::domain::models::{
    AssetKind, FindingKind, InvestigationMode, InvestigationRequest, LogSeverity, Severity,
};
use logsleuth::domain::{DomainError, QueryError};

use common::{broken_flow, event_before, incident, orchestrator, setup_test_logging};

#[tokio::test]
async fn test_flow_investigation_finds_the_break() {
    setup_test_logging();
    let executor = Arc::new(ScriptedQueryExecutor::new().respond("trace_id", broken_flow("abc-123")));
    let request = InvestigationRequest::new("1h").with_trace_id("abc-123");

    let report = orchestrator(executor.clone())
        .investigate_at(&request, incident())
        .await
        .unwrap();

    assert_eq!(report.mode, InvestigationMode::Flow);
    assert_eq!(executor.call_count(), 1);
    assert!(executor.calls()[0].query.contains("'abc-123'"));

    let flow_break = report
        .findings
        .iter()
        .find(|f| f.kind == FindingKind::FlowBreak)
        .expect("flow break finding");
    assert_eq!(flow_break.service.as_deref(), Some("inventory"));
    assert!(report.summary.affected_services.contains(&"inventory".to_string()));
}

#[tokio::test]
async fn test_component_investigation_reports_dependency_failures() {
    let failures = (0..4)
        .map(|i| {
            event_before(
                i,
                LogSeverity::Error,
                "payments",
                "dial tcp 10.0.0.4:5432: connection refused",
            )
        })
        .collect();
    let executor = Arc::new(ScriptedQueryExecutor::new().respond("connection refused", failures));
    let request = InvestigationRequest::new("30m").with_service("payments");

    let report = orchestrator(executor.clone())
        .investigate_at(&request, incident())
        .await
        .unwrap();

    assert_eq!(report.mode, InvestigationMode::Component);
    assert!(executor
        .calls()
        .iter()
        .all(|call| call.query.contains("'payments'")));
    assert!(report
        .findings
        .iter()
        .any(|f| f.kind == FindingKind::Dependency && f.service.as_deref() == Some("payments")));
}

#[tokio::test]
async fn test_every_backend_failure_is_reported_not_raised() {
    let executor = Arc::new(ScriptedQueryExecutor::new().fail("", QueryError::Transport("connection reset".to_string())));
    let report = orchestrator(executor.clone())
        .investigate_at(&InvestigationRequest::new("1h"), incident())
        .await
        .unwrap();

    assert_eq!(report.mode, InvestigationMode::Global);
    assert_eq!(report.query_status.len(), executor.call_count());
    assert!(report.query_status.iter().all(|s| s.starts_with("[error]")));
    assert!(report.findings.is_empty());
}

#[tokio::test]
async fn test_error_groups_produce_ranked_findings_and_assets() {
    let row = |service: &str, count: u64| {
        let fields = serde_json::json!({"service": service, "error_count": count});
        logsleuth::domain::models::LogEvent::from_fields(fields.as_object().cloned().unwrap())
    };
    let executor = Arc::new(ScriptedQueryExecutor::new().respond(
        "groupby $l.applicationname",
        vec![row("checkout", 900), row("search", 60)],
    ));
    let mut request = InvestigationRequest::new("1h");
    request.generate_assets = true;

    let report = orchestrator(executor)
        .investigate_at(&request, incident())
        .await
        .unwrap();

    assert!(report.findings.len() >= 2);
    assert_eq!(report.findings[0].service.as_deref(), Some("checkout"));
    assert!(report.findings[0].severity >= Severity::High);
    assert!(report.findings[0].severity >= report.findings[1].severity);
    assert!(report.assets.iter().any(|a| a.kind == AssetKind::Alert));
    assert!(report.assets.iter().any(|a| a.kind == AssetKind::Runbook));
}

#[tokio::test]
async fn test_caller_errors_reach_no_backend() {
    let executor = Arc::new(ScriptedQueryExecutor::new());
    let orchestrator = orchestrator(executor.clone());

    let mut forced = InvestigationRequest::new("1h");
    forced.mode = Some(InvestigationMode::Component);
    assert!(matches!(
        orchestrator.investigate_at(&forced, incident()).await,
        Err(DomainError::MissingTargetService)
    ));
    assert!(matches!(
        orchestrator
            .investigate_at(&InvestigationRequest::new("1h").with_max_queries(0), incident())
            .await,
        Err(DomainError::InvalidInput(_))
    ));
    assert!(matches!(
        orchestrator
            .investigate_at(&InvestigationRequest::new("forever"), incident())
            .await,
        Err(DomainError::InvalidTimeRange(_))
    ));
    assert_eq!(executor.call_count(), 0);
}
