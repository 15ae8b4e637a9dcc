//! Change correlation against scripted and mocked HTTP backends.

mod common;

use std::sync::Arc;

use logsleuth::adapters::{HttpQueryExecutor, ScriptedQueryExecutor};
use logsleuth::application::ChangeCorrelationService;
use logsleuth::domain::models::{
    BackendConfig, ChangeCategory, ChangeCorrelationRequest, LogSeverity, RateLimitConfig,
    RiskTier,
};
use logsleuth::services::PatternRegistry;

use common::{correlation_service, event_before, INCIDENT};

#[tokio::test]
async fn test_closest_preceding_change_is_the_trigger() {
    let events = vec![
        event_before(45, LogSeverity::Info, "checkout", "Updated config parameter pool_size"),
        event_before(4, LogSeverity::Warning, "checkout", "Deployed checkout v2.4.0 to production"),
        event_before(-5, LogSeverity::Info, "iam", "Granted role admin to ci-bot"),
    ];
    let executor = Arc::new(ScriptedQueryExecutor::new().respond("source logs", events));
    let service = correlation_service(executor, Arc::new(PatternRegistry::new()));

    let report = service
        .correlate_changes(&ChangeCorrelationRequest::new(INCIDENT))
        .await
        .unwrap();

    assert_eq!(report.total_changes, 3);
    let trigger = report.likely_trigger.as_ref().unwrap();
    assert_eq!(trigger.category, ChangeCategory::Deployment);
    assert!(trigger.timestamp <= report.incident);

    let timestamps: Vec<_> = report.changes.iter().map(|c| c.timestamp).collect();
    let mut sorted = timestamps.clone();
    sorted.sort();
    assert_eq!(timestamps, sorted);

    let post = report.changes.iter().find(|c| c.timestamp > report.incident).unwrap();
    assert!((post.correlation - 0.3).abs() < 1e-9);
    assert!(report.confidence > 0.5 && report.confidence <= 1.0);
}

#[tokio::test]
async fn test_category_filter_limits_the_report() {
    let events = vec![
        event_before(20, LogSeverity::Info, "checkout", "Deployed checkout v2.4.0"),
        event_before(10, LogSeverity::Info, "iam", "Attached policy to role payments-writer"),
    ];
    let executor = Arc::new(ScriptedQueryExecutor::new().respond("source logs", events));
    let service = correlation_service(executor, Arc::new(PatternRegistry::new()));

    let mut request = ChangeCorrelationRequest::new(INCIDENT);
    request.category = Some("iam".to_string());
    let report = service.correlate_changes(&request).await.unwrap();

    assert_eq!(report.total_changes, 1);
    assert_eq!(report.changes[0].category, ChangeCategory::Iam);
}

#[tokio::test]
async fn test_registered_risk_keywords_raise_the_tier() {
    let registry = Arc::new(PatternRegistry::new());
    registry
        .register_risk_keywords(RiskTier::Critical, &["payments-prod".to_string()])
        .unwrap();
    let events = vec![event_before(
        3,
        LogSeverity::Info,
        "deployer",
        "Deployed release 81 to payments-prod",
    )];
    let executor = Arc::new(ScriptedQueryExecutor::new().respond("source logs", events));
    let report = correlation_service(executor, registry)
        .correlate_changes(&ChangeCorrelationRequest::new(INCIDENT))
        .await
        .unwrap();

    assert_eq!(report.changes[0].risk, RiskTier::Critical);
    assert_eq!(report.high_risk_changes, 1);
}

#[tokio::test]
async fn test_correlation_over_http_backend() {
    let mut server = mockito::Server::new_async().await;
    let body = concat!(
        "{\"queryId\":{\"queryId\":\"q-7\"}}\n",
        "{\"result\":{\"results\":[",
        "{\"metadata\":[{\"key\":\"timestamp\",\"value\":\"2026-03-01T11:52:00Z\"}],",
        "\"labels\":[{\"key\":\"applicationname\",\"value\":\"checkout\"}],",
        "\"userData\":\"{\\\"message\\\":\\\"Deployed checkout v2.5.0\\\"}\"}",
        "]}}\n"
    );
    let mock = server
        .mock("POST", "/api/v1/dataprime/query")
        .match_header("authorization", "Bearer test-key")
        .with_status(200)
        .with_body(body)
        .create_async()
        .await;

    let backend = BackendConfig {
        endpoint: server.url(),
        api_key: Some("test-key".to_string()),
        ..BackendConfig::default()
    };
    let executor = Arc::new(HttpQueryExecutor::new(&backend, &RateLimitConfig::default()).unwrap());
    let service = ChangeCorrelationService::new(executor, Arc::new(PatternRegistry::new()), backend);

    let report = service
        .correlate_changes(&ChangeCorrelationRequest::new(INCIDENT))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(report.total_changes, 1);
    let trigger = report.likely_trigger.unwrap();
    assert_eq!(trigger.service.as_deref(), Some("checkout"));
    assert_eq!(trigger.category, ChangeCategory::Deployment);
}

#[tokio::test]
async fn test_http_rejection_becomes_query_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/v1/dataprime/query")
        .with_status(401)
        .with_body("unauthorized")
        .create_async()
        .await;

    let backend = BackendConfig {
        endpoint: server.url(),
        ..BackendConfig::default()
    };
    let executor = Arc::new(HttpQueryExecutor::new(&backend, &RateLimitConfig::default()).unwrap());
    let report = ChangeCorrelationService::new(executor, Arc::new(PatternRegistry::new()), backend)
        .correlate_changes(&ChangeCorrelationRequest::new(INCIDENT))
        .await
        .unwrap();

    let error = report.query_error.unwrap();
    assert!(error.contains("401"));
    assert!(report.likely_trigger.is_none());
}
