//! Change correlation entry point: one broad change query around an
//! incident, classified and scored by the [`ChangeCorrelator`].

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::domain::errors::{DomainError, DomainResult, QueryError};
use crate::domain::models::{
    BackendConfig, ChangeCategory, ChangeCorrelationReport, ChangeCorrelationRequest,
    CorrelationWindow, QueryRequest, QuerySyntax,
};
use crate::domain::ports::QueryExecutor;
use crate::services::change_correlator::{change_query, ChangeCorrelator};
use crate::services::pattern_registry::PatternRegistry;
use crate::services::time_range::parse_incident_time;

/// Rows requested from the backend for one correlation.
pub const CHANGE_QUERY_LIMIT: u32 = 1000;

pub struct ChangeCorrelationService {
    executor: Arc<dyn QueryExecutor>,
    correlator: ChangeCorrelator,
    backend: BackendConfig,
}

impl ChangeCorrelationService {
    pub fn new(executor: Arc<dyn QueryExecutor>, registry: Arc<PatternRegistry>, backend: BackendConfig) -> Self {
        Self {
            executor,
            correlator: ChangeCorrelator::new(registry),
            backend,
        }
    }

    pub fn registry(&self) -> &Arc<PatternRegistry> {
        self.correlator.registry()
    }

    /// Correlate the changes around an incident.
    ///
    /// Malformed timestamps, unsupported windows and unknown categories are
    /// rejected before the query is sent. A failed query still yields a
    /// report, with `query_error` set and no changes.
    #[instrument(skip(self, request), fields(incident = %request.incident_time))]
    pub async fn correlate_changes(&self, request: &ChangeCorrelationRequest) -> DomainResult<ChangeCorrelationReport> {
        let incident = parse_incident_time(&request.incident_time)?;
        let window = CorrelationWindow::parse(
            incident,
            request.window_before.as_deref(),
            request.window_after.as_deref(),
        )?;

        let tables = self.correlator.registry().snapshot();
        let category = match request.category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            Some(raw) => {
                let category = ChangeCategory::from(raw.to_string());
                if !tables.has_category(&category) {
                    return Err(DomainError::UnknownCategory(raw.to_string()));
                }
                Some(category)
            }
            None => None,
        };
        let service = request.service.as_deref().map(str::trim).filter(|s| !s.is_empty());

        let query = QueryRequest {
            query: change_query(&tables, service),
            tier: self.backend.tier,
            syntax: QuerySyntax::Dataprime,
            window: window.time_window(),
            limit: CHANGE_QUERY_LIMIT,
        };
        let timeout = Duration::from_secs(self.backend.timeout_secs);
        let outcome = match tokio::time::timeout(timeout, self.executor.execute(&query)).await {
            Ok(result) => result,
            Err(_) => Err(QueryError::Timeout(
                u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            )),
        };

        let report = match outcome {
            Ok(result) => self.correlator.correlate(&window, &result.events, category.as_ref()),
            Err(err) => {
                warn!(error = %err, "Change query failed");
                let mut report = self.correlator.correlate(&window, &[], category.as_ref());
                report.recommendation =
                    "The change query failed; check backend connectivity and retry before ruling out a change."
                        .to_string();
                report.query_error = Some(err.to_string());
                report
            }
        };

        info!(
            total_changes = report.total_changes,
            high_risk = report.high_risk_changes,
            trigger = report.likely_trigger.as_ref().map(|t| t.category.as_str()),
            confidence = report.confidence,
            "Change correlation complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::scripted::ScriptedQueryExecutor;
    use crate::domain::models::{LogEvent, LogSeverity};
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};

    const INCIDENT: &str = "2026-03-01T12:00:00Z";

    fn incident() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn service(executor: Arc<ScriptedQueryExecutor>) -> ChangeCorrelationService {
        ChangeCorrelationService::new(executor, Arc::new(PatternRegistry::new()), BackendConfig::default())
    }

    fn events() -> Vec<LogEvent> {
        vec![
            LogEvent::message(
                incident() - ChronoDuration::minutes(8),
                LogSeverity::Info,
                "checkout",
                "Deployed checkout v2.4.0 to production",
            ),
            LogEvent::message(
                incident() - ChronoDuration::minutes(40),
                LogSeverity::Info,
                "checkout",
                "Updated config parameter pool_size",
            ),
        ]
    }

    #[tokio::test]
    async fn test_malformed_timestamp_rejected_before_query() {
        let executor = Arc::new(ScriptedQueryExecutor::new());
        let result = service(executor.clone())
            .correlate_changes(&ChangeCorrelationRequest::new("not a time"))
            .await;
        assert!(matches!(result, Err(DomainError::InvalidTimestamp { .. })));
        assert_eq!(executor.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unsupported_window_rejected_before_query() {
        let executor = Arc::new(ScriptedQueryExecutor::new());
        let mut request = ChangeCorrelationRequest::new(INCIDENT);
        request.window_before = Some("12h".to_string());
        let result = service(executor.clone()).correlate_changes(&request).await;
        assert!(matches!(result, Err(DomainError::InvalidWindow { kind: "before", .. })));
        assert_eq!(executor.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_category_rejected() {
        let executor = Arc::new(ScriptedQueryExecutor::new());
        let mut request = ChangeCorrelationRequest::new(INCIDENT);
        request.category = Some("kafka".to_string());
        let result = service(executor.clone()).correlate_changes(&request).await;
        assert!(matches!(result, Err(DomainError::UnknownCategory(_))));
        assert_eq!(executor.call_count(), 0);
    }

    #[tokio::test]
    async fn test_trigger_identified_from_query_results() {
        let executor = Arc::new(ScriptedQueryExecutor::new().respond("$d.message ~ 'deploy'", events()));
        let mut request = ChangeCorrelationRequest::new(INCIDENT);
        request.service = Some("checkout".to_string());
        let report = service(executor.clone()).correlate_changes(&request).await.unwrap();

        let sent = &executor.calls()[0];
        assert!(sent.query.contains("$l.applicationname == 'checkout'"));
        assert_eq!(sent.window.start, incident() - ChronoDuration::hours(1));
        assert_eq!(sent.limit, CHANGE_QUERY_LIMIT);

        assert_eq!(report.total_changes, 2);
        let trigger = report.likely_trigger.unwrap();
        assert_eq!(trigger.category, ChangeCategory::Deployment);
        assert!(report.recommendation.starts_with("Roll back the deployment"));
        assert!(report.query_error.is_none());
    }

    #[tokio::test]
    async fn test_query_failure_reported_not_raised() {
        let executor = Arc::new(
            ScriptedQueryExecutor::new().fail("source logs", QueryError::Transport("connection refused".to_string())),
        );
        let report = service(executor)
            .correlate_changes(&ChangeCorrelationRequest::new(INCIDENT))
            .await
            .unwrap();
        assert_eq!(report.total_changes, 0);
        assert!(report.query_error.unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_custom_category_accepted_after_registration() {
        let registry = Arc::new(PatternRegistry::new());
        registry
            .register_category(ChangeCategory::Custom("kafka".to_string()), &["topic".to_string()])
            .unwrap();
        let executor = Arc::new(ScriptedQueryExecutor::new().respond(
            "source logs",
            vec![LogEvent::message(
                incident() - ChronoDuration::minutes(2),
                LogSeverity::Info,
                "broker",
                "Topic orders partitions increased",
            )],
        ));
        let service = ChangeCorrelationService::new(executor, registry, BackendConfig::default());
        let mut request = ChangeCorrelationRequest::new(INCIDENT);
        request.category = Some("kafka".to_string());

        let report = service.correlate_changes(&request).await.unwrap();
        assert_eq!(report.total_changes, 1);
        assert_eq!(report.changes[0].category, ChangeCategory::Custom("kafka".to_string()));
    }
}
