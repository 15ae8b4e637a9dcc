//! Common test utilities for integration tests
//!
//! Shared fixtures for building orchestrators and services around a
//! [`ScriptedQueryExecutor`] and for generating log events.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use logsleuth::adapters::ScriptedQueryExecutor;
use logsleuth::application::{ChangeCorrelationService, InvestigationOrchestrator};
use logsleuth::domain::models::{Config, LogEvent, LogSeverity};
use logsleuth::services::{ClusterCache, LogClusterer, PatternRegistry};

/// Fixed reference instant used as "now" and as the incident time.
pub fn incident() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

pub const INCIDENT: &str = "2026-03-01T12:00:00Z";

pub fn orchestrator(executor: Arc<ScriptedQueryExecutor>) -> InvestigationOrchestrator {
    let config = Config::default();
    let clusterer = LogClusterer::new(Arc::new(ClusterCache::new(&config.cache)));
    InvestigationOrchestrator::new(executor, clusterer, &config)
}

pub fn correlation_service(
    executor: Arc<ScriptedQueryExecutor>,
    registry: Arc<PatternRegistry>,
) -> ChangeCorrelationService {
    ChangeCorrelationService::new(executor, registry, Config::default().backend)
}

/// An event `minutes_before` the incident.
pub fn event_before(minutes_before: i64, severity: LogSeverity, service: &str, message: &str) -> LogEvent {
    LogEvent::message(incident() - Duration::minutes(minutes_before), severity, service, message)
}

/// A request flow through gateway, orders and inventory that breaks at inventory.
pub fn broken_flow(trace_id: &str) -> Vec<LogEvent> {
    let t0 = incident() - Duration::minutes(5);
    let steps = [
        (0, LogSeverity::Info, "gateway", "request received"),
        (1, LogSeverity::Info, "orders", "reserving stock"),
        (2, LogSeverity::Error, "inventory", "stock lookup failed"),
        (3, LogSeverity::Error, "orders", "upstream returned 500"),
    ];
    steps
        .into_iter()
        .map(|(offset, severity, service, message)| {
            let mut event = LogEvent::message(t0 + Duration::seconds(offset), severity, service, message);
            event.trace_id = Some(trace_id.to_string());
            event
        })
        .collect()
}

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
