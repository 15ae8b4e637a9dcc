//! HTTP adapter for the remote log-analytics query API.
//!
//! Sends one POST per query and flattens the answer into [`LogEvent`]s. The
//! backend may answer with a single JSON document or with NDJSON, one
//! message per line. Result rows either carry their fields directly or in
//! the `userData` / `labels` / `metadata` envelope.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::domain::errors::QueryError;
use crate::domain::models::{BackendConfig, LogEvent, QueryRequest, QueryResult, RateLimitConfig};
use crate::domain::ports::QueryExecutor;

const QUERY_PATH: &str = "/api/v1/dataprime/query";
const MAX_ERROR_BODY: usize = 500;

#[derive(Debug, Serialize)]
struct QueryBody<'a> {
    query: &'a str,
    metadata: QueryMetadata,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryMetadata {
    tier: String,
    syntax: String,
    start_date: String,
    end_date: String,
    limit: u32,
}

impl<'a> QueryBody<'a> {
    fn from_request(request: &'a QueryRequest) -> Self {
        Self {
            query: &request.query,
            metadata: QueryMetadata {
                tier: format!("TIER_{}", request.tier.as_str().to_ascii_uppercase()),
                syntax: format!("QUERY_SYNTAX_{}", request.syntax.as_str().to_ascii_uppercase()),
                start_date: request.window.start.to_rfc3339(),
                end_date: request.window.end.to_rfc3339(),
                limit: request.limit,
            },
        }
    }
}

/// [`QueryExecutor`] over HTTP with client-side rate limiting.
pub struct HttpQueryExecutor {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    timeout: Duration,
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl HttpQueryExecutor {
    pub fn new(backend: &BackendConfig, rate_limit: &RateLimitConfig) -> Result<Self, QueryError> {
        let timeout = Duration::from_secs(backend.timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| QueryError::Transport(format!("Failed to build HTTP client: {e}")))?;

        let per_second = NonZeroU32::new(rate_limit.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(rate_limit.burst_size).unwrap_or(NonZeroU32::MIN);
        let limiter = RateLimiter::direct(Quota::per_second(per_second).allow_burst(burst));

        Ok(Self {
            client,
            url: format!("{}{QUERY_PATH}", backend.endpoint.trim_end_matches('/')),
            api_key: backend.api_key.clone().filter(|k| !k.is_empty()),
            timeout,
            limiter: Arc::new(limiter),
        })
    }

    fn map_send_error(&self, err: &reqwest::Error) -> QueryError {
        if err.is_timeout() {
            QueryError::Timeout(u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX))
        } else {
            QueryError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl QueryExecutor for HttpQueryExecutor {
    fn name(&self) -> &'static str {
        "http"
    }

    #[instrument(skip(self, request), fields(tier = request.tier.as_str(), limit = request.limit))]
    async fn execute(&self, request: &QueryRequest) -> Result<QueryResult, QueryError> {
        self.limiter.until_ready().await;

        let mut call = self.client.post(&self.url).json(&QueryBody::from_request(request));
        if let Some(key) = &self.api_key {
            call = call.bearer_auth(key);
        }
        let response = call.send().await.map_err(|e| self.map_send_error(&e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.map_send_error(&e))?;
        if !status.is_success() {
            let message: String = body.trim().chars().take(MAX_ERROR_BODY).collect();
            return Err(QueryError::Remote {
                status: status.as_u16(),
                message,
            });
        }

        let events = parse_body(&body)?;
        debug!(status = status.as_u16(), events = events.len(), "Query answered");
        Ok(QueryResult::new(events))
    }
}

/// Flatten a response body, JSON document or NDJSON, into events.
pub fn parse_body(body: &str) -> Result<Vec<LogEvent>, QueryError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    if let Ok(document) = serde_json::from_str::<Value>(trimmed) {
        let mut events = Vec::new();
        collect_message(&document, &mut events)?;
        return Ok(events);
    }

    let mut events = Vec::new();
    for (idx, line) in trimmed.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let message: Value = serde_json::from_str(line)
            .map_err(|e| QueryError::Decode(format!("line {}: {e}", idx + 1)))?;
        collect_message(&message, &mut events)?;
    }
    Ok(events)
}

fn collect_message(message: &Value, events: &mut Vec<LogEvent>) -> Result<(), QueryError> {
    match message {
        Value::Array(rows) => {
            events.extend(rows.iter().filter_map(flatten_row));
        }
        Value::Object(object) => {
            if let Some(error) = object.get("error") {
                let message = error
                    .get("message")
                    .and_then(Value::as_str)
                    .map_or_else(|| error.to_string(), str::to_string);
                return Err(QueryError::Remote { status: 200, message });
            }
            let rows = object
                .get("result")
                .and_then(|r| r.get("results"))
                .or_else(|| object.get("results"));
            match rows {
                Some(Value::Array(rows)) => events.extend(rows.iter().filter_map(flatten_row)),
                Some(_) => return Err(QueryError::Decode("'results' is not an array".to_string())),
                // queryId and warning messages carry no rows
                None => {}
            }
        }
        _ => return Err(QueryError::Decode(format!("unexpected message: {message}"))),
    }
    Ok(())
}

/// Flatten one result row. Envelope keys are merged into a single field map;
/// `userData` may arrive as an object or as a JSON-encoded string.
fn flatten_row(row: &Value) -> Option<LogEvent> {
    let object = row.as_object()?;
    let enveloped = ["userData", "labels", "metadata"].iter().any(|k| object.contains_key(*k));
    if !enveloped {
        return Some(LogEvent::from_fields(object.clone()));
    }

    let mut fields = Map::new();
    for key in ["metadata", "labels"] {
        if let Some(Value::Array(pairs)) = object.get(key) {
            for pair in pairs {
                if let (Some(k), Some(v)) = (pair.get("key").and_then(Value::as_str), pair.get("value")) {
                    fields.insert(k.to_string(), v.clone());
                }
            }
        }
    }
    match object.get("userData") {
        Some(Value::String(raw)) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(user)) => fields.extend(user),
            _ => {
                fields.insert("message".to_string(), Value::String(raw.clone()));
            }
        },
        Some(Value::Object(user)) => fields.extend(user.clone()),
        _ => {}
    }
    Some(LogEvent::from_fields(fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{LogSeverity, QuerySyntax, QueryTier, TimeWindow};
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};

    fn request() -> QueryRequest {
        let end = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        QueryRequest {
            query: "source logs | filter $m.severity >= ERROR | limit 10".to_string(),
            tier: QueryTier::Frequent,
            syntax: QuerySyntax::Dataprime,
            window: TimeWindow::last(ChronoDuration::hours(1), end),
            limit: 10,
        }
    }

    fn backend(endpoint: String) -> BackendConfig {
        BackendConfig {
            endpoint,
            api_key: Some("secret-key".to_string()),
            ..BackendConfig::default()
        }
    }

    #[test]
    fn test_parse_ndjson_envelope() {
        let body = concat!(
            "{\"queryId\":{\"queryId\":\"q-1\"}}\n",
            "{\"result\":{\"results\":[",
            "{\"metadata\":[{\"key\":\"timestamp\",\"value\":\"2026-03-01T11:59:00Z\"},{\"key\":\"severity\",\"value\":\"Error\"}],",
            "\"labels\":[{\"key\":\"applicationname\",\"value\":\"checkout\"}],",
            "\"userData\":\"{\\\"message\\\":\\\"payment declined\\\",\\\"trace_id\\\":\\\"t-9\\\"}\"}",
            "]}}\n"
        );
        let events = parse_body(body).unwrap();
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.service.as_deref(), Some("checkout"));
        assert_eq!(event.severity, Some(LogSeverity::Error));
        assert_eq!(event.message.as_deref(), Some("payment declined"));
        assert_eq!(event.trace_id.as_deref(), Some("t-9"));
        assert!(event.timestamp.is_some());
    }

    #[test]
    fn test_parse_plain_json_rows() {
        let body = r#"{"results":[{"service":"api","error_count":42},{"service":"db","error_count":3}]}"#;
        let events = parse_body(body).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].number("error_count"), Some(42.0));
    }

    #[test]
    fn test_parse_rejects_garbage_line() {
        let body = "{\"results\":[]}\nnot json\n";
        assert!(matches!(parse_body(body), Err(QueryError::Decode(_))));
    }

    #[test]
    fn test_error_message_is_remote() {
        let body = r#"{"error":{"message":"unknown keyword 'filtr'"}}"#;
        match parse_body(body) {
            Err(QueryError::Remote { message, .. }) => assert!(message.contains("filtr")),
            other => panic!("expected remote error, got {other:?}"),
        }
    }

    #[test]
    fn test_body_metadata_wire_names() {
        let req = request();
        let json = serde_json::to_value(QueryBody::from_request(&req)).unwrap();
        assert_eq!(json["metadata"]["tier"], "TIER_FREQUENT_SEARCH");
        assert_eq!(json["metadata"]["syntax"], "QUERY_SYNTAX_DATAPRIME");
        assert_eq!(json["metadata"]["limit"], 10);
        assert!(json["metadata"]["startDate"].as_str().unwrap().starts_with("2026-03-01T11:00:00"));
    }

    #[tokio::test]
    async fn test_execute_sends_bearer_and_flattens() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", QUERY_PATH)
            .match_header("authorization", "Bearer secret-key")
            .with_status(200)
            .with_body("{\"result\":{\"results\":[{\"service\":\"api\",\"message\":\"boom\"}]}}\n")
            .create_async()
            .await;

        let executor = HttpQueryExecutor::new(&backend(server.url()), &RateLimitConfig::default()).unwrap();
        let result = executor.execute(&request()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(result.events.len(), 1);
        assert_eq!(result.events[0].message.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_http_error_maps_to_remote() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", QUERY_PATH)
            .with_status(400)
            .with_body("invalid query syntax")
            .create_async()
            .await;

        let executor = HttpQueryExecutor::new(&backend(server.url()), &RateLimitConfig::default()).unwrap();
        let err = executor.execute(&request()).await.unwrap_err();
        assert_eq!(
            err,
            QueryError::Remote {
                status: 400,
                message: "invalid query syntax".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        let executor =
            HttpQueryExecutor::new(&backend("http://127.0.0.1:1".to_string()), &RateLimitConfig::default()).unwrap();
        let err = executor.execute(&request()).await.unwrap_err();
        assert!(matches!(err, QueryError::Transport(_)));
    }
}
