//! Query plans, requests, and executed-query records.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::cursor::TimeCursor;
use super::log_event::LogEvent;
use crate::domain::errors::QueryError;

/// Storage class a query targets in the remote log service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QueryTier {
    /// Hot, indexed storage.
    #[default]
    Frequent,
    /// Cold, archival storage.
    Archive,
}

impl QueryTier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Frequent => "frequent_search",
            Self::Archive => "archive",
        }
    }
}

/// Query language understood by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuerySyntax {
    #[default]
    Dataprime,
    Lucene,
}

impl QuerySyntax {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dataprime => "dataprime",
            Self::Lucene => "lucene",
        }
    }
}

/// Half-open time interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Window ending `now` and spanning `length` backwards.
    pub fn last(length: chrono::Duration, now: DateTime<Utc>) -> Self {
        Self {
            start: now - length,
            end: now,
        }
    }

    pub fn duration(&self) -> chrono::Duration {
        self.end - self.start
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} .. {}", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

/// Immutable descriptor of one query the investigation intends to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPlan {
    pub id: String,
    pub purpose: String,
    pub query: String,
    pub tier: QueryTier,
    pub priority: u8,
    /// Informational only: plans run in slice order.
    pub depends_on: Option<String>,
}

impl QueryPlan {
    pub fn new(id: impl Into<String>, purpose: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            purpose: purpose.into(),
            query: query.into(),
            tier: QueryTier::default(),
            priority: 1,
            depends_on: None,
        }
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_tier(mut self, tier: QueryTier) -> Self {
        self.tier = tier;
        self
    }

    pub fn depends_on(mut self, id: impl Into<String>) -> Self {
        self.depends_on = Some(id.into());
        self
    }
}

/// Request handed to a [`QueryExecutor`](crate::domain::ports::QueryExecutor).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    pub tier: QueryTier,
    pub syntax: QuerySyntax,
    pub window: TimeWindow,
    pub limit: u32,
}

/// Successful response from the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub events: Vec<LogEvent>,
}

impl QueryResult {
    pub fn new(events: Vec<LogEvent>) -> Self {
        Self { events }
    }
}

/// Outcome of running one [`QueryPlan`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutedQuery {
    pub id: String,
    pub purpose: String,
    /// Query text after auto-correction, exactly as sent.
    pub query: String,
    #[serde(with = "duration_millis")]
    pub duration: Duration,
    pub error: Option<QueryError>,
    pub events: Vec<LogEvent>,
    /// Present when the result filled the requested limit.
    pub next_cursor: Option<TimeCursor>,
}

impl ExecutedQuery {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    /// One-line status for reports.
    pub fn status_line(&self) -> String {
        match &self.error {
            None => format!(
                "[ok] {} ({} events, {}ms)",
                self.purpose,
                self.events.len(),
                self.duration.as_millis()
            ),
            Some(err) => format!("[error] {}: {}", self.purpose, err),
        }
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_window_contains_is_half_open() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();
        let window = TimeWindow::new(start, start + chrono::Duration::hours(1));
        assert!(window.contains(start));
        assert!(!window.contains(window.end));
        assert_eq!(window.duration(), chrono::Duration::hours(1));
    }

    #[test]
    fn test_status_line_shows_error() {
        let executed = ExecutedQuery {
            id: "q1".to_string(),
            purpose: "Error rate by service".to_string(),
            query: "source logs".to_string(),
            duration: Duration::from_millis(12),
            error: Some(QueryError::Timeout(5000)),
            events: vec![],
            next_cursor: None,
        };
        assert!(!executed.succeeded());
        assert!(executed.status_line().starts_with("[error] Error rate by service"));
    }
}
