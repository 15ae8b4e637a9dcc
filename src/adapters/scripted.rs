//! In-process query executor that answers from a script.
//!
//! Rules are matched in registration order by substring of the query text.
//! Unmatched queries return an empty result. Every request is recorded so
//! callers can assert on what was sent.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::errors::QueryError;
use crate::domain::models::{LogEvent, QueryRequest, QueryResult};
use crate::domain::ports::QueryExecutor;

#[derive(Debug, Clone)]
enum Reply {
    Events(Vec<LogEvent>),
    Fail(QueryError),
}

#[derive(Debug, Clone)]
struct Rule {
    needle: String,
    delay: Option<Duration>,
    reply: Reply,
}

/// Executor returning canned results keyed by query substring.
#[derive(Debug, Default)]
pub struct ScriptedQueryExecutor {
    rules: Vec<Rule>,
    calls: Mutex<Vec<QueryRequest>>,
}

impl ScriptedQueryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer queries containing `needle` with `events`.
    #[must_use]
    pub fn respond(mut self, needle: impl Into<String>, events: Vec<LogEvent>) -> Self {
        self.rules.push(Rule {
            needle: needle.into(),
            delay: None,
            reply: Reply::Events(events),
        });
        self
    }

    /// Fail queries containing `needle` with `error`.
    #[must_use]
    pub fn fail(mut self, needle: impl Into<String>, error: QueryError) -> Self {
        self.rules.push(Rule {
            needle: needle.into(),
            delay: None,
            reply: Reply::Fail(error),
        });
        self
    }

    /// Answer queries containing `needle` with `events` after `delay`.
    #[must_use]
    pub fn respond_after(mut self, needle: impl Into<String>, delay: Duration, events: Vec<LogEvent>) -> Self {
        self.rules.push(Rule {
            needle: needle.into(),
            delay: Some(delay),
            reply: Reply::Events(events),
        });
        self
    }

    /// Requests received so far, in order.
    pub fn calls(&self) -> Vec<QueryRequest> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait]
impl QueryExecutor for ScriptedQueryExecutor {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn execute(&self, request: &QueryRequest) -> Result<QueryResult, QueryError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        let Some(rule) = self.rules.iter().find(|r| request.query.contains(&r.needle)) else {
            return Ok(QueryResult::default());
        };
        if let Some(delay) = rule.delay {
            tokio::time::sleep(delay).await;
        }
        match &rule.reply {
            Reply::Events(events) => Ok(QueryResult::new(events.clone())),
            Reply::Fail(err) => Err(err.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{LogSeverity, QuerySyntax, QueryTier, TimeWindow};
    use chrono::{Duration as ChronoDuration, Utc};

    fn request(query: &str) -> QueryRequest {
        QueryRequest {
            query: query.to_string(),
            tier: QueryTier::Frequent,
            syntax: QuerySyntax::Dataprime,
            window: TimeWindow::last(ChronoDuration::hours(1), Utc::now()),
            limit: 100,
        }
    }

    #[tokio::test]
    async fn test_first_matching_rule_wins() {
        let event = LogEvent::message(Utc::now(), LogSeverity::Error, "api", "boom");
        let executor = ScriptedQueryExecutor::new()
            .respond("severity", vec![event.clone()])
            .fail("severity", QueryError::Transport("unreachable".to_string()));

        let result = executor.execute(&request("source logs | filter $m.severity >= ERROR")).await.unwrap();
        assert_eq!(result.events, vec![event]);
        assert!(executor.execute(&request("source logs | limit 1")).await.unwrap().events.is_empty());
        assert_eq!(executor.call_count(), 2);
    }

    #[tokio::test]
    async fn test_failure_is_returned() {
        let executor = ScriptedQueryExecutor::new().fail("limit", QueryError::Remote {
            status: 400,
            message: "bad query".to_string(),
        });
        let err = executor.execute(&request("source logs | limit 5")).await.unwrap_err();
        assert!(err.is_remote());
        assert_eq!(executor.calls()[0].query, "source logs | limit 5");
    }
}
