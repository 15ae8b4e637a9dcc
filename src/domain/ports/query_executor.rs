//! Query executor port - interface to the remote log-analytics service.

use async_trait::async_trait;

use crate::domain::errors::QueryError;
use crate::domain::models::{QueryRequest, QueryResult};

/// Executes one query against the remote log-analytics backend.
///
/// Implementations return flattened events. Any failure (malformed syntax,
/// authentication, timeout) is reported as a [`QueryError`]; callers treat
/// it as a per-query soft failure.
///
/// # Examples
///
/// ```no_run
/// use logsleuth::domain::ports::QueryExecutor;
/// use logsleuth::domain::models::QueryRequest;
///
/// async fn run(executor: &dyn QueryExecutor, request: QueryRequest) {
///     match executor.execute(&request).await {
///         Ok(result) => println!("{} events", result.events.len()),
///         Err(err) => eprintln!("query failed: {err}"),
///     }
/// }
/// ```
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Backend name, for logs and reports.
    fn name(&self) -> &'static str;

    /// Run a query and return its events.
    async fn execute(&self, request: &QueryRequest) -> Result<QueryResult, QueryError>;
}
