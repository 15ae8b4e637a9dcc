//! Logsleuth - autonomous log investigation and change correlation
//!
//! Logsleuth drives a remote log-analytics service to investigate incidents:
//! it plans and runs a bounded set of queries, clusters and analyzes the
//! returned events, matches known failure signatures, and correlates an
//! incident with the configuration, deployment, and IAM changes around it.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Models, errors, and the `QueryExecutor` port
//! - **Service Layer** (`services`): Strategies, clustering, heuristics, change correlation
//! - **Application Layer** (`application`): Investigation and change-correlation entry points
//! - **Adapters** (`adapters`): HTTP and scripted implementations of the query port
//! - **Infrastructure Layer** (`infrastructure`): Configuration and logging
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use logsleuth::adapters::HttpQueryExecutor;
//! use logsleuth::application::InvestigationOrchestrator;
//! use logsleuth::domain::models::InvestigationRequest;
//! use logsleuth::services::{ClusterCache, LogClusterer};
//! use logsleuth::ConfigLoader;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::load()?;
//!     let executor = Arc::new(HttpQueryExecutor::new(&config.backend, &config.rate_limit)?);
//!     let clusterer = LogClusterer::new(Arc::new(ClusterCache::new(&config.cache)));
//!     let orchestrator = InvestigationOrchestrator::new(executor, clusterer, &config);
//!
//!     let request = InvestigationRequest::new("1h").with_service("checkout");
//!     let report = orchestrator.investigate(&request).await?;
//!     println!("{}", report.summary.root_cause);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use adapters::{HttpQueryExecutor, ScriptedQueryExecutor};
pub use application::{ChangeCorrelationService, InvestigationOrchestrator};
pub use domain::models::{
    ChangeCorrelationReport, ChangeCorrelationRequest, Config, InvestigationReport,
    InvestigationRequest, LogEvent,
};
pub use domain::ports::QueryExecutor;
pub use domain::{DomainError, DomainResult, QueryError};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use infrastructure::logging::{LogConfig, LoggerImpl};
pub use services::{ClusterCache, LogClusterer, PatternRegistry};
