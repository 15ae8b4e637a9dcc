//! Port trait definitions (Hexagonal Architecture)
//!
//! - QueryExecutor: runs queries against the remote log-analytics service
//!
//! Adapters in [`crate::adapters`] implement these traits so the services stay
//! independent of any specific backend.

pub mod query_executor;

pub use query_executor::QueryExecutor;
