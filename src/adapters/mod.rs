//! Adapters implementing the domain ports.

pub mod http;
pub mod scripted;

pub use http::HttpQueryExecutor;
pub use scripted::ScriptedQueryExecutor;
