//! Domain layer for logsleuth
//!
//! Core models, errors, and the ports the services depend on.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult, QueryError};
