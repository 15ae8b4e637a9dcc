//! Log clusters: groups of events sharing a normalized message template.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::log_event::LogSeverity;

/// Inferred cause behind a cluster's template.
///
/// Tags split into fundamental causes (resource or configuration problems
/// that start incidents) and symptoms (what callers observe downstream).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CauseTag {
    MemoryPressure,
    DiskPressure,
    ResourceExhaustion,
    ConfigurationError,
    DatabaseContention,
    AuthFailure,
    RateLimited,
    DependencyFailure,
    Timeout,
    Unknown,
}

impl CauseTag {
    pub fn is_fundamental(self) -> bool {
        matches!(
            self,
            Self::MemoryPressure
                | Self::DiskPressure
                | Self::ResourceExhaustion
                | Self::ConfigurationError
                | Self::DatabaseContention
                | Self::AuthFailure
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::MemoryPressure => "MEMORY_PRESSURE",
            Self::DiskPressure => "DISK_PRESSURE",
            Self::ResourceExhaustion => "RESOURCE_EXHAUSTION",
            Self::ConfigurationError => "CONFIGURATION_ERROR",
            Self::DatabaseContention => "DATABASE_CONTENTION",
            Self::AuthFailure => "AUTH_FAILURE",
            Self::RateLimited => "RATE_LIMITED",
            Self::DependencyFailure => "DEPENDENCY_FAILURE",
            Self::Timeout => "TIMEOUT",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for CauseTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogCluster {
    /// Stable short digest of the template.
    pub template_id: String,
    pub template: String,
    pub cause: CauseTag,
    pub count: usize,
    pub first_seen: Option<DateTime<Utc>>,
    pub services: Vec<String>,
    pub worst_severity: Option<LogSeverity>,
}

impl LogCluster {
    pub fn is_error(&self) -> bool {
        self.worst_severity.is_some_and(LogSeverity::is_error)
    }
}

/// A cluster scored as a possible root cause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootCauseCandidate {
    pub cluster: LogCluster,
    pub score: f64,
    pub rationale: String,
}
