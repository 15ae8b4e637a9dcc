//! Configuration / deployment / IAM change events and their correlation report.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::query::TimeWindow;
use crate::domain::errors::{DomainError, DomainResult};

/// Category of a change-shaped event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChangeCategory {
    Deployment,
    Config,
    Iam,
    Scaling,
    Network,
    Secret,
    Database,
    Infrastructure,
    FeatureFlag,
    /// Matched only the generic change-verb check.
    Other,
    /// Registered at runtime.
    Custom(String),
}

impl ChangeCategory {
    /// Built-in categories in classification order.
    pub const BUILTIN: [ChangeCategory; 9] = [
        Self::Deployment,
        Self::Config,
        Self::Iam,
        Self::Scaling,
        Self::Network,
        Self::Secret,
        Self::Database,
        Self::Infrastructure,
        Self::FeatureFlag,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Self::Deployment => "deployment",
            Self::Config => "config",
            Self::Iam => "iam",
            Self::Scaling => "scaling",
            Self::Network => "network",
            Self::Secret => "secret",
            Self::Database => "database",
            Self::Infrastructure => "infrastructure",
            Self::FeatureFlag => "feature_flag",
            Self::Other => "other",
            Self::Custom(name) => name,
        }
    }
}

impl From<String> for ChangeCategory {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "deployment" | "deploy" => Self::Deployment,
            "config" | "configuration" => Self::Config,
            "iam" => Self::Iam,
            "scaling" => Self::Scaling,
            "network" => Self::Network,
            "secret" | "secrets" => Self::Secret,
            "database" | "db" => Self::Database,
            "infrastructure" | "infra" => Self::Infrastructure,
            "feature_flag" | "featureflag" => Self::FeatureFlag,
            "other" => Self::Other,
            _ => Self::Custom(value.trim().to_string()),
        }
    }
}

impl From<ChangeCategory> for String {
    fn from(value: ChangeCategory) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ChangeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskTier {
    pub fn is_high_or_worse(self) -> bool {
        self >= Self::High
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One classified change, scored against a single incident instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigChange {
    pub timestamp: DateTime<Utc>,
    pub category: ChangeCategory,
    pub description: String,
    pub service: Option<String>,
    pub user: Option<String>,
    pub resource: Option<String>,
    pub risk: RiskTier,
    /// In `[0, 1]`.
    pub correlation: f64,
}

impl ConfigChange {
    pub fn is_before(&self, incident: DateTime<Utc>) -> bool {
        self.timestamp <= incident
    }
}

const BEFORE_WINDOWS: &[(&str, i64)] = &[
    ("5m", 5),
    ("15m", 15),
    ("30m", 30),
    ("1h", 60),
    ("2h", 120),
    ("6h", 360),
];
const AFTER_WINDOWS: &[(&str, i64)] = &[("5m", 5), ("15m", 15), ("30m", 30)];

/// Asymmetric window around an incident instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationWindow {
    pub incident: DateTime<Utc>,
    pub before: Duration,
    pub after: Duration,
}

impl CorrelationWindow {
    pub const DEFAULT_BEFORE: &'static str = "1h";
    pub const DEFAULT_AFTER: &'static str = "15m";

    pub fn new(incident: DateTime<Utc>, before: Duration, after: Duration) -> Self {
        Self {
            incident,
            before,
            after,
        }
    }

    /// Build from the accepted textual window sizes.
    pub fn parse(incident: DateTime<Utc>, before: Option<&str>, after: Option<&str>) -> DomainResult<Self> {
        let before = lookup_window(
            before.unwrap_or(Self::DEFAULT_BEFORE),
            BEFORE_WINDOWS,
            "before",
            "5m, 15m, 30m, 1h, 2h, 6h",
        )?;
        let after = lookup_window(
            after.unwrap_or(Self::DEFAULT_AFTER),
            AFTER_WINDOWS,
            "after",
            "5m, 15m, 30m",
        )?;
        Ok(Self::new(incident, before, after))
    }

    pub fn time_window(&self) -> TimeWindow {
        TimeWindow::new(self.incident - self.before, self.incident + self.after)
    }

    /// Proximity half-life used by the correlation score.
    pub fn half_life(&self) -> Duration {
        self.before / 4
    }
}

fn lookup_window(
    value: &str,
    table: &[(&str, i64)],
    kind: &'static str,
    allowed: &'static str,
) -> DomainResult<Duration> {
    let needle = value.trim().to_ascii_lowercase();
    table
        .iter()
        .find(|(label, _)| *label == needle)
        .map(|(_, minutes)| Duration::minutes(*minutes))
        .ok_or_else(|| DomainError::InvalidWindow {
            kind,
            value: value.to_string(),
            allowed,
        })
}

/// Caller-supplied parameters of a change correlation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeCorrelationRequest {
    pub incident_time: String,
    pub window_before: Option<String>,
    pub window_after: Option<String>,
    pub service: Option<String>,
    pub category: Option<String>,
}

impl ChangeCorrelationRequest {
    pub fn new(incident_time: impl Into<String>) -> Self {
        Self {
            incident_time: incident_time.into(),
            ..Default::default()
        }
    }
}

/// Result of correlating an incident with the surrounding changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeCorrelationReport {
    pub incident: DateTime<Utc>,
    pub window: TimeWindow,
    pub total_changes: usize,
    pub high_risk_changes: usize,
    pub likely_trigger: Option<ConfigChange>,
    pub confidence: f64,
    pub recommendation: String,
    /// Chronological, truncated to the display limit.
    pub changes: Vec<ConfigChange>,
    pub omitted_changes: usize,
    /// Set when the change query itself failed.
    pub query_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_window_defaults() {
        let incident = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let window = CorrelationWindow::parse(incident, None, None).unwrap();
        assert_eq!(window.before, Duration::hours(1));
        assert_eq!(window.after, Duration::minutes(15));
        assert_eq!(window.half_life(), Duration::minutes(15));

        let tw = window.time_window();
        assert_eq!(tw.start, incident - Duration::hours(1));
        assert_eq!(tw.end, incident + Duration::minutes(15));
    }

    #[test]
    fn test_window_rejects_unsupported_values() {
        let incident = Utc::now();
        assert!(matches!(
            CorrelationWindow::parse(incident, Some("3h"), None),
            Err(DomainError::InvalidWindow { kind: "before", .. })
        ));
        assert!(matches!(
            CorrelationWindow::parse(incident, None, Some("1h")),
            Err(DomainError::InvalidWindow { kind: "after", .. })
        ));
    }

    #[test]
    fn test_category_round_trips_through_string() {
        assert_eq!(ChangeCategory::from("feature-flag".to_string()), ChangeCategory::FeatureFlag);
        assert_eq!(
            ChangeCategory::from("kafka".to_string()),
            ChangeCategory::Custom("kafka".to_string())
        );
        let json = serde_json::to_string(&ChangeCategory::Iam).unwrap();
        assert_eq!(json, "\"iam\"");
    }
}
