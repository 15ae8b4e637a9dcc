//! Standard operating procedures and generated remediation assets.

use serde::{Deserialize, Serialize};

/// Runbook entry linked to a heuristic detector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardProcedure {
    pub id: String,
    pub title: String,
    /// Signature that activates the procedure.
    pub trigger: String,
    pub remediation: String,
    pub escalation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Alert,
    DashboardWidget,
    Runbook,
}

impl AssetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Alert => "alert",
            Self::DashboardWidget => "dashboard_widget",
            Self::Runbook => "runbook",
        }
    }
}

/// Artifact generated from findings to help prevent or detect recurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemediationAsset {
    pub kind: AssetKind,
    pub name: String,
    /// Query text for alerts and widgets, markdown for runbooks.
    pub definition: String,
    pub source_finding: Option<String>,
}
