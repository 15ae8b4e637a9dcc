//! Investigation domain model: modes, findings, actions, and the per-run context.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::procedure::{RemediationAsset, StandardProcedure};
use super::query::{ExecutedQuery, TimeWindow};
use crate::domain::errors::{DomainError, DomainResult};

/// Investigation strategy, chosen once per investigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestigationMode {
    /// System-wide scan.
    Global,
    /// Deep-dive into a single service.
    Component,
    /// Cross-service trace of one request.
    Flow,
}

impl InvestigationMode {
    /// Select a mode from the scoping hints. First match wins: any flow
    /// identifier selects `Flow`, a service hint selects `Component`.
    pub fn select(
        target_service: Option<&str>,
        trace_id: Option<&str>,
        correlation_id: Option<&str>,
    ) -> Self {
        if is_present(trace_id) || is_present(correlation_id) {
            Self::Flow
        } else if is_present(target_service) {
            Self::Component
        } else {
            Self::Global
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Component => "component",
            Self::Flow => "flow",
        }
    }
}

impl fmt::Display for InvestigationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InvestigationMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" => Ok(Self::Global),
            "component" => Ok(Self::Component),
            "flow" => Ok(Self::Flow),
            other => Err(DomainError::InvalidInput(format!(
                "unknown investigation mode '{other}' (expected global, component or flow)"
            ))),
        }
    }
}

fn is_present(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

/// Finding severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
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

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    /// Error volume concentrated in one group (service, subsystem).
    Error,
    /// Error volume spike in one time bucket.
    Spike,
    /// The same error template recurring.
    Recurring,
    /// Failing downstream dependency or connectivity.
    Dependency,
    /// Point where a traced request started failing.
    FlowBreak,
    /// Top causal candidate among log clusters.
    RootCause,
}

impl FindingKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Spike => "spike",
            Self::Recurring => "recurring",
            Self::Dependency => "dependency",
            Self::FlowBreak => "flow_break",
            Self::RootCause => "root_cause",
        }
    }
}

/// A discrete observation extracted from query results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub timestamp: DateTime<Utc>,
    pub kind: FindingKind,
    pub severity: Severity,
    pub summary: String,
    pub evidence: Option<String>,
    pub service: Option<String>,
    /// In `[0, 1]`.
    pub confidence: f64,
    pub query_id: String,
}

impl Finding {
    pub fn new(
        kind: FindingKind,
        severity: Severity,
        summary: impl Into<String>,
        query_id: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            severity,
            summary: summary.into(),
            evidence: None,
            service: None,
            confidence: 0.5,
            query_id: query_id.into(),
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence = Some(evidence.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    DrillDown,
    Query,
    Inspect,
    Remediate,
    Escalate,
    WidenWindow,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DrillDown => "drill_down",
            Self::Query => "query",
            Self::Inspect => "inspect",
            Self::Remediate => "remediate",
            Self::Escalate => "escalate",
            Self::WidenWindow => "widen_window",
        }
    }
}

/// Suggested follow-up. Lower priority values run first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextAction {
    pub priority: u8,
    pub kind: ActionKind,
    pub description: String,
    pub rationale: String,
    pub query: Option<String>,
}

impl NextAction {
    pub fn new(
        priority: u8,
        kind: ActionKind,
        description: impl Into<String>,
        rationale: impl Into<String>,
    ) -> Self {
        Self {
            priority,
            kind,
            description: description.into(),
            rationale: rationale.into(),
            query: None,
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }
}

/// Deduplicate by description (first occurrence wins) and stably sort by
/// ascending priority.
pub fn dedupe_and_rank(actions: Vec<NextAction>) -> Vec<NextAction> {
    let mut seen = std::collections::HashSet::new();
    let mut unique: Vec<NextAction> = actions
        .into_iter()
        .filter(|a| seen.insert(a.description.clone()))
        .collect();
    unique.sort_by_key(|a| a.priority);
    unique
}

/// Terminal artifact of an investigation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceSummary {
    pub root_cause: String,
    pub confidence: f64,
    pub affected_services: Vec<String>,
    pub impact: String,
}

/// Caller-supplied parameters of one investigation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvestigationRequest {
    pub time_range: String,
    pub target_service: Option<String>,
    pub trace_id: Option<String>,
    pub correlation_id: Option<String>,
    /// Defaults to the configured value; capped at the hard maximum.
    pub max_queries: Option<usize>,
    pub generate_assets: bool,
    /// Cache scope for clustering results.
    pub tenant: Option<String>,
    /// Force a mode instead of selecting from the hints.
    pub mode: Option<InvestigationMode>,
    /// Absolute deadline applied to every round-trip.
    pub deadline: Option<DateTime<Utc>>,
}

impl InvestigationRequest {
    pub fn new(time_range: impl Into<String>) -> Self {
        Self {
            time_range: time_range.into(),
            ..Default::default()
        }
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.target_service = Some(service.into());
        self
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn with_max_queries(mut self, max_queries: usize) -> Self {
        self.max_queries = Some(max_queries);
        self
    }

    /// Resolve the mode, validating a forced mode against the hints.
    pub fn resolve_mode(&self) -> DomainResult<InvestigationMode> {
        let trace = self.trace_id.as_deref();
        let correlation = self.correlation_id.as_deref();
        let service = self.target_service.as_deref();

        match self.mode {
            Some(InvestigationMode::Flow) if !is_present(trace) && !is_present(correlation) => {
                Err(DomainError::MissingFlowIdentifier)
            }
            Some(InvestigationMode::Component) if !is_present(service) => {
                Err(DomainError::MissingTargetService)
            }
            Some(mode) => Ok(mode),
            None => Ok(InvestigationMode::select(service, trace, correlation)),
        }
    }
}

/// Mutable state of a single investigation, owned by the orchestrator.
#[derive(Debug, Clone)]
pub struct InvestigationContext {
    pub id: Uuid,
    pub mode: InvestigationMode,
    pub window: TimeWindow,
    pub target_service: Option<String>,
    pub trace_id: Option<String>,
    pub correlation_id: Option<String>,
    pub tenant: Option<String>,
    pub findings: Vec<Finding>,
    pub next_actions: Vec<NextAction>,
    pub history: Vec<ExecutedQuery>,
}

impl InvestigationContext {
    pub fn new(mode: InvestigationMode, window: TimeWindow) -> Self {
        Self {
            id: Uuid::new_v4(),
            mode,
            window,
            target_service: None,
            trace_id: None,
            correlation_id: None,
            tenant: None,
            findings: Vec::new(),
            next_actions: Vec::new(),
            history: Vec::new(),
        }
    }

    pub fn from_request(request: &InvestigationRequest, mode: InvestigationMode, window: TimeWindow) -> Self {
        let clean = |v: &Option<String>| v.as_ref().filter(|s| !s.trim().is_empty()).cloned();
        Self {
            target_service: clean(&request.target_service),
            trace_id: clean(&request.trace_id),
            correlation_id: clean(&request.correlation_id),
            tenant: clean(&request.tenant),
            ..Self::new(mode, window)
        }
    }

    /// Findings ranked by severity, then confidence, both descending.
    pub fn ranked_findings(&self) -> Vec<Finding> {
        let mut ranked = self.findings.clone();
        ranked.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then_with(|| b.confidence.total_cmp(&a.confidence))
        });
        ranked
    }

    /// Distinct services named by findings, in first-seen order.
    pub fn affected_services(&self) -> Vec<String> {
        distinct_services(&self.findings)
    }
}

/// Distinct services named by the given findings, in first-seen order.
pub fn distinct_services<'a>(findings: impl IntoIterator<Item = &'a Finding>) -> Vec<String> {
    let mut services: Vec<String> = Vec::new();
    for finding in findings {
        if let Some(service) = &finding.service {
            if !services.contains(service) {
                services.push(service.clone());
            }
        }
    }
    services
}

/// Rendered result of an investigation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestigationReport {
    pub investigation_id: Uuid,
    pub mode: InvestigationMode,
    pub window: TimeWindow,
    pub query_status: Vec<String>,
    pub summary: EvidenceSummary,
    /// Top findings, ranked.
    pub findings: Vec<Finding>,
    /// Findings beyond the displayed ones.
    pub omitted_findings: usize,
    /// Top next actions, ranked.
    pub next_actions: Vec<NextAction>,
    pub assets: Vec<RemediationAsset>,
    pub procedures: Vec<StandardProcedure>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_selection_order() {
        assert_eq!(
            InvestigationMode::select(Some("api"), Some("t-1"), None),
            InvestigationMode::Flow
        );
        assert_eq!(
            InvestigationMode::select(None, None, Some("c-1")),
            InvestigationMode::Flow
        );
        assert_eq!(
            InvestigationMode::select(Some("api"), None, None),
            InvestigationMode::Component
        );
        assert_eq!(InvestigationMode::select(None, None, None), InvestigationMode::Global);
        assert_eq!(
            InvestigationMode::select(Some("  "), Some(""), None),
            InvestigationMode::Global
        );
    }

    #[test]
    fn test_forced_flow_without_identifier_is_rejected() {
        let mut request = InvestigationRequest::new("1h").with_service("api");
        request.mode = Some(InvestigationMode::Flow);
        assert!(matches!(
            request.resolve_mode(),
            Err(DomainError::MissingFlowIdentifier)
        ));
    }

    #[test]
    fn test_forced_component_without_service_is_rejected() {
        let mut request = InvestigationRequest::new("1h");
        request.mode = Some(InvestigationMode::Component);
        assert!(matches!(
            request.resolve_mode(),
            Err(DomainError::MissingTargetService)
        ));
    }

    #[test]
    fn test_dedupe_keeps_first_and_sorts() {
        let actions = vec![
            NextAction::new(3, ActionKind::Query, "b", "r"),
            NextAction::new(1, ActionKind::Query, "a", "r"),
            NextAction::new(0, ActionKind::Query, "b", "duplicate"),
            NextAction::new(2, ActionKind::Query, "c", "r"),
        ];
        let ranked = dedupe_and_rank(actions);
        let descriptions: Vec<_> = ranked.iter().map(|a| a.description.as_str()).collect();
        assert_eq!(descriptions, vec!["a", "c", "b"]);
        assert_eq!(ranked[2].priority, 3);
    }

    #[test]
    fn test_ranked_findings_orders_by_severity_then_confidence() {
        let window = TimeWindow::last(chrono::Duration::hours(1), Utc::now());
        let mut ctx = InvestigationContext::new(InvestigationMode::Global, window);
        ctx.findings.push(Finding::new(FindingKind::Error, Severity::Medium, "m", "q").with_confidence(0.9));
        ctx.findings.push(Finding::new(FindingKind::Error, Severity::High, "h1", "q").with_confidence(0.5));
        ctx.findings.push(Finding::new(FindingKind::Error, Severity::High, "h2", "q").with_confidence(0.8));

        let ranked: Vec<_> = ctx.ranked_findings().into_iter().map(|f| f.summary).collect();
        assert_eq!(ranked, vec!["h2", "h1", "m"]);
    }
}
