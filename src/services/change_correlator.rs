//! Change correlation: classify change-shaped events and score how closely
//! each one precedes an incident.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use super::pattern_registry::{PatternRegistry, PatternTables};
use crate::domain::models::{
    ChangeCategory, ChangeCorrelationReport, ConfigChange, CorrelationWindow, LogEvent,
};

/// Rows shown in a correlation report.
pub const MAX_DISPLAYED_CHANGES: usize = 15;

/// Score of any change made after the incident.
pub const POST_INCIDENT_SCORE: f64 = 0.3;

const DESCRIPTION_FIELDS: &[&str] = &["description", "event_name", "eventName", "action", "operation"];
const USER_FIELDS: &[&str] = &["user", "username", "user_name", "actor", "principal", "initiated_by"];
const RESOURCE_FIELDS: &[&str] = &["resource", "resource_name", "resourceName", "target", "object"];

fn first_field(event: &LogEvent, names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| event.field_str(name))
        .filter(|v| !v.trim().is_empty())
}

/// Text describing the change an event records.
pub fn extract_message(event: &LogEvent) -> Option<String> {
    event
        .message
        .clone()
        .filter(|m| !m.trim().is_empty())
        .or_else(|| first_field(event, DESCRIPTION_FIELDS))
}

/// Temporal correlation of a change with the incident, in `[0, 1]`.
///
/// Changes strictly after the incident get a flat [`POST_INCIDENT_SCORE`].
/// Changes at or before it decay hyperbolically with distance:
/// `1 / (1 + |dt| / half_life)`.
pub fn correlation_score(change_at: DateTime<Utc>, window: &CorrelationWindow) -> f64 {
    if change_at > window.incident {
        return POST_INCIDENT_SCORE;
    }
    let half_life = window.half_life().num_milliseconds().max(1) as f64;
    let distance = (window.incident - change_at).num_milliseconds().abs() as f64;
    1.0 / (1.0 + distance / half_life)
}

/// Confidence that the trigger explains the incident.
pub fn confidence(changes: &[ConfigChange], trigger: Option<&ConfigChange>) -> f64 {
    let mut confidence = 0.0;
    if changes.iter().any(|c| c.risk.is_high_or_worse()) {
        confidence += 0.3;
    }
    if let Some(trigger) = trigger {
        confidence += 0.5 * trigger.correlation;
    }
    if changes.len() <= 5 {
        confidence += 0.2;
    }
    f64::min(confidence, 1.0)
}

/// Recommendation for the given outcome.
pub fn recommendation(changes: &[ConfigChange], trigger: Option<&ConfigChange>) -> String {
    let Some(trigger) = trigger else {
        if changes.is_empty() {
            return "No configuration, deployment, or IAM changes were found in the window; \
                    widen the window or look for non-change causes such as load or dependency failures."
                .to_string();
        }
        return format!(
            "No change preceded the incident within the window; review the {} changes \
             chronologically, starting with the highest risk.",
            changes.len()
        );
    };

    let what = &trigger.description;
    match &trigger.category {
        ChangeCategory::Deployment => format!(
            "Roll back the deployment '{what}' or compare the new release's error rate with the previous version."
        ),
        ChangeCategory::Config => {
            "Revert the configuration change and verify the previous values restore service.".to_string()
        }
        ChangeCategory::Iam => {
            "Review the IAM change and restore the previous policy if access errors started after it.".to_string()
        }
        ChangeCategory::Scaling => {
            "Check whether the scaling event left capacity short and restore the previous replica count.".to_string()
        }
        ChangeCategory::Network => {
            "Verify connectivity across the changed network path and revert it if traffic is blocked.".to_string()
        }
        ChangeCategory::Secret => {
            "Confirm every consumer picked up the rotated secret; restore the previous credential if authentication fails."
                .to_string()
        }
        ChangeCategory::Database => {
            "Inspect the migration or schema change for locking or incompatibility and roll it back if queries fail."
                .to_string()
        }
        ChangeCategory::Infrastructure => {
            "Check the health of the changed infrastructure and roll back the stack update if needed.".to_string()
        }
        ChangeCategory::FeatureFlag => {
            "Disable the feature flag and watch whether errors subside.".to_string()
        }
        ChangeCategory::Other | ChangeCategory::Custom(_) => format!(
            "Review the change '{what}' made at {} and revert it if errors began afterwards.",
            trigger.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        ),
    }
}

/// Broad keyword-OR query for change-shaped events, optionally scoped to a
/// service.
pub fn change_query(tables: &PatternTables, service: Option<&str>) -> String {
    let terms = tables
        .search_terms()
        .iter()
        .map(|term| format!("$d.message ~ {}", super::strategies::quote(term)))
        .collect::<Vec<_>>()
        .join(" || ");
    let scope = service
        .map(|s| format!(" && {}", super::strategies::service_filter(s)))
        .unwrap_or_default();
    format!("source logs | filter ({terms}){scope} | orderby $m.timestamp | limit 1000")
}

/// Classifies change events against the shared registry.
#[derive(Debug, Clone)]
pub struct ChangeCorrelator {
    registry: Arc<PatternRegistry>,
}

impl ChangeCorrelator {
    pub fn new(registry: Arc<PatternRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<PatternRegistry> {
        &self.registry
    }

    /// Classify one event. `None` when it has no timestamp, falls outside
    /// the window, or is not change-shaped.
    pub fn classify(
        &self,
        tables: &PatternTables,
        event: &LogEvent,
        window: &CorrelationWindow,
    ) -> Option<ConfigChange> {
        let timestamp = event.timestamp?;
        if !window.time_window().contains(timestamp) {
            return None;
        }
        let message = extract_message(event)?;
        let category = tables.classify_category(&message)?;
        let risk = tables.classify_risk(&message);

        Some(ConfigChange {
            timestamp,
            category,
            risk,
            service: event.service.clone(),
            user: first_field(event, USER_FIELDS),
            resource: first_field(event, RESOURCE_FIELDS),
            correlation: correlation_score(timestamp, window),
            description: message,
        })
    }

    /// Correlate a pre-filtered event batch with the incident.
    #[instrument(skip(self, events), fields(events = events.len(), incident = %window.incident))]
    pub fn correlate(
        &self,
        window: &CorrelationWindow,
        events: &[LogEvent],
        category_filter: Option<&ChangeCategory>,
    ) -> ChangeCorrelationReport {
        let tables = self.registry.snapshot();

        let mut changes: Vec<ConfigChange> = events
            .iter()
            .filter_map(|event| self.classify(&tables, event, window))
            .filter(|change| category_filter.map_or(true, |c| change.category == *c))
            .collect();
        changes.sort_by_key(|c| c.timestamp);

        let trigger = changes
            .iter()
            .filter(|c| c.is_before(window.incident))
            .fold(None::<&ConfigChange>, |best, change| match best {
                Some(b) if b.correlation > change.correlation => Some(b),
                Some(b) if b.correlation == change.correlation && b.risk >= change.risk => Some(b),
                _ => Some(change),
            })
            .cloned();

        let high_risk_changes = changes.iter().filter(|c| c.risk.is_high_or_worse()).count();
        let confidence = confidence(&changes, trigger.as_ref());
        let recommendation = recommendation(&changes, trigger.as_ref());
        let total_changes = changes.len();
        debug!(
            total_changes,
            high_risk_changes,
            trigger = trigger.as_ref().map(|t| t.category.as_str()),
            confidence,
            "Correlated changes"
        );

        let omitted_changes = total_changes.saturating_sub(MAX_DISPLAYED_CHANGES);
        changes.truncate(MAX_DISPLAYED_CHANGES);

        ChangeCorrelationReport {
            incident: window.incident,
            window: window.time_window(),
            total_changes,
            high_risk_changes,
            likely_trigger: trigger,
            confidence,
            recommendation,
            changes,
            omitted_changes,
            query_error: None,
        }
    }
}
