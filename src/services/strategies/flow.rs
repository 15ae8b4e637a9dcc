//! Flow strategy: follow one request across services by trace or
//! correlation id.

use super::analysis::{continuation_actions, insert_filter, summarize, widen_window_action};
use super::{quote, service_errors_query, QueryStrategy};
use crate::domain::models::{
    ActionKind, AnalysisThresholds, EvidenceSummary, ExecutedQuery, Finding, FindingKind,
    InvestigationContext, InvestigationMode, LogEvent, LogSeverity, NextAction, QueryPlan,
    Severity,
};
use crate::services::log_clustering::LogClusterer;

pub const FLOW_TRACE: &str = "flow_trace";

/// Ordered walk of one request's events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowWalk {
    /// Services in first-seen order, up to and including the first failing hop.
    pub chain: Vec<String>,
    /// Index of the first error-or-worse event in the ordered events.
    pub first_failure: Option<usize>,
}

/// Sort events by timestamp (undated last, stable) and walk them.
pub fn walk_flow(events: &[LogEvent]) -> (Vec<&LogEvent>, FlowWalk) {
    let mut ordered: Vec<&LogEvent> = events.iter().collect();
    ordered.sort_by_key(|e| (e.timestamp.is_none(), e.timestamp));

    let mut chain: Vec<String> = Vec::new();
    let mut first_failure = None;
    for (idx, event) in ordered.iter().enumerate() {
        if first_failure.is_some() {
            break;
        }
        if let Some(service) = &event.service {
            if !chain.contains(service) {
                chain.push(service.clone());
            }
        }
        if event.severity.is_some_and(LogSeverity::is_error) {
            first_failure = Some(idx);
        }
    }
    (ordered, FlowWalk { chain, first_failure })
}

pub struct FlowStrategy {
    clusterer: LogClusterer,
    thresholds: AnalysisThresholds,
}

impl FlowStrategy {
    pub fn new(clusterer: LogClusterer, thresholds: AnalysisThresholds) -> Self {
        Self {
            clusterer,
            thresholds,
        }
    }

    /// Identifier filter, trace id preferred.
    fn identifier(ctx: &InvestigationContext) -> Option<(&'static str, &str)> {
        ctx.trace_id
            .as_deref()
            .map(|id| ("$d.trace_id", id))
            .or_else(|| ctx.correlation_id.as_deref().map(|id| ("$d.correlation_id", id)))
    }
}

impl QueryStrategy for FlowStrategy {
    fn mode(&self) -> InvestigationMode {
        InvestigationMode::Flow
    }

    fn initial_queries(&self, ctx: &InvestigationContext) -> Vec<QueryPlan> {
        let Some((field, id)) = Self::identifier(ctx) else {
            return Vec::new();
        };
        vec![QueryPlan::new(
            FLOW_TRACE,
            format!("Request flow for {id}"),
            format!(
                "source logs | filter {field} == {} | orderby $m.timestamp asc | limit 500",
                quote(id)
            ),
        )
        .with_priority(1)]
    }

    fn analyze_results(
        &self,
        ctx: &InvestigationContext,
        plan: &QueryPlan,
        executed: &ExecutedQuery,
    ) -> Vec<Finding> {
        if plan.id != FLOW_TRACE {
            return Vec::new();
        }
        let (ordered, walk) = walk_flow(&executed.events);
        let Some(idx) = walk.first_failure else {
            return Vec::new();
        };

        let failing = ordered[idx];
        let service = failing.service.clone().unwrap_or_else(|| "unknown".to_string());
        let severity = if failing.severity == Some(LogSeverity::Critical) {
            Severity::Critical
        } else {
            Severity::High
        };

        let mut finding = Finding::new(
            FindingKind::FlowBreak,
            severity,
            format!("Flow broke at {service}: {}", failing.text()),
            &plan.id,
        )
        .with_service(service)
        .with_evidence(format!("chain: {}", walk.chain.join(" -> ")))
        .with_confidence(0.85);
        if let Some(ts) = failing.timestamp {
            finding = finding.at(ts);
        }

        let tail: Vec<LogEvent> = ordered[idx..].iter().map(|e| (*e).clone()).collect();
        let clusters = self.clusterer.cluster(&tail, ctx.tenant.as_deref());
        let repeated = clusters
            .iter()
            .find(|c| c.count >= self.thresholds.recurring_min && c.is_error());

        let mut findings = vec![finding];
        if let Some(cluster) = repeated {
            findings.push(
                Finding::new(
                    FindingKind::Recurring,
                    Severity::Medium,
                    format!("Failure repeated {}x after the break: {}", cluster.count, cluster.template),
                    &plan.id,
                )
                .with_confidence(0.6),
            );
        }
        findings
    }

    fn suggest_next_actions(&self, ctx: &InvestigationContext) -> Vec<NextAction> {
        let id = Self::identifier(ctx).map_or("the request", |(_, id)| id);
        let flow_events: Vec<LogEvent> = ctx
            .history
            .iter()
            .filter(|q| q.id == FLOW_TRACE)
            .flat_map(|q| q.events.iter().cloned())
            .collect();

        let mut actions = Vec::new();
        if flow_events.is_empty() {
            actions.push(widen_window_action(ctx));
            actions.push(NextAction::new(
                2,
                ActionKind::Inspect,
                format!("Verify that {id} is propagated in log fields"),
                "No events carried the identifier",
            ));
            return actions;
        }

        let (ordered, walk) = walk_flow(&flow_events);
        match walk.first_failure {
            Some(idx) => {
                let failing = ordered[idx].service.clone().unwrap_or_else(|| "unknown".to_string());
                actions.push(
                    NextAction::new(
                        1,
                        ActionKind::DrillDown,
                        format!("Investigate {failing} in component mode"),
                        format!("The flow for {id} first failed in {failing}"),
                    )
                    .with_query(service_errors_query(&failing, 200)),
                );
                let position = walk.chain.iter().position(|s| *s == failing);
                if let Some(upstream) = position.and_then(|p| p.checked_sub(1)).map(|p| &walk.chain[p]) {
                    actions.push(NextAction::new(
                        2,
                        ActionKind::Inspect,
                        format!("Check the call from {upstream} to {failing}"),
                        "The hop before the failure shows the request the failing service received",
                    ));
                }
            }
            None => {
                let history_query = ctx
                    .history
                    .iter()
                    .find(|q| q.id == FLOW_TRACE)
                    .map(|q| q.query.clone())
                    .unwrap_or_default();
                actions.push(
                    NextAction::new(
                        3,
                        ActionKind::Query,
                        format!("Search for warnings along the flow of {id}"),
                        "The flow completed without error-level events",
                    )
                    .with_query(insert_filter(&history_query, "$m.severity >= WARNING")),
                );
            }
        }

        actions.extend(continuation_actions(ctx));
        actions
    }

    fn synthesize_evidence(&self, ctx: &InvestigationContext) -> EvidenceSummary {
        summarize(ctx, &self.thresholds, |pool| {
            pool.iter()
                .find(|f| f.kind == FindingKind::FlowBreak)
                .and_then(|f| f.evidence.as_deref())
                .map(|e| e.trim_start_matches("chain: ").to_string())
                .map_or_else(
                    || format!("{} significant findings along the flow", pool.len()),
                    |chain| format!("Request failed after traversing {chain}"),
                )
        })
    }
}
