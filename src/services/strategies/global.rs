//! Global strategy: system-wide error survey with no scoping hints.

use super::analysis::{
    continuation_actions, error_group_findings, recurring_findings, root_cause_finding,
    spike_findings, summarize, widen_window_action,
};
use super::{service_errors_query, QueryStrategy};
use crate::domain::models::{
    distinct_services, ActionKind, AnalysisThresholds, EvidenceSummary, ExecutedQuery, Finding,
    FindingKind, InvestigationContext, InvestigationMode, NextAction, QueryPlan,
};
use crate::services::log_clustering::LogClusterer;

pub const ERROR_RATE_BY_SERVICE: &str = "error_rate_by_service";
pub const ERROR_TIMELINE: &str = "error_timeline";
pub const CRITICAL_SAMPLE: &str = "critical_sample";

pub struct GlobalStrategy {
    clusterer: LogClusterer,
    thresholds: AnalysisThresholds,
}

impl GlobalStrategy {
    pub fn new(clusterer: LogClusterer, thresholds: AnalysisThresholds) -> Self {
        Self {
            clusterer,
            thresholds,
        }
    }
}

impl QueryStrategy for GlobalStrategy {
    fn mode(&self) -> InvestigationMode {
        InvestigationMode::Global
    }

    fn initial_queries(&self, _ctx: &InvestigationContext) -> Vec<QueryPlan> {
        vec![
            QueryPlan::new(
                ERROR_RATE_BY_SERVICE,
                "Error rate by service",
                "source logs | filter $m.severity >= ERROR \
                 | groupby $l.applicationname as service aggregate count() as error_count \
                 | orderby error_count desc | limit 50",
            )
            .with_priority(1),
            QueryPlan::new(
                ERROR_TIMELINE,
                "Error timeline",
                "source logs | filter $m.severity >= ERROR \
                 | groupby roundTime($m.timestamp, 1m) as bucket aggregate count() as error_count \
                 | orderby bucket",
            )
            .with_priority(2)
            .depends_on(ERROR_RATE_BY_SERVICE),
            QueryPlan::new(
                CRITICAL_SAMPLE,
                "Critical event sample",
                "source logs | filter $m.severity >= CRITICAL | orderby $m.timestamp | limit 100",
            )
            .with_priority(3),
        ]
    }

    fn analyze_results(
        &self,
        ctx: &InvestigationContext,
        plan: &QueryPlan,
        executed: &ExecutedQuery,
    ) -> Vec<Finding> {
        match plan.id.as_str() {
            ERROR_RATE_BY_SERVICE => error_group_findings(
                &executed.events,
                &plan.id,
                &self.thresholds,
                |e| e.service.clone(),
                None,
            ),
            ERROR_TIMELINE => spike_findings(&executed.events, &plan.id, &self.thresholds),
            CRITICAL_SAMPLE => {
                let clusters = self.clusterer.cluster(&executed.events, ctx.tenant.as_deref());
                let mut findings = recurring_findings(&clusters, &plan.id, &self.thresholds);
                findings.extend(root_cause_finding(&clusters, &plan.id));
                findings
            }
            _ => Vec::new(),
        }
    }

    fn suggest_next_actions(&self, ctx: &InvestigationContext) -> Vec<NextAction> {
        if ctx.findings.is_empty() {
            let mut actions = vec![widen_window_action(ctx)];
            actions.extend(continuation_actions(ctx));
            return actions;
        }

        let mut actions = Vec::new();
        let errored = ctx.findings.iter().filter(|f| f.kind == FindingKind::Error);
        for service in distinct_services(errored) {
            actions.push(
                NextAction::new(
                    1,
                    ActionKind::DrillDown,
                    format!("Investigate {service} in component mode"),
                    format!("{service} reported errors above the threshold"),
                )
                .with_query(service_errors_query(&service, 200)),
            );
        }

        for spike in ctx.findings.iter().filter(|f| f.kind == FindingKind::Spike) {
            let from = spike.timestamp - chrono::Duration::minutes(5);
            let to = spike.timestamp + chrono::Duration::minutes(5);
            actions.push(
                NextAction::new(
                    2,
                    ActionKind::Inspect,
                    format!("Inspect the error spike at {}", spike.timestamp.format("%H:%M")),
                    spike.summary.clone(),
                )
                .with_query(format!(
                    "source logs | filter $m.timestamp >= timestamp('{}') && $m.timestamp < timestamp('{}') \
                     && $m.severity >= ERROR | limit 200",
                    from.to_rfc3339(),
                    to.to_rfc3339()
                )),
            );
        }

        if let Some(root) = ctx.findings.iter().find(|f| f.kind == FindingKind::RootCause) {
            actions.push(NextAction::new(
                2,
                ActionKind::Inspect,
                "Confirm the suspected root cause against recent changes",
                root.summary.clone(),
            ));
        }

        actions.extend(continuation_actions(ctx));
        actions
    }

    fn synthesize_evidence(&self, ctx: &InvestigationContext) -> EvidenceSummary {
        summarize(ctx, &self.thresholds, |pool| {
            let services = distinct_services(pool).len();
            let spikes = pool.iter().filter(|f| f.kind == FindingKind::Spike).count();
            let mut impact = format!("{} significant findings across {services} services", pool.len());
            if spikes > 0 {
                impact.push_str(&format!("; {spikes} error spikes"));
            }
            impact
        })
    }
}
