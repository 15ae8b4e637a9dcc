//! Component strategy: deep dive into one target service.

use super::analysis::{
    continuation_actions, error_group_findings, recurring_findings, root_cause_finding, row_count,
    severity_for_count, summarize, widen_window_action,
};
use super::{quote, service_errors_query, service_filter, QueryStrategy};
use crate::domain::models::{
    ActionKind, AnalysisThresholds, EvidenceSummary, ExecutedQuery, Finding, FindingKind,
    InvestigationContext, InvestigationMode, NextAction, QueryPlan,
};
use crate::services::log_clustering::LogClusterer;

pub const COMPONENT_ERRORS: &str = "component_errors";
pub const COMPONENT_PATTERNS: &str = "component_patterns";
pub const COMPONENT_SUBSYSTEMS: &str = "component_subsystems";
pub const COMPONENT_DEPENDENCIES: &str = "component_dependencies";

/// Connectivity keywords scanned for dependency failures.
const DEPENDENCY_KEYWORDS: &[&str] = &[
    "connection refused",
    "connection reset",
    "timeout",
    "unavailable",
    "no route to host",
    "dns",
];

pub struct ComponentStrategy {
    clusterer: LogClusterer,
    thresholds: AnalysisThresholds,
}

impl ComponentStrategy {
    pub fn new(clusterer: LogClusterer, thresholds: AnalysisThresholds) -> Self {
        Self {
            clusterer,
            thresholds,
        }
    }

    fn dependency_findings(&self, service: &str, executed: &ExecutedQuery) -> Option<Finding> {
        let hits: Vec<_> = executed
            .events
            .iter()
            .filter(|e| e.mentions_any(DEPENDENCY_KEYWORDS))
            .collect();
        let first = hits.first()?;
        let count = hits.len() as u64;
        let mut finding = Finding::new(
            FindingKind::Dependency,
            severity_for_count(count, &self.thresholds),
            format!("{service}: {count} dependency or connectivity errors"),
            &executed.id,
        )
        .with_service(service)
        .with_evidence(first.text())
        .with_confidence(if count >= self.thresholds.recurring_min as u64 { 0.75 } else { 0.5 });
        if let Some(ts) = hits.iter().filter_map(|e| e.timestamp).min() {
            finding = finding.at(ts);
        }
        Some(finding)
    }

    fn pattern_findings(&self, service: &str, executed: &ExecutedQuery) -> Vec<Finding> {
        executed
            .events
            .iter()
            .filter_map(|row| {
                let template = row.field_str("template").or_else(|| row.message.clone())?;
                let count = row_count(row)?;
                (count >= self.thresholds.recurring_min as u64).then(|| {
                    Finding::new(
                        FindingKind::Recurring,
                        severity_for_count(count, &self.thresholds),
                        format!("Recurring error ({count}x): {template}"),
                        &executed.id,
                    )
                    .with_service(service)
                    .with_confidence(0.7)
                })
            })
            .collect()
    }
}

impl QueryStrategy for ComponentStrategy {
    fn mode(&self) -> InvestigationMode {
        InvestigationMode::Component
    }

    fn initial_queries(&self, ctx: &InvestigationContext) -> Vec<QueryPlan> {
        let Some(service) = ctx.target_service.as_deref() else {
            return Vec::new();
        };
        let scope = service_filter(service);
        let keyword_scan = DEPENDENCY_KEYWORDS
            .iter()
            .map(|k| format!("$d.message ~ {}", quote(k)))
            .collect::<Vec<_>>()
            .join(" || ");

        vec![
            QueryPlan::new(
                COMPONENT_ERRORS,
                format!("All errors in {service}"),
                service_errors_query(service, 200),
            )
            .with_priority(1),
            QueryPlan::new(
                COMPONENT_PATTERNS,
                format!("Error patterns in {service}"),
                format!(
                    "source logs | filter {scope} && $m.severity >= ERROR \
                     | groupby $d.message as template aggregate count() as error_count \
                     | orderby error_count desc | limit 20"
                ),
            )
            .with_priority(2)
            .depends_on(COMPONENT_ERRORS),
            QueryPlan::new(
                COMPONENT_SUBSYSTEMS,
                format!("Subsystem error distribution in {service}"),
                format!(
                    "source logs | filter {scope} && $m.severity >= ERROR \
                     | groupby $l.subsystemname as subsystem aggregate count() as error_count \
                     | orderby error_count desc"
                ),
            )
            .with_priority(3),
            QueryPlan::new(
                COMPONENT_DEPENDENCIES,
                format!("Dependency and connectivity errors in {service}"),
                format!("source logs | filter {scope} && ({keyword_scan}) | limit 100"),
            )
            .with_priority(4),
        ]
    }

    fn analyze_results(
        &self,
        ctx: &InvestigationContext,
        plan: &QueryPlan,
        executed: &ExecutedQuery,
    ) -> Vec<Finding> {
        let Some(service) = ctx.target_service.as_deref() else {
            return Vec::new();
        };

        match plan.id.as_str() {
            COMPONENT_ERRORS => {
                let clusters = self.clusterer.cluster(&executed.events, ctx.tenant.as_deref());
                let mut findings = Vec::new();
                let total = executed.events.len() as u64;
                if total > self.thresholds.group_error_threshold {
                    findings.push(
                        Finding::new(
                            FindingKind::Error,
                            severity_for_count(total, &self.thresholds),
                            format!("{service}: {total} errors in window"),
                            &plan.id,
                        )
                        .with_service(service)
                        .with_confidence(0.8),
                    );
                }
                findings.extend(recurring_findings(&clusters, &plan.id, &self.thresholds));
                findings.extend(root_cause_finding(&clusters, &plan.id));
                findings
            }
            COMPONENT_PATTERNS => self.pattern_findings(service, executed),
            COMPONENT_SUBSYSTEMS => error_group_findings(
                &executed.events,
                &plan.id,
                &self.thresholds,
                |e| e.subsystem.as_ref().map(|s| format!("{service}/{s}")),
                Some(service),
            ),
            COMPONENT_DEPENDENCIES => self.dependency_findings(service, executed).into_iter().collect(),
            _ => Vec::new(),
        }
    }

    fn suggest_next_actions(&self, ctx: &InvestigationContext) -> Vec<NextAction> {
        let service = ctx.target_service.as_deref().unwrap_or("the service");
        if ctx.findings.is_empty() {
            let mut actions = vec![widen_window_action(ctx)];
            actions.push(
                NextAction::new(
                    3,
                    ActionKind::Query,
                    format!("Check warnings in {service}"),
                    "No error-level events were found; degradations may log at warning level",
                )
                .with_query(format!(
                    "source logs | filter {} && $m.severity == WARNING | limit 100",
                    service_filter(service)
                )),
            );
            actions.extend(continuation_actions(ctx));
            return actions;
        }

        let mut actions = Vec::new();

        if ctx.findings.iter().any(|f| f.kind == FindingKind::Dependency) {
            actions.push(NextAction::new(
                1,
                ActionKind::Inspect,
                format!("Check health of downstream dependencies of {service}"),
                "Connectivity errors point at a failing dependency",
            ));
        }

        for finding in ctx.findings.iter().filter(|f| f.query_id == COMPONENT_SUBSYSTEMS) {
            if let Some((_, subsystem)) = finding.summary.split_once(':').and_then(|(l, _)| l.split_once('/')) {
                actions.push(
                    NextAction::new(
                        2,
                        ActionKind::DrillDown,
                        format!("Drill into subsystem {subsystem} of {service}"),
                        finding.summary.clone(),
                    )
                    .with_query(format!(
                        "source logs | filter {} && $l.subsystemname == {} && $m.severity >= ERROR | limit 200",
                        service_filter(service),
                        quote(subsystem)
                    )),
                );
            }
        }

        if ctx.findings.iter().any(|f| f.kind == FindingKind::RootCause) {
            actions.push(NextAction::new(
                2,
                ActionKind::Query,
                format!("Correlate {service} errors with recent changes"),
                "A fundamental cause was identified; check what changed before it appeared",
            ));
        }

        actions.push(
            NextAction::new(
                3,
                ActionKind::Query,
                format!("Check upstream callers of {service} for correlated errors"),
                "Callers surface the user-facing impact of this component",
            )
            .with_query(format!(
                "source logs | filter $d.message ~ {} && $m.severity >= ERROR \
                 | groupby $l.applicationname aggregate count() as error_count",
                quote(service)
            )),
        );

        actions.extend(continuation_actions(ctx));
        actions
    }

    fn synthesize_evidence(&self, ctx: &InvestigationContext) -> EvidenceSummary {
        let service = ctx.target_service.clone().unwrap_or_default();
        summarize(ctx, &self.thresholds, |pool| {
            let dependency = pool.iter().any(|f| f.kind == FindingKind::Dependency);
            format!(
                "{} significant findings in {service}{}",
                pool.len(),
                if dependency { "; dependency failures observed" } else { "" }
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{CacheConfig, LogEvent, LogSeverity, Severity, TimeWindow};
    use crate::services::cluster_cache::ClusterCache;
    use chrono::{Duration, Utc};
    use serde_json::json;
    use std::sync::Arc;

    fn strategy() -> ComponentStrategy {
        ComponentStrategy::new(
            LogClusterer::new(Arc::new(ClusterCache::new(&CacheConfig::default()))),
            AnalysisThresholds::default(),
        )
    }

    fn ctx() -> InvestigationContext {
        let mut ctx = InvestigationContext::new(
            InvestigationMode::Component,
            TimeWindow::last(Duration::hours(1), Utc::now()),
        );
        ctx.target_service = Some("payments".to_string());
        ctx
    }

    fn executed(id: &str, events: Vec<LogEvent>) -> ExecutedQuery {
        ExecutedQuery {
            id: id.to_string(),
            purpose: id.to_string(),
            query: String::new(),
            duration: std::time::Duration::from_millis(5),
            error: None,
            events,
            next_cursor: None,
        }
    }

    #[test]
    fn test_plans_are_scoped_to_target_service() {
        let plans = strategy().initial_queries(&ctx());
        assert_eq!(plans.len(), 4);
        assert!(plans
            .iter()
            .all(|p| p.query.contains("$l.applicationname == 'payments'")));
        assert!(plans[3].query.contains("$d.message ~ 'connection refused'"));
    }

    #[test]
    fn test_no_plans_without_service() {
        let mut ctx = ctx();
        ctx.target_service = None;
        assert!(strategy().initial_queries(&ctx).is_empty());
    }

    #[test]
    fn test_subsystem_rows() {
        let strategy = strategy();
        let plans = strategy.initial_queries(&ctx());
        let rows = vec![
            LogEvent::from_fields(json!({"subsystem": "ledger", "error_count": 55}).as_object().cloned().unwrap()),
            LogEvent::from_fields(json!({"subsystem": "api", "error_count": 4}).as_object().cloned().unwrap()),
        ];
        let findings = strategy.analyze_results(&ctx(), &plans[2], &executed(COMPONENT_SUBSYSTEMS, rows));
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].summary, "payments/ledger: 55 errors in window");
        assert_eq!(findings[0].severity, Severity::High);
        assert_eq!(findings[0].service.as_deref(), Some("payments"));

        let mut ctx = ctx();
        ctx.findings = findings;
        let actions = strategy.suggest_next_actions(&ctx);
        assert!(actions.iter().any(|a| a.description == "Drill into subsystem ledger of payments"));
    }

    #[test]
    fn test_dependency_scan() {
        let strategy = strategy();
        let plans = strategy.initial_queries(&ctx());
        let now = Utc::now();
        let events = vec![
            LogEvent::message(now, LogSeverity::Error, "payments", "dial tcp 10.0.0.4:5432: connection refused"),
            LogEvent::message(now, LogSeverity::Error, "payments", "ledger unavailable"),
        ];
        let findings = strategy.analyze_results(&ctx(), &plans[3], &executed(COMPONENT_DEPENDENCIES, events));
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::Dependency);
        assert!(findings[0].summary.contains("2 dependency"));

        let mut ctx = ctx();
        ctx.findings = findings;
        let actions = strategy.suggest_next_actions(&ctx);
        assert_eq!(actions[0].description, "Check health of downstream dependencies of payments");
    }

    #[test]
    fn test_pattern_rows_become_recurring_findings() {
        let strategy = strategy();
        let plans = strategy.initial_queries(&ctx());
        let rows = vec![LogEvent::from_fields(
            json!({"template": "card declined", "error_count": 7}).as_object().cloned().unwrap(),
        )];
        let findings = strategy.analyze_results(&ctx(), &plans[1], &executed(COMPONENT_PATTERNS, rows));
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::Recurring);
    }
}
