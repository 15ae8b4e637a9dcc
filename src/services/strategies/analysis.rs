//! Shared result analysis used by every strategy.

use chrono::{DateTime, Utc};

use crate::domain::models::{
    ActionKind, AnalysisThresholds, CauseTag, EvidenceSummary, Finding, FindingKind,
    InvestigationContext, LogCluster, LogEvent, NextAction, Severity,
};
use crate::services::heuristics::rank_root_causes;

const COUNT_FIELDS: &[&str] = &["error_count", "count", "_count", "errors"];

/// Aggregated count carried by a result row.
pub fn row_count(event: &LogEvent) -> Option<u64> {
    COUNT_FIELDS
        .iter()
        .find_map(|name| event.number(name))
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map(|n| n.round() as u64)
}

/// Map an error count onto a finding severity.
pub fn severity_for_count(count: u64, thresholds: &AnalysisThresholds) -> Severity {
    if count >= thresholds.critical_count {
        Severity::Critical
    } else if count >= thresholds.high_count {
        Severity::High
    } else if count >= thresholds.medium_count {
        Severity::Medium
    } else {
        Severity::Low
    }
}

fn count_confidence(count: u64, thresholds: &AnalysisThresholds) -> f64 {
    let critical = thresholds.critical_count.max(1) as f64;
    (0.5 + count as f64 / (2.0 * critical)).min(0.95)
}

/// One error finding per group whose count is above the group threshold.
///
/// `group` extracts the group label from a row; rows without a label or a
/// count are ignored.
pub fn error_group_findings(
    events: &[LogEvent],
    query_id: &str,
    thresholds: &AnalysisThresholds,
    group: impl Fn(&LogEvent) -> Option<String>,
    service: Option<&str>,
) -> Vec<Finding> {
    events
        .iter()
        .filter_map(|event| {
            let label = group(event)?;
            let count = row_count(event)?;
            (count > thresholds.group_error_threshold).then(|| {
                let finding = Finding::new(
                    FindingKind::Error,
                    severity_for_count(count, thresholds),
                    format!("{label}: {count} errors in window"),
                    query_id,
                )
                .with_confidence(count_confidence(count, thresholds));
                let finding = match event.timestamp {
                    Some(ts) => finding.at(ts),
                    None => finding,
                };
                finding.with_service(service.unwrap_or(label.as_str()))
            })
        })
        .collect()
}

/// Spike findings for time buckets far above the batch mean.
pub fn spike_findings(events: &[LogEvent], query_id: &str, thresholds: &AnalysisThresholds) -> Vec<Finding> {
    let buckets: Vec<(DateTime<Utc>, u64, Option<&str>)> = events
        .iter()
        .filter_map(|e| Some((e.timestamp?, row_count(e)?, e.service.as_deref())))
        .collect();
    if buckets.is_empty() {
        return Vec::new();
    }

    let mean = buckets.iter().map(|(_, c, _)| *c as f64).sum::<f64>() / buckets.len() as f64;
    let cutoff = mean * thresholds.spike_multiplier;

    buckets
        .into_iter()
        .filter(|(_, count, _)| *count as f64 > cutoff && *count > thresholds.spike_floor)
        .map(|(ts, count, service)| {
            let finding = Finding::new(
                FindingKind::Spike,
                severity_for_count(count, thresholds),
                format!(
                    "Error spike at {}: {count} errors ({:.1}x the mean of {mean:.1})",
                    ts.format("%H:%M"),
                    count as f64 / mean.max(f64::EPSILON)
                ),
                query_id,
            )
            .at(ts)
            .with_confidence(thresholds.spike_confidence);
            match service {
                Some(s) => finding.with_service(s),
                None => finding,
            }
        })
        .collect()
}

/// Recurring-error findings for clusters seen often enough at error level.
pub fn recurring_findings(
    clusters: &[LogCluster],
    query_id: &str,
    thresholds: &AnalysisThresholds,
) -> Vec<Finding> {
    clusters
        .iter()
        .filter(|c| c.count >= thresholds.recurring_min && c.is_error())
        .map(|cluster| {
            let count = cluster.count as u64;
            let mut finding = Finding::new(
                FindingKind::Recurring,
                severity_for_count(count, thresholds),
                format!("Recurring error ({count}x): {}", cluster.template),
                query_id,
            )
            .with_evidence(format!("template {} cause {}", cluster.template_id, cluster.cause))
            .with_confidence(0.7);
            if let Some(ts) = cluster.first_seen {
                finding = finding.at(ts);
            }
            if let Some(service) = cluster.services.first() {
                finding = finding.with_service(service.clone());
            }
            finding
        })
        .collect()
}

/// Root-cause finding for the best-ranked causal candidate, if its cause
/// is known.
pub fn root_cause_finding(clusters: &[LogCluster], query_id: &str) -> Option<Finding> {
    let top = rank_root_causes(clusters).into_iter().next()?;
    if top.cluster.cause == CauseTag::Unknown {
        return None;
    }
    let severity = if top.cluster.cause.is_fundamental() {
        Severity::High
    } else {
        Severity::Medium
    };
    let mut finding = Finding::new(
        FindingKind::RootCause,
        severity,
        format!("Likely root cause: {} ({})", top.cluster.cause, top.cluster.template),
        query_id,
    )
    .with_evidence(top.rationale)
    .with_confidence(top.score);
    if let Some(ts) = top.cluster.first_seen {
        finding = finding.at(ts);
    }
    if let Some(service) = top.cluster.services.first() {
        finding = finding.with_service(service.clone());
    }
    Some(finding)
}

/// Follow-ups that continue truncated scans from their cursor.
pub fn continuation_actions(ctx: &InvestigationContext) -> Vec<NextAction> {
    ctx.history
        .iter()
        .filter_map(|executed| {
            let cursor = executed.next_cursor?;
            Some(
                NextAction::new(
                    5,
                    ActionKind::Query,
                    format!("Continue '{}' past {}", executed.purpose, cursor.timestamp.format("%H:%M:%S")),
                    format!("Result hit the {} row limit; cursor {}", cursor.limit, cursor.encode()),
                )
                .with_query(insert_filter(&executed.query, &cursor.continuation_filter())),
            )
        })
        .collect()
}

/// Insert a filter stage directly after the source stage so it applies
/// before any aggregation or limit.
pub fn insert_filter(query: &str, filter: &str) -> String {
    match query.split_once(" | ") {
        Some((source, rest)) if source.starts_with("source ") => {
            format!("{source} | filter {filter} | {rest}")
        }
        _ if query.starts_with("source ") => format!("{query} | filter {filter}"),
        _ => format!("source logs | filter {filter} | {query}"),
    }
}

/// Action suggested when an investigation produced no findings.
pub fn widen_window_action(ctx: &InvestigationContext) -> NextAction {
    let hours = ctx.window.duration().num_minutes() as f64 / 60.0;
    NextAction::new(
        1,
        ActionKind::WidenWindow,
        "Widen the time window and rerun the investigation",
        format!("No findings in the last {hours:.1}h"),
    )
}

/// Build the summary from the strongest findings.
///
/// Critical and high findings are preferred; with none, all findings are
/// used; with no findings at all the summary reports no issues at a fixed
/// moderate confidence.
pub fn summarize(
    ctx: &InvestigationContext,
    thresholds: &AnalysisThresholds,
    impact: impl FnOnce(&[Finding]) -> String,
) -> EvidenceSummary {
    let ranked = ctx.ranked_findings();
    if ranked.is_empty() {
        return EvidenceSummary {
            root_cause: format!(
                "No issues detected between {} and {}",
                ctx.window.start.format("%Y-%m-%d %H:%M"),
                ctx.window.end.format("%Y-%m-%d %H:%M")
            ),
            confidence: thresholds.no_issue_confidence,
            affected_services: Vec::new(),
            impact: "No error-level activity detected".to_string(),
        };
    }

    let severe: Vec<Finding> = ranked
        .iter()
        .filter(|f| f.severity.is_high_or_worse())
        .cloned()
        .collect();
    let pool = if severe.is_empty() { ranked } else { severe };

    let lead = pool
        .iter()
        .find(|f| f.kind == FindingKind::RootCause)
        .unwrap_or(&pool[0]);

    EvidenceSummary {
        root_cause: lead.summary.clone(),
        confidence: lead.confidence,
        affected_services: ctx.affected_services(),
        impact: impact(&pool),
    }
}
