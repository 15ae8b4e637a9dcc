//! Remediation asset generation: alerts, dashboard widgets, and a runbook
//! derived from an investigation's findings.

use std::fmt::Write as _;

use crate::domain::models::{
    AssetKind, EvidenceSummary, Finding, FindingKind, NextAction, RemediationAsset,
    StandardProcedure,
};
use crate::services::strategies::service_filter;

fn slug(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    for c in value.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

fn alert_for(finding: &Finding, service: &str) -> RemediationAsset {
    let threshold = match finding.kind {
        FindingKind::Spike => 10,
        _ => 5,
    };
    RemediationAsset {
        kind: AssetKind::Alert,
        name: format!("logsleuth-{}-{}", slug(service), finding.kind.as_str().replace('_', "-")),
        definition: format!(
            "query: source logs | filter {} && $m.severity >= ERROR | count\n\
             condition: more than {threshold} matches in 5m\n\
             severity: {}",
            service_filter(service),
            finding.severity.as_str()
        ),
        source_finding: Some(finding.summary.clone()),
    }
}

fn error_timeline_widget(services: &[String]) -> RemediationAsset {
    let scope = if services.is_empty() {
        String::new()
    } else {
        let names = services
            .iter()
            .map(|s| service_filter(s))
            .collect::<Vec<_>>()
            .join(" || ");
        format!(" && ({names})")
    };
    RemediationAsset {
        kind: AssetKind::DashboardWidget,
        name: "logsleuth-error-timeline".to_string(),
        definition: format!(
            "source logs | filter $m.severity >= ERROR{scope} \
             | groupby roundTime($m.timestamp, 1m) as bucket, $l.applicationname aggregate count() as errors"
        ),
        source_finding: None,
    }
}

fn runbook(
    summary: &EvidenceSummary,
    findings: &[Finding],
    actions: &[NextAction],
    procedures: &[StandardProcedure],
) -> RemediationAsset {
    let mut doc = String::new();
    let _ = writeln!(doc, "# Runbook: {}\n", summary.root_cause);
    let _ = writeln!(doc, "Confidence: {:.0}%", summary.confidence * 100.0);
    if !summary.affected_services.is_empty() {
        let _ = writeln!(doc, "Affected services: {}", summary.affected_services.join(", "));
    }
    let _ = writeln!(doc, "Impact: {}\n", summary.impact);

    let _ = writeln!(doc, "## Evidence\n");
    for finding in findings.iter().take(5) {
        let _ = writeln!(doc, "- [{}] {}", finding.severity.as_str(), finding.summary);
    }

    if !actions.is_empty() {
        let _ = writeln!(doc, "\n## Steps\n");
        for (i, action) in actions.iter().enumerate() {
            let _ = writeln!(doc, "{}. {}", i + 1, action.description);
            if let Some(query) = &action.query {
                let _ = writeln!(doc, "   `{query}`");
            }
        }
    }

    for procedure in procedures {
        let _ = writeln!(doc, "\n## {} ({})\n", procedure.title, procedure.id);
        let _ = writeln!(doc, "Remediation: {}", procedure.remediation);
        let _ = writeln!(doc, "Escalation: {}", procedure.escalation);
    }

    RemediationAsset {
        kind: AssetKind::Runbook,
        name: format!("runbook-{}", slug(&summary.root_cause).chars().take(48).collect::<String>()),
        definition: doc,
        source_finding: findings.first().map(|f| f.summary.clone()),
    }
}

/// Generate remediation assets. Returns nothing when there are no findings.
///
/// One alert is produced per service with a high-or-worse finding, one
/// error-timeline widget when any spike was seen, and always one runbook.
pub fn generate_assets(
    summary: &EvidenceSummary,
    findings: &[Finding],
    actions: &[NextAction],
    procedures: &[StandardProcedure],
) -> Vec<RemediationAsset> {
    if findings.is_empty() {
        return Vec::new();
    }

    let mut assets = Vec::new();
    let mut alerted: Vec<&str> = Vec::new();
    for finding in findings.iter().filter(|f| f.severity.is_high_or_worse()) {
        let Some(service) = finding.service.as_deref() else {
            continue;
        };
        if alerted.contains(&service) {
            continue;
        }
        alerted.push(service);
        assets.push(alert_for(finding, service));
    }

    if findings.iter().any(|f| f.kind == FindingKind::Spike) {
        assets.push(error_timeline_widget(&summary.affected_services));
    }

    assets.push(runbook(summary, findings, actions, procedures));
    assets
}
