//! Implementation of the `logsleuth investigate` command.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use serde::Serialize;

use crate::application::InvestigationOrchestrator;
use crate::cli::commands::build_executor;
use crate::cli::display::{colorize_severity, colorize_status, list_table, render_list, section};
use crate::cli::output::{output, truncate, CommandOutput};
use crate::cli::output::progress::create_spinner;
use crate::domain::models::{AssetKind, Config, InvestigationMode, InvestigationReport, InvestigationRequest};
use crate::services::{ClusterCache, LogClusterer};

#[derive(Args, Debug)]
pub struct InvestigateArgs {
    /// Time range to investigate (15m, 1h, "last 24h", 7d, or <rfc3339>/<rfc3339>)
    #[arg(default_value = "1h")]
    pub time_range: String,

    /// Service to deep-dive into
    #[arg(short, long)]
    pub service: Option<String>,

    /// Trace id of a failing request
    #[arg(long)]
    pub trace_id: Option<String>,

    /// Correlation id of a failing request
    #[arg(long)]
    pub correlation_id: Option<String>,

    /// Maximum number of queries to run (1-10)
    #[arg(short, long)]
    pub max_queries: Option<usize>,

    /// Generate alerts, dashboard widgets, and a runbook from the findings
    #[arg(short, long)]
    pub generate_assets: bool,

    /// Tenant the investigation runs for
    #[arg(long)]
    pub tenant: Option<String>,

    /// Force a mode (global, component, flow) instead of selecting one from the hints
    #[arg(long)]
    pub mode: Option<InvestigationMode>,

    /// Give up on outstanding queries after this many seconds
    #[arg(long)]
    pub deadline_secs: Option<u64>,

    /// Plan the queries without sending them
    #[arg(long)]
    pub dry_run: bool,
}

impl InvestigateArgs {
    pub fn to_request(&self) -> InvestigationRequest {
        InvestigationRequest {
            time_range: self.time_range.clone(),
            target_service: self.service.clone(),
            trace_id: self.trace_id.clone(),
            correlation_id: self.correlation_id.clone(),
            max_queries: self.max_queries,
            generate_assets: self.generate_assets,
            tenant: self.tenant.clone(),
            mode: self.mode,
            deadline: self.deadline_secs.and_then(|secs| {
                let secs = chrono::Duration::try_seconds(i64::try_from(secs).ok()?)?;
                Utc::now().checked_add_signed(secs)
            }),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InvestigateOutput {
    pub backend: &'static str,
    #[serde(flatten)]
    pub report: InvestigationReport,
}

impl CommandOutput for InvestigateOutput {
    fn to_human(&self) -> String {
        let report = &self.report;
        let summary = &report.summary;
        let mut lines = vec![
            format!("Investigation {}", report.investigation_id),
            format!("Mode:       {}", report.mode),
            format!("Window:     {}", report.window),
            format!("Backend:    {}", self.backend),
        ];

        lines.push(section("Summary"));
        lines.push(format!("Root cause: {}", summary.root_cause));
        lines.push(format!("Confidence: {:.0}%", summary.confidence * 100.0));
        if !summary.affected_services.is_empty() {
            lines.push(format!("Affected:   {}", summary.affected_services.join(", ")));
        }
        lines.push(format!("Impact:     {}", summary.impact));

        lines.push(section("Queries"));
        for status in &report.query_status {
            lines.push(format!("  {}", colorize_status(status)));
        }

        if !report.findings.is_empty() {
            lines.push(section("Findings"));
            let mut table = list_table(&["severity", "kind", "service", "confidence", "summary"]);
            for finding in &report.findings {
                table.add_row(vec![
                    colorize_severity(finding.severity).to_string(),
                    finding.kind.as_str().to_string(),
                    finding.service.clone().unwrap_or_else(|| "-".to_string()),
                    format!("{:.2}", finding.confidence),
                    truncate(&finding.summary, 80),
                ]);
            }
            lines.push(render_list("finding", &table, report.findings.len()));
            if report.omitted_findings > 0 {
                lines.push(format!("... and {} more", report.omitted_findings));
            }
        }

        if !report.next_actions.is_empty() {
            lines.push(section("Next actions"));
            for action in &report.next_actions {
                lines.push(format!(
                    "  {}. [{}] {}",
                    action.priority,
                    action.kind.as_str(),
                    action.description
                ));
                if let Some(query) = &action.query {
                    lines.push(format!("     query: {query}"));
                }
            }
        }

        if !report.assets.is_empty() {
            lines.push(section("Remediation assets"));
            for asset in &report.assets {
                match asset.kind {
                    AssetKind::Runbook => lines.push(format!("  [runbook] {}", asset.name)),
                    kind => lines.push(format!(
                        "  [{}] {}: {}",
                        kind.as_str(),
                        asset.name,
                        truncate(&asset.definition, 100)
                    )),
                }
            }
        }

        if !report.procedures.is_empty() {
            lines.push(section("Standard procedures"));
            for procedure in &report.procedures {
                lines.push(format!("  {} {}", procedure.id, procedure.title));
                lines.push(format!("     remediation: {}", procedure.remediation));
                lines.push(format!("     escalation:  {}", procedure.escalation));
            }
        }

        lines.join("\n")
    }
}

pub async fn execute(args: InvestigateArgs, config: &Config, json_mode: bool) -> Result<()> {
    let executor = build_executor(config, args.dry_run)?;
    let cache = Arc::new(ClusterCache::new(&config.cache));
    let orchestrator = InvestigationOrchestrator::new(executor, LogClusterer::new(cache), config);

    let request = args.to_request();
    let spinner = create_spinner(format!("Investigating {}...", request.time_range), json_mode);
    let result = orchestrator.investigate(&request).await;
    spinner.finish_and_clear();

    let report = result.context("Investigation failed")?;
    output(
        &InvestigateOutput {
            backend: orchestrator.executor_name(),
            report,
        },
        json_mode,
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{EvidenceSummary, TimeWindow};
    use uuid::Uuid;

    fn args(time_range: &str) -> InvestigateArgs {
        InvestigateArgs {
            time_range: time_range.to_string(),
            service: Some("checkout".to_string()),
            trace_id: None,
            correlation_id: None,
            max_queries: Some(3),
            generate_assets: true,
            tenant: None,
            mode: Some(InvestigationMode::Component),
            deadline_secs: Some(30),
            dry_run: true,
        }
    }

    #[test]
    fn test_to_request_carries_every_hint() {
        let before = Utc::now();
        let request = args("30m").to_request();
        assert_eq!(request.time_range, "30m");
        assert_eq!(request.target_service.as_deref(), Some("checkout"));
        assert_eq!(request.max_queries, Some(3));
        assert!(request.generate_assets);
        assert_eq!(request.mode, Some(InvestigationMode::Component));
        let deadline = request.deadline.unwrap();
        assert!(deadline >= before + chrono::Duration::seconds(30));
    }

    #[test]
    fn test_human_output_lists_query_status() {
        console::set_colors_enabled(false);
        let output = InvestigateOutput {
            backend: "scripted",
            report: InvestigationReport {
                investigation_id: Uuid::new_v4(),
                mode: InvestigationMode::Global,
                window: TimeWindow::last(chrono::Duration::hours(1), Utc::now()),
                query_status: vec!["[error] Error timeline: Query timed out after 10ms".to_string()],
                summary: EvidenceSummary {
                    root_cause: "No significant issues detected".to_string(),
                    confidence: 0.65,
                    affected_services: vec![],
                    impact: "none".to_string(),
                },
                findings: vec![],
                omitted_findings: 0,
                next_actions: vec![],
                assets: vec![],
                procedures: vec![],
            },
        };

        let human = output.to_human();
        assert!(human.contains("Mode:       global"));
        assert!(human.contains("Confidence: 65%"));
        assert!(human.contains("[error] Error timeline"));

        let json = output.to_json();
        assert_eq!(json["backend"], "scripted");
        assert_eq!(json["mode"], "global");
    }

    #[tokio::test]
    async fn test_dry_run_investigation_sends_nothing_and_reports() {
        let config = Config::default();
        let result = execute(args("15m"), &config, true).await;
        assert!(result.is_ok());
    }
}
