//! Implementation of the `logsleuth correlate` command.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::application::ChangeCorrelationService;
use crate::cli::commands::{build_executor, build_registry};
use crate::cli::display::{colorize_risk, list_table, render_list, section};
use crate::cli::output::progress::create_spinner;
use crate::cli::output::{output, truncate, CommandOutput};
use crate::domain::models::{ChangeCorrelationReport, ChangeCorrelationRequest, Config};

#[derive(Args, Debug)]
pub struct CorrelateArgs {
    /// Incident time (RFC 3339, or epoch seconds/milliseconds)
    pub incident_time: String,

    /// How far before the incident to look (5m, 15m, 30m, 1h, 2h, 6h)
    #[arg(short, long)]
    pub before: Option<String>,

    /// How far after the incident to look (5m, 15m, 30m)
    #[arg(short, long)]
    pub after: Option<String>,

    /// Only consider changes logged by this service
    #[arg(short, long)]
    pub service: Option<String>,

    /// Only report changes of this category
    #[arg(long)]
    pub category: Option<String>,

    /// Plan the query without sending it
    #[arg(long)]
    pub dry_run: bool,
}

impl CorrelateArgs {
    pub fn to_request(&self) -> ChangeCorrelationRequest {
        ChangeCorrelationRequest {
            incident_time: self.incident_time.clone(),
            window_before: self.before.clone(),
            window_after: self.after.clone(),
            service: self.service.clone(),
            category: self.category.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct CorrelateOutput {
    pub report: ChangeCorrelationReport,
}

impl CommandOutput for CorrelateOutput {
    fn to_human(&self) -> String {
        let report = &self.report;
        let mut lines = vec![
            format!("Incident:   {}", report.incident.to_rfc3339()),
            format!("Window:     {}", report.window),
            format!(
                "Changes:    {} ({} high risk)",
                report.total_changes, report.high_risk_changes
            ),
            format!("Confidence: {:.0}%", report.confidence * 100.0),
        ];

        if let Some(err) = &report.query_error {
            lines.push(format!("Query error: {err}"));
        }

        if let Some(trigger) = &report.likely_trigger {
            lines.push(section("Likely trigger"));
            lines.push(format!(
                "  {} [{}] {} risk, correlation {:.2}",
                trigger.timestamp.to_rfc3339(),
                trigger.category,
                colorize_risk(trigger.risk),
                trigger.correlation
            ));
            lines.push(format!("  {}", trigger.description));
        }

        lines.push(section("Recommendation"));
        lines.push(report.recommendation.clone());

        if !report.changes.is_empty() {
            lines.push(section("Changes"));
            let mut table = list_table(&["time", "category", "risk", "score", "service", "description"]);
            for change in &report.changes {
                table.add_row(vec![
                    change.timestamp.format("%H:%M:%S").to_string(),
                    change.category.to_string(),
                    colorize_risk(change.risk).to_string(),
                    format!("{:.2}", change.correlation),
                    change.service.clone().unwrap_or_else(|| "-".to_string()),
                    truncate(&change.description, 70),
                ]);
            }
            lines.push(render_list("change", &table, report.changes.len()));
            if report.omitted_changes > 0 {
                lines.push(format!("... and {} more", report.omitted_changes));
            }
        }

        lines.join("\n")
    }
}

pub async fn execute(args: CorrelateArgs, config: &Config, json_mode: bool) -> Result<()> {
    let executor = build_executor(config, args.dry_run)?;
    let registry = build_registry(config)?;
    let service = ChangeCorrelationService::new(executor, registry, config.backend.clone());

    let spinner = create_spinner("Correlating changes...", json_mode);
    let result = service.correlate_changes(&args.to_request()).await;
    spinner.finish_and_clear();

    let report = result.context("Change correlation failed")?;
    output(&CorrelateOutput { report }, json_mode);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(incident_time: &str) -> CorrelateArgs {
        CorrelateArgs {
            incident_time: incident_time.to_string(),
            before: Some("2h".to_string()),
            after: None,
            service: Some("checkout".to_string()),
            category: None,
            dry_run: true,
        }
    }

    #[tokio::test]
    async fn test_dry_run_reports_no_changes() {
        let service = ChangeCorrelationService::new(
            build_executor(&Config::default(), true).unwrap(),
            build_registry(&Config::default()).unwrap(),
            Config::default().backend,
        );
        let report = service.correlate_changes(&args("2026-03-01T12:00:00Z").to_request()).await.unwrap();
        assert_eq!(report.total_changes, 0);
        assert!(report.likely_trigger.is_none());

        console::set_colors_enabled(false);
        let human = CorrelateOutput { report }.to_human();
        assert!(human.contains("Changes:    0 (0 high risk)"));
        assert!(human.contains("Recommendation"));
    }

    #[tokio::test]
    async fn test_malformed_incident_time_fails_with_context() {
        let err = execute(args("yesterday-ish"), &Config::default(), true)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Change correlation failed");
        assert!(err.chain().nth(1).unwrap().to_string().contains("yesterday-ish"));
    }
}
