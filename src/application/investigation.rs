//! Investigation orchestrator.
//!
//! Selects a strategy for the request, runs a bounded slice of its plans
//! against the [`QueryExecutor`], merges strategy and heuristic follow-ups,
//! and renders an [`InvestigationReport`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::{DomainError, DomainResult, QueryError};
use crate::domain::models::{
    BackendConfig, Config, CursorDirection, ExecutedQuery, InvestigationConfig,
    InvestigationContext, InvestigationReport, InvestigationRequest, LogEvent, QueryPlan,
    QueryRequest, QueryTier, TimeCursor, TimeWindow,
};
use crate::domain::ports::QueryExecutor;
use crate::services::heuristics::{merge_actions, HeuristicEngine};
use crate::services::log_clustering::LogClusterer;
use crate::services::query_corrector::correct_query;
use crate::services::remediation::generate_assets;
use crate::services::strategies::strategy_for;
use crate::services::time_range::parse_time_range;

/// Runs investigations against one query backend.
///
/// The orchestrator itself is stateless between calls; each investigation
/// owns its [`InvestigationContext`]. The clusterer's cache and the
/// executor are the only shared state.
pub struct InvestigationOrchestrator {
    executor: Arc<dyn QueryExecutor>,
    clusterer: LogClusterer,
    heuristics: Arc<HeuristicEngine>,
    backend: BackendConfig,
    settings: InvestigationConfig,
}

impl InvestigationOrchestrator {
    pub fn new(executor: Arc<dyn QueryExecutor>, clusterer: LogClusterer, config: &Config) -> Self {
        Self {
            executor,
            clusterer,
            heuristics: Arc::new(HeuristicEngine::with_builtin_detectors()),
            backend: config.backend.clone(),
            settings: config.investigation.clone(),
        }
    }

    /// Replace the heuristic engine, e.g. to add custom detectors.
    #[must_use]
    pub fn with_heuristics(mut self, engine: HeuristicEngine) -> Self {
        self.heuristics = Arc::new(engine);
        self
    }

    pub fn executor_name(&self) -> &'static str {
        self.executor.name()
    }

    /// Run an investigation relative to the current time.
    pub async fn investigate(&self, request: &InvestigationRequest) -> DomainResult<InvestigationReport> {
        self.investigate_at(request, Utc::now()).await
    }

    /// Run an investigation with `now` as the reference for relative ranges.
    ///
    /// All caller-input errors are returned before the first query is sent.
    /// Backend failures never abort: they are recorded on the executed query
    /// and the remaining plans still run.
    #[instrument(skip(self, request), fields(time_range = %request.time_range, investigation_id = tracing::field::Empty))]
    pub async fn investigate_at(
        &self,
        request: &InvestigationRequest,
        now: DateTime<Utc>,
    ) -> DomainResult<InvestigationReport> {
        let mode = request.resolve_mode()?;
        let window = parse_time_range(&request.time_range, now)?;
        let max_queries = self.query_bound(request.max_queries)?;
        if let Some(deadline) = request.deadline {
            if deadline <= now {
                return Err(DomainError::InvalidInput(format!(
                    "deadline {} is not in the future",
                    deadline.to_rfc3339()
                )));
            }
        }

        let mut ctx = InvestigationContext::from_request(request, mode, window);
        tracing::Span::current().record("investigation_id", tracing::field::display(ctx.id));
        let strategy = strategy_for(mode, self.clusterer.clone(), self.settings.thresholds.clone());

        let mut plans = strategy.initial_queries(&ctx);
        let planned = plans.len();
        plans.truncate(max_queries);
        info!(mode = %mode, window = %window, planned, running = plans.len(), "Starting investigation");

        for plan in &plans {
            let executed = self.run_plan(plan, &ctx.window, request.deadline).await;
            if executed.succeeded() {
                let findings = strategy.analyze_results(&ctx, plan, &executed);
                debug!(plan = %plan.id, findings = findings.len(), "Analyzed results");
                ctx.findings.extend(findings);
            }
            ctx.history.push(executed);
        }

        let events: Vec<LogEvent> = ctx.history.iter().flat_map(|q| q.events.iter().cloned()).collect();
        let heuristic = self.heuristics.run(&ctx.findings, &events);
        ctx.next_actions = merge_actions(strategy.suggest_next_actions(&ctx), heuristic.actions);
        let summary = strategy.synthesize_evidence(&ctx);

        let mut findings = ctx.ranked_findings();
        let omitted_findings = findings.len().saturating_sub(self.settings.findings_shown);
        findings.truncate(self.settings.findings_shown);
        let mut next_actions = ctx.next_actions.clone();
        next_actions.truncate(self.settings.actions_shown);

        let (assets, procedures) = if request.generate_assets && !findings.is_empty() {
            (
                generate_assets(&summary, &findings, &next_actions, &heuristic.procedures),
                Vec::new(),
            )
        } else {
            (Vec::new(), heuristic.procedures)
        };

        info!(
            findings = ctx.findings.len(),
            failed_queries = ctx.history.iter().filter(|q| !q.succeeded()).count(),
            detectors = ?heuristic.matched,
            confidence = summary.confidence,
            "Investigation complete"
        );

        Ok(InvestigationReport {
            investigation_id: ctx.id,
            mode,
            window,
            query_status: ctx.history.iter().map(ExecutedQuery::status_line).collect(),
            summary,
            findings,
            omitted_findings,
            next_actions,
            assets,
            procedures,
        })
    }

    fn query_bound(&self, requested: Option<usize>) -> DomainResult<usize> {
        match requested {
            Some(0) => Err(DomainError::InvalidInput("max_queries must be at least 1".to_string())),
            Some(n) => Ok(n.min(self.settings.hard_max_queries)),
            None => Ok(self.settings.default_max_queries.min(self.settings.hard_max_queries)),
        }
    }

    /// Time allowed for one round-trip: the configured timeout, shortened by
    /// the caller deadline.
    fn call_budget(&self, deadline: Option<DateTime<Utc>>) -> Duration {
        let configured = Duration::from_secs(self.backend.timeout_secs);
        deadline.map_or(configured, |deadline| {
            let remaining = (deadline - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            configured.min(remaining)
        })
    }

    #[instrument(skip(self, plan, window, deadline), fields(plan = %plan.id))]
    async fn run_plan(
        &self,
        plan: &QueryPlan,
        window: &TimeWindow,
        deadline: Option<DateTime<Utc>>,
    ) -> ExecutedQuery {
        let corrected = correct_query(&plan.query, self.backend.syntax);
        if corrected.was_changed() {
            debug!(changes = ?corrected.changes, query = %corrected.text, "Corrected query text");
        }

        let request = QueryRequest {
            query: corrected.text,
            tier: if plan.tier == QueryTier::default() {
                self.backend.tier
            } else {
                plan.tier
            },
            syntax: self.backend.syntax,
            window: *window,
            limit: self.backend.result_limit,
        };

        let budget = self.call_budget(deadline);
        let started = Instant::now();
        let outcome = if budget.is_zero() {
            Err(QueryError::Timeout(0))
        } else {
            match tokio::time::timeout(budget, self.executor.execute(&request)).await {
                Ok(result) => result,
                Err(_) => Err(QueryError::Timeout(
                    u64::try_from(budget.as_millis()).unwrap_or(u64::MAX),
                )),
            }
        };
        let duration = started.elapsed();

        let (events, error) = match outcome {
            Ok(result) => {
                debug!(events = result.events.len(), elapsed_ms = duration.as_millis(), "Query succeeded");
                (result.events, None)
            }
            Err(err) => {
                warn!(error = %err, "Query failed");
                (Vec::new(), Some(err))
            }
        };
        let next_cursor = next_cursor(&request.query, &events, request.limit);

        ExecutedQuery {
            id: plan.id.clone(),
            purpose: plan.purpose.clone(),
            query: request.query,
            duration,
            error,
            events,
            next_cursor,
        }
    }
}

/// Cursor continuing a scan whose result filled the limit.
///
/// Descending scans continue backward from the oldest event seen; every
/// other scan continues forward from the newest.
fn next_cursor(query: &str, events: &[LogEvent], limit: u32) -> Option<TimeCursor> {
    if limit == 0 || events.len() < limit as usize {
        return None;
    }
    let timestamps = events.iter().filter_map(|e| e.timestamp);
    if query.contains("$m.timestamp desc") {
        timestamps.min().map(|ts| TimeCursor::new(ts, limit, CursorDirection::Backward))
    } else {
        timestamps.max().map(|ts| TimeCursor::new(ts, limit, CursorDirection::Forward))
    }
}
