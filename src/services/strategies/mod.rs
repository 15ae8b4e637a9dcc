//! Query strategies, one per investigation mode.
//!
//! A strategy owns the policy side of an investigation: which queries to
//! run, how to read their results, which follow-ups to suggest, and how to
//! summarize. Execution belongs to the orchestrator.
//!
//! | Mode        | Strategy             | Initial plans                                   |
//! |-------------|----------------------|-------------------------------------------------|
//! | `global`    | [`GlobalStrategy`]   | error rate by service, error timeline, critical sample |
//! | `component` | [`ComponentStrategy`]| errors, patterns, subsystems, dependency scan   |
//! | `flow`      | [`FlowStrategy`]     | one time-ordered scan by trace/correlation id   |

pub mod analysis;
pub mod component;
pub mod flow;
pub mod global;

pub use component::ComponentStrategy;
pub use flow::FlowStrategy;
pub use global::GlobalStrategy;

use crate::domain::models::{
    AnalysisThresholds, EvidenceSummary, ExecutedQuery, Finding, InvestigationContext,
    InvestigationMode, NextAction, QueryPlan,
};
use crate::services::log_clustering::LogClusterer;

/// Mode-specific investigation policy.
pub trait QueryStrategy: Send + Sync {
    fn mode(&self) -> InvestigationMode;

    /// Ordered plans for this investigation.
    fn initial_queries(&self, ctx: &InvestigationContext) -> Vec<QueryPlan>;

    /// Turn one successful execution into findings.
    fn analyze_results(
        &self,
        ctx: &InvestigationContext,
        plan: &QueryPlan,
        executed: &ExecutedQuery,
    ) -> Vec<Finding>;

    /// Follow-ups derived from the accumulated findings and history.
    fn suggest_next_actions(&self, ctx: &InvestigationContext) -> Vec<NextAction>;

    fn synthesize_evidence(&self, ctx: &InvestigationContext) -> EvidenceSummary;
}

/// Strategy for the given mode.
pub fn strategy_for(
    mode: InvestigationMode,
    clusterer: LogClusterer,
    thresholds: AnalysisThresholds,
) -> Box<dyn QueryStrategy> {
    match mode {
        InvestigationMode::Global => Box::new(GlobalStrategy::new(clusterer, thresholds)),
        InvestigationMode::Component => Box::new(ComponentStrategy::new(clusterer, thresholds)),
        InvestigationMode::Flow => Box::new(FlowStrategy::new(clusterer, thresholds)),
    }
}

/// Quote a value as a DataPrime string literal.
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Filter expression matching one application.
pub fn service_filter(service: &str) -> String {
    format!("$l.applicationname == {}", quote(service))
}

/// Query listing error-level events of one application.
pub fn service_errors_query(service: &str, limit: u32) -> String {
    format!(
        "source logs | filter {} && $m.severity >= ERROR | limit {limit}",
        service_filter(service)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::CacheConfig;
    use crate::services::cluster_cache::ClusterCache;
    use std::sync::Arc;

    #[test]
    fn test_strategy_for_each_mode() {
        let clusterer = LogClusterer::new(Arc::new(ClusterCache::new(&CacheConfig::default())));
        for mode in [InvestigationMode::Global, InvestigationMode::Component, InvestigationMode::Flow] {
            let strategy = strategy_for(mode, clusterer.clone(), AnalysisThresholds::default());
            assert_eq!(strategy.mode(), mode);
        }
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("api"), "'api'");
        assert_eq!(quote("o'brien"), "'o\\'brien'");
        assert_eq!(service_filter("api"), "$l.applicationname == 'api'");
    }
}
