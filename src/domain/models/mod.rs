pub mod change;
pub mod cluster;
pub mod config;
pub mod cursor;
pub mod investigation;
pub mod log_event;
pub mod procedure;
pub mod query;

pub use change::{
    ChangeCategory, ChangeCorrelationReport, ChangeCorrelationRequest, ConfigChange,
    CorrelationWindow, RiskTier,
};
pub use cluster::{CauseTag, LogCluster, RootCauseCandidate};
pub use config::{
    AnalysisThresholds, BackendConfig, CacheConfig, Config, CustomPatternConfig,
    InvestigationConfig, LoggingConfig, RateLimitConfig,
};
pub use cursor::{CursorDirection, TimeCursor};
pub use investigation::{
    dedupe_and_rank, distinct_services, ActionKind, EvidenceSummary, Finding, FindingKind,
    InvestigationContext, InvestigationMode, InvestigationReport, InvestigationRequest,
    NextAction, Severity,
};
pub use log_event::{LogEvent, LogSeverity};
pub use procedure::{AssetKind, RemediationAsset, StandardProcedure};
pub use query::{
    ExecutedQuery, QueryPlan, QueryRequest, QueryResult, QuerySyntax, QueryTier, TimeWindow,
};
