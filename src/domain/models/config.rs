use serde::{Deserialize, Serialize};

use super::query::{QuerySyntax, QueryTier};

/// Main configuration structure for logsleuth
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Remote log-analytics backend
    #[serde(default)]
    pub backend: BackendConfig,

    /// Outgoing query rate limiting
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Investigation bounds and analysis thresholds
    #[serde(default)]
    pub investigation: InvestigationConfig,

    /// Cluster cache sizing
    #[serde(default)]
    pub cache: CacheConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Extra change categories registered at startup
    #[serde(default)]
    pub custom_patterns: Vec<CustomPatternConfig>,
}

/// Remote backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BackendConfig {
    /// Base URL of the log-analytics API
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// API key sent as a bearer token
    #[serde(default)]
    pub api_key: Option<String>,

    /// Storage tier queried by default
    #[serde(default)]
    pub tier: QueryTier,

    /// Query language
    #[serde(default)]
    pub syntax: QuerySyntax,

    /// Per-query timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum rows requested per query
    #[serde(default = "default_result_limit")]
    pub result_limit: u32,
}

fn default_endpoint() -> String {
    "http://localhost:8080".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_result_limit() -> u32 {
    200
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: None,
            tier: QueryTier::default(),
            syntax: QuerySyntax::default(),
            timeout_secs: default_timeout_secs(),
            result_limit: default_result_limit(),
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RateLimitConfig {
    /// Requests per second allowed
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    /// Burst size for token bucket
    #[serde(default = "default_burst_size")]
    pub burst_size: u32,
}

const fn default_requests_per_second() -> u32 {
    5
}

const fn default_burst_size() -> u32 {
    10
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_requests_per_second(),
            burst_size: default_burst_size(),
        }
    }
}

/// Investigation bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct InvestigationConfig {
    /// Queries run when the caller does not specify a bound
    #[serde(default = "default_max_queries")]
    pub default_max_queries: usize,

    /// Hard cap on queries per investigation
    #[serde(default = "default_hard_max_queries")]
    pub hard_max_queries: usize,

    /// Findings shown in a report
    #[serde(default = "default_findings_shown")]
    pub findings_shown: usize,

    /// Next actions shown in a report
    #[serde(default = "default_actions_shown")]
    pub actions_shown: usize,

    /// Analysis thresholds
    #[serde(default)]
    pub thresholds: AnalysisThresholds,
}

const fn default_max_queries() -> usize {
    5
}

const fn default_hard_max_queries() -> usize {
    10
}

const fn default_findings_shown() -> usize {
    10
}

const fn default_actions_shown() -> usize {
    5
}

impl Default for InvestigationConfig {
    fn default() -> Self {
        Self {
            default_max_queries: default_max_queries(),
            hard_max_queries: default_hard_max_queries(),
            findings_shown: default_findings_shown(),
            actions_shown: default_actions_shown(),
            thresholds: AnalysisThresholds::default(),
        }
    }
}

/// Tunable thresholds used when turning results into findings.
///
/// These are product calibration, not correctness invariants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AnalysisThresholds {
    /// Per-group error count above which a finding is raised
    #[serde(default = "default_group_error_threshold")]
    pub group_error_threshold: u64,

    /// Spike if a bucket exceeds this multiple of the batch mean
    #[serde(default = "default_spike_multiplier")]
    pub spike_multiplier: f64,

    /// ... and this absolute count
    #[serde(default = "default_spike_floor")]
    pub spike_floor: u64,

    /// Confidence attached to spike findings
    #[serde(default = "default_spike_confidence")]
    pub spike_confidence: f64,

    /// Minimum occurrences for a recurring-error finding
    #[serde(default = "default_recurring_min")]
    pub recurring_min: usize,

    /// Count at or above which a group finding is critical
    #[serde(default = "default_critical_count")]
    pub critical_count: u64,

    /// Count at or above which a group finding is high
    #[serde(default = "default_high_count")]
    pub high_count: u64,

    /// Count at or above which a group finding is medium
    #[serde(default = "default_medium_count")]
    pub medium_count: u64,

    /// Confidence of a "no issues found" summary
    #[serde(default = "default_no_issue_confidence")]
    pub no_issue_confidence: f64,
}

const fn default_group_error_threshold() -> u64 {
    10
}

const fn default_spike_multiplier() -> f64 {
    3.0
}

const fn default_spike_floor() -> u64 {
    10
}

const fn default_spike_confidence() -> f64 {
    0.9
}

const fn default_recurring_min() -> usize {
    3
}

const fn default_critical_count() -> u64 {
    100
}

const fn default_high_count() -> u64 {
    50
}

const fn default_medium_count() -> u64 {
    20
}

const fn default_no_issue_confidence() -> f64 {
    0.65
}

impl Default for AnalysisThresholds {
    fn default() -> Self {
        Self {
            group_error_threshold: default_group_error_threshold(),
            spike_multiplier: default_spike_multiplier(),
            spike_floor: default_spike_floor(),
            spike_confidence: default_spike_confidence(),
            recurring_min: default_recurring_min(),
            critical_count: default_critical_count(),
            high_count: default_high_count(),
            medium_count: default_medium_count(),
            no_issue_confidence: default_no_issue_confidence(),
        }
    }
}

/// Cluster cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CacheConfig {
    /// Number of independently locked shards
    #[serde(default = "default_shards")]
    pub shards: usize,

    /// Nominal total capacity (approximate)
    #[serde(default = "default_max_size")]
    pub max_size: usize,

    /// Entry lifetime in seconds
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Batches smaller than this bypass the cache
    #[serde(default = "default_min_batch_size")]
    pub min_batch_size: usize,

    /// Scope cached clusters by tenant
    #[serde(default = "default_true")]
    pub tenant_scoped: bool,
}

const fn default_shards() -> usize {
    16
}

const fn default_max_size() -> usize {
    1000
}

const fn default_ttl_secs() -> u64 {
    300
}

const fn default_min_batch_size() -> usize {
    10
}

const fn default_true() -> bool {
    true
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            shards: default_shards(),
            max_size: default_max_size(),
            ttl_secs: default_ttl_secs(),
            min_batch_size: default_min_batch_size(),
            tenant_scoped: default_true(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rotated log files; stderr only when unset
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Rotation: daily, hourly or never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}

/// A change category registered from configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct CustomPatternConfig {
    pub category: String,
    pub keywords: Vec<String>,
}
