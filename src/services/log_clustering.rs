//! Log clustering: group events by normalized message template.
//!
//! Variable tokens (timestamps, ids, addresses, numbers, quoted values) are
//! replaced by placeholders so that messages differing only in those tokens
//! share a template. Each template is tagged with an inferred cause.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{debug, instrument};

use super::cluster_cache::ClusterCache;
use crate::domain::models::{CauseTag, LogCluster, LogEvent};

/// Pattern / placeholder pairs, applied in order.
static NORMALIZERS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (
            r"\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:?\d{2})?",
            "<TS>",
        ),
        (
            r"\b[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}\b",
            "<UUID>",
        ),
        (r"\b\d{1,3}(\.\d{1,3}){3}(:\d+)?\b", "<IP>"),
        (r"\b0x[0-9a-fA-F]+\b", "<HEX>"),
        // Bare hex runs long enough to be ids, e.g. commit shas or span ids.
        (r"\b[0-9a-fA-F]{16,}\b", "<HEX>"),
        (r#""[^"]*""#, "<STR>"),
        (r"'[^']*'", "<STR>"),
        (r"\b\d+(\.\d+)?(ms|s|mb|kb|gb|%)?\b", "<NUM>"),
        (r"\s+", " "),
    ]
    .into_iter()
    .filter_map(|(pattern, replacement)| Regex::new(pattern).ok().map(|re| (re, replacement)))
    .collect()
});

/// Cause rules in precedence order: fundamental causes are checked before
/// the symptoms they tend to produce.
const CAUSE_RULES: &[(CauseTag, &[&str])] = &[
    (
        CauseTag::MemoryPressure,
        &[
            "out of memory", "outofmemory", "oomkilled", "oom-kill", "memory limit", "heap space",
            "cannot allocate memory", "memory pressure", "gc overhead",
        ],
    ),
    (
        CauseTag::DiskPressure,
        &["no space left", "disk full", "disk pressure", "inode"],
    ),
    (
        CauseTag::ResourceExhaustion,
        &[
            "too many open files", "resource exhausted", "pool exhausted", "cpu throttl",
            "thread pool", "max workers",
        ],
    ),
    (
        CauseTag::ConfigurationError,
        &[
            "invalid configuration", "misconfigur", "missing config", "config error",
            "unknown property", "missing environment variable",
        ],
    ),
    (
        CauseTag::DatabaseContention,
        &[
            "deadlock", "lock wait", "lock timeout", "too many connections", "connection pool",
            "serialization failure", "could not obtain lock",
        ],
    ),
    (
        CauseTag::AuthFailure,
        &[
            "unauthorized", "forbidden", "authentication failed", "invalid token",
            "token expired", "expired token", "access denied", "401", "403",
        ],
    ),
    (
        CauseTag::RateLimited,
        &["rate limit", "too many requests", "throttl", "429"],
    ),
    (
        CauseTag::DependencyFailure,
        &[
            "connection refused", "connection reset", "econnrefused", "unavailable",
            "bad gateway", "broken pipe", "no route to host", "502", "503",
        ],
    ),
    (
        CauseTag::Timeout,
        &["timeout", "timed out", "deadline exceeded", "504"],
    ),
];

/// Replace variable tokens in a message with placeholders.
pub fn normalize_template(message: &str) -> String {
    let mut template = message.trim().to_string();
    for (re, replacement) in NORMALIZERS.iter() {
        template = re.replace_all(&template, *replacement).into_owned();
    }
    template.trim().to_string()
}

/// Infer the cause of a raw message.
pub fn infer_cause(message: &str) -> CauseTag {
    let text = message.to_lowercase();
    CAUSE_RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
        .map_or(CauseTag::Unknown, |(tag, _)| *tag)
}

fn template_id(template: &str) -> String {
    blake3::hash(template.as_bytes()).to_hex()[..12].to_string()
}

/// Builds clusters, memoized through a shared [`ClusterCache`].
#[derive(Debug, Clone)]
pub struct LogClusterer {
    cache: Arc<ClusterCache>,
}

impl LogClusterer {
    pub fn new(cache: Arc<ClusterCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<ClusterCache> {
        &self.cache
    }

    /// Cluster the events that carry a message, largest clusters first.
    #[instrument(skip(self, events), fields(events = events.len()))]
    pub fn cluster(&self, events: &[LogEvent], tenant: Option<&str>) -> Vec<LogCluster> {
        let (cached, found) = self.cache.get(events, tenant);
        if found {
            debug!(clusters = cached.len(), "reusing cached clusters");
            return cached;
        }

        let clusters = build_clusters(events);
        self.cache.set(events, tenant, clusters.clone());
        clusters
    }
}

/// Cluster without caching.
pub fn build_clusters(events: &[LogEvent]) -> Vec<LogCluster> {
    let mut by_template: HashMap<String, LogCluster> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for event in events {
        let Some(message) = event.message.as_deref() else {
            continue;
        };
        let template = normalize_template(message);
        if template.is_empty() {
            continue;
        }

        let cluster = by_template.entry(template.clone()).or_insert_with(|| {
            order.push(template.clone());
            LogCluster {
                template_id: template_id(&template),
                template: template.clone(),
                cause: infer_cause(message),
                count: 0,
                first_seen: None,
                services: Vec::new(),
                worst_severity: None,
            }
        });

        cluster.count += 1;
        if let Some(ts) = event.timestamp {
            cluster.first_seen = Some(cluster.first_seen.map_or(ts, |seen| seen.min(ts)));
        }
        if let Some(service) = &event.service {
            if !cluster.services.contains(service) {
                cluster.services.push(service.clone());
            }
        }
        if let Some(severity) = event.severity {
            cluster.worst_severity = Some(cluster.worst_severity.map_or(severity, |s| s.max(severity)));
        }
    }

    let mut clusters: Vec<LogCluster> = order
        .into_iter()
        .filter_map(|template| by_template.remove(&template))
        .collect();
    // Stable sort keeps first-appearance order among equal counts.
    clusters.sort_by(|a, b| b.count.cmp(&a.count));
    clusters
}
