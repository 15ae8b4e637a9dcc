//! Built-in signature detectors.

use super::{Detection, Detector};
use crate::domain::models::{ActionKind, Finding, LogEvent, NextAction, StandardProcedure};

// ---------------------------------------------------------------------------
// Signature matching
// ---------------------------------------------------------------------------

/// Number of findings and events mentioning any of the lowercase keywords.
fn signature_hits(findings: &[Finding], events: &[LogEvent], keywords: &[&str]) -> usize {
    let finding_hits = findings
        .iter()
        .filter(|f| {
            let text = match &f.evidence {
                Some(evidence) => format!("{} {}", f.summary, evidence).to_lowercase(),
                None => f.summary.to_lowercase(),
            };
            keywords.iter().any(|k| text.contains(k))
        })
        .count();
    let event_hits = events.iter().filter(|e| e.mentions_any(keywords)).count();
    finding_hits + event_hits
}

fn procedure(id: &str, title: &str, trigger: &str, remediation: &str, escalation: &str) -> StandardProcedure {
    StandardProcedure {
        id: id.to_string(),
        title: title.to_string(),
        trigger: trigger.to_string(),
        remediation: remediation.to_string(),
        escalation: escalation.to_string(),
    }
}

// ---------------------------------------------------------------------------
// TimeoutDetector
// ---------------------------------------------------------------------------

const TIMEOUT_KEYWORDS: &[&str] = &["timeout", "timed out", "deadline exceeded", "504"];

/// Requests exceeding their time budget.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeoutDetector;

impl Detector for TimeoutDetector {
    fn name(&self) -> &'static str {
        "timeout"
    }

    fn detect(&self, findings: &[Finding], events: &[LogEvent]) -> Option<Detection> {
        let hits = signature_hits(findings, events, TIMEOUT_KEYWORDS);
        if hits == 0 {
            return None;
        }
        Some(Detection {
            detector: self.name(),
            actions: vec![
                NextAction::new(
                    2,
                    ActionKind::Inspect,
                    "Check upstream latency and timeout budgets",
                    format!("{hits} timeout signals observed"),
                )
                .with_query(
                    "source logs | filter $d.message ~ 'timeout' || $d.message ~ 'timed out' \
                     | groupby $l.applicationname aggregate count() as timeouts",
                ),
                NextAction::new(
                    4,
                    ActionKind::Remediate,
                    "Review client timeout and retry settings",
                    "Timeouts are usually a symptom; confirm the slow dependency first",
                ),
            ],
            procedure: procedure(
                "SOP-TIMEOUT",
                "Request timeouts",
                "timeout / deadline exceeded / HTTP 504",
                "Identify the slowest dependency, shed load or scale it, then tune client timeouts.",
                "Escalate to the owning team of the slow dependency if latency persists for 15 minutes.",
            ),
        })
    }
}

// ---------------------------------------------------------------------------
// MemoryPressureDetector
// ---------------------------------------------------------------------------

const MEMORY_KEYWORDS: &[&str] = &[
    "out of memory",
    "outofmemory",
    "oomkilled",
    "oom-kill",
    "heap space",
    "memory limit",
    "cannot allocate memory",
];

/// Processes killed or degraded by memory exhaustion.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryPressureDetector;

impl Detector for MemoryPressureDetector {
    fn name(&self) -> &'static str {
        "memory_pressure"
    }

    fn detect(&self, findings: &[Finding], events: &[LogEvent]) -> Option<Detection> {
        let hits = signature_hits(findings, events, MEMORY_KEYWORDS);
        if hits == 0 {
            return None;
        }
        Some(Detection {
            detector: self.name(),
            actions: vec![
                NextAction::new(
                    1,
                    ActionKind::Inspect,
                    "Inspect memory usage and OOM kills of affected workloads",
                    format!("{hits} memory exhaustion signals observed"),
                ),
                NextAction::new(
                    2,
                    ActionKind::Remediate,
                    "Raise memory limits or roll back the memory-heavy change",
                    "Memory exhaustion is a fundamental cause that cascades into timeouts",
                ),
            ],
            procedure: procedure(
                "SOP-MEMORY",
                "Memory pressure / OOM",
                "OutOfMemoryError / OOMKilled / heap space",
                "Capture a heap profile, raise limits temporarily, and revert recent deployments that grew memory use.",
                "Escalate to the service owner if restarts continue after limits are raised.",
            ),
        })
    }
}

// ---------------------------------------------------------------------------
// AuthFailureDetector
// ---------------------------------------------------------------------------

const AUTH_KEYWORDS: &[&str] = &[
    "unauthorized",
    "forbidden",
    "authentication failed",
    "invalid token",
    "token expired",
    "expired token",
    "access denied",
];

/// Credential, token, or permission failures.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthFailureDetector;

impl Detector for AuthFailureDetector {
    fn name(&self) -> &'static str {
        "auth_failure"
    }

    fn detect(&self, findings: &[Finding], events: &[LogEvent]) -> Option<Detection> {
        let hits = signature_hits(findings, events, AUTH_KEYWORDS);
        if hits == 0 {
            return None;
        }
        Some(Detection {
            detector: self.name(),
            actions: vec![
                NextAction::new(
                    2,
                    ActionKind::Inspect,
                    "Verify credentials and token expiry for failing clients",
                    format!("{hits} authentication or authorization failures observed"),
                ),
                NextAction::new(
                    3,
                    ActionKind::Query,
                    "Correlate with recent IAM and secret changes",
                    "Auth failures frequently follow permission or credential rotation",
                ),
            ],
            procedure: procedure(
                "SOP-AUTH",
                "Authentication failures",
                "401 / 403 / invalid or expired token",
                "Check secret rotation, IAM policy changes, and clock skew on token issuers.",
                "Escalate to the security or identity team if credentials appear compromised.",
            ),
        })
    }
}

// ---------------------------------------------------------------------------
// DatabaseContentionDetector
// ---------------------------------------------------------------------------

const DATABASE_KEYWORDS: &[&str] = &[
    "deadlock",
    "lock wait",
    "lock timeout",
    "too many connections",
    "connection pool",
];

/// Lock contention or connection pool saturation.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatabaseContentionDetector;

impl Detector for DatabaseContentionDetector {
    fn name(&self) -> &'static str {
        "database_contention"
    }

    fn detect(&self, findings: &[Finding], events: &[LogEvent]) -> Option<Detection> {
        let hits = signature_hits(findings, events, DATABASE_KEYWORDS);
        if hits == 0 {
            return None;
        }
        Some(Detection {
            detector: self.name(),
            actions: vec![
                NextAction::new(
                    1,
                    ActionKind::Inspect,
                    "Inspect database locks and connection pool saturation",
                    format!("{hits} database contention signals observed"),
                ),
                NextAction::new(
                    3,
                    ActionKind::Remediate,
                    "Reduce transaction scope or raise the connection pool size",
                    "Contention holds connections and starves unrelated requests",
                ),
            ],
            procedure: procedure(
                "SOP-DATABASE",
                "Database contention",
                "deadlock / lock wait timeout / pool exhausted",
                "Identify blocking sessions, kill long-running transactions, and review recent schema migrations.",
                "Escalate to the database on-call if blocking sessions cannot be cleared.",
            ),
        })
    }
}

// ---------------------------------------------------------------------------
// RateLimitingDetector
// ---------------------------------------------------------------------------

const RATE_LIMIT_KEYWORDS: &[&str] = &["rate limit", "too many requests", "throttl", "429"];

/// Callers rejected by quotas or throttling.
#[derive(Debug, Clone, Copy, Default)]
pub struct RateLimitingDetector;

impl Detector for RateLimitingDetector {
    fn name(&self) -> &'static str {
        "rate_limiting"
    }

    fn detect(&self, findings: &[Finding], events: &[LogEvent]) -> Option<Detection> {
        let hits = signature_hits(findings, events, RATE_LIMIT_KEYWORDS);
        if hits == 0 {
            return None;
        }
        Some(Detection {
            detector: self.name(),
            actions: vec![
                NextAction::new(
                    2,
                    ActionKind::Inspect,
                    "Identify callers exceeding rate limits",
                    format!("{hits} throttling signals observed"),
                )
                .with_query(
                    "source logs | filter $d.message ~ '429' || $d.message ~ 'rate limit' \
                     | groupby $l.applicationname aggregate count() as throttled",
                ),
                NextAction::new(
                    4,
                    ActionKind::Remediate,
                    "Add client backoff or raise the quota",
                    "Retries without backoff amplify throttling",
                ),
            ],
            procedure: procedure(
                "SOP-RATELIMIT",
                "Rate limiting",
                "HTTP 429 / throttled / rate limit exceeded",
                "Find the noisy caller, enable backoff with jitter, and request a quota increase if traffic is legitimate.",
                "Escalate to the provider if limits are hit below the contracted quota.",
            ),
        })
    }
}

// ---------------------------------------------------------------------------
// DiskPressureDetector
// ---------------------------------------------------------------------------

const DISK_KEYWORDS: &[&str] = &["no space left", "disk full", "disk pressure", "inode"];

/// Volumes out of space or inodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskPressureDetector;

impl Detector for DiskPressureDetector {
    fn name(&self) -> &'static str {
        "disk_pressure"
    }

    fn detect(&self, findings: &[Finding], events: &[LogEvent]) -> Option<Detection> {
        let hits = signature_hits(findings, events, DISK_KEYWORDS);
        if hits == 0 {
            return None;
        }
        Some(Detection {
            detector: self.name(),
            actions: vec![
                NextAction::new(
                    1,
                    ActionKind::Remediate,
                    "Free disk space or expand volumes on affected hosts",
                    format!("{hits} disk exhaustion signals observed"),
                ),
                NextAction::new(
                    3,
                    ActionKind::Inspect,
                    "Check log rotation and temporary file growth",
                    "Unrotated logs are the most common cause of full volumes",
                ),
            ],
            procedure: procedure(
                "SOP-DISK",
                "Disk pressure",
                "no space left on device / disk full / inode exhaustion",
                "Clear rotated logs and temp files, expand the volume, and add a usage alert at 80%.",
                "Escalate to infrastructure if the volume cannot be expanded.",
            ),
        })
    }
}
