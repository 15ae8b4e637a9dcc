//! Flattened log events returned by the remote log-analytics service.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Log severity as reported by the backend, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSeverity {
    Debug,
    Verbose,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogSeverity {
    /// Parse a severity from its textual or numeric (1-6) representation.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "debug" | "1" => Some(Self::Debug),
            "verbose" | "trace" | "2" => Some(Self::Verbose),
            "info" | "information" | "3" => Some(Self::Info),
            "warning" | "warn" | "4" => Some(Self::Warning),
            "error" | "err" | "5" => Some(Self::Error),
            "critical" | "fatal" | "crit" | "emergency" | "6" => Some(Self::Critical),
            _ => None,
        }
    }

    /// Error or worse.
    pub fn is_error(self) -> bool {
        self >= Self::Error
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Verbose => "verbose",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

const TIMESTAMP_KEYS: &[&str] = &["timestamp", "@timestamp", "time", "bucket", "ts"];
const SEVERITY_KEYS: &[&str] = &["severity", "level", "log_level"];
const SERVICE_KEYS: &[&str] = &["service", "applicationname", "application", "app"];
const SUBSYSTEM_KEYS: &[&str] = &["subsystem", "subsystemname", "component"];
const MESSAGE_KEYS: &[&str] = &["message", "msg", "text", "log", "template"];
const TRACE_KEYS: &[&str] = &["trace_id", "traceid", "traceId"];
const CORRELATION_KEYS: &[&str] = &["correlation_id", "correlationid", "correlationId", "request_id"];

/// One flattened result row.
///
/// Well-known attributes are lifted out of the field map when the event is
/// built; everything else stays addressable through [`LogEvent::field`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    pub timestamp: Option<DateTime<Utc>>,
    pub severity: Option<LogSeverity>,
    pub service: Option<String>,
    pub subsystem: Option<String>,
    pub message: Option<String>,
    pub trace_id: Option<String>,
    pub correlation_id: Option<String>,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl LogEvent {
    /// Build an event from a flat field map.
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        let timestamp = lookup(&fields, TIMESTAMP_KEYS).and_then(parse_timestamp_value);
        let severity = lookup(&fields, SEVERITY_KEYS)
            .and_then(value_to_string)
            .and_then(|s| LogSeverity::parse(&s));
        let service = lookup(&fields, SERVICE_KEYS).and_then(value_to_string);
        let subsystem = lookup(&fields, SUBSYSTEM_KEYS).and_then(value_to_string);
        let message = lookup(&fields, MESSAGE_KEYS).and_then(value_to_string);
        let trace_id = lookup(&fields, TRACE_KEYS).and_then(value_to_string);
        let correlation_id = lookup(&fields, CORRELATION_KEYS).and_then(value_to_string);

        Self {
            timestamp,
            severity,
            service,
            subsystem,
            message,
            trace_id,
            correlation_id,
            fields,
        }
    }

    /// Convenience constructor used heavily in tests and fixtures.
    pub fn message(
        timestamp: DateTime<Utc>,
        severity: LogSeverity,
        service: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Some(timestamp),
            severity: Some(severity),
            service: Some(service.into()),
            message: Some(message.into()),
            ..Default::default()
        }
    }

    /// Raw field lookup (case-sensitive first, then case-insensitive).
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).or_else(|| {
            self.fields
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v)
        })
    }

    /// Field as a string, stringifying scalars.
    pub fn field_str(&self, name: &str) -> Option<String> {
        self.field(name).and_then(value_to_string)
    }

    /// Numeric field, accepting numbers encoded as strings.
    pub fn number(&self, name: &str) -> Option<f64> {
        match self.field(name)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Message text, falling back to a compact rendering of the fields.
    pub fn text(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| Value::Object(self.fields.clone()).to_string())
    }

    /// Whether the event text mentions any of the given lowercase keywords.
    pub fn mentions_any(&self, keywords: &[&str]) -> bool {
        let text = self.text().to_lowercase();
        keywords.iter().any(|k| text.contains(k))
    }
}

fn lookup<'a>(fields: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    for key in keys {
        if let Some(v) = fields.get(*key) {
            if !v.is_null() {
                return Some(v);
            }
        }
    }
    fields
        .iter()
        .find(|(k, v)| !v.is_null() && keys.iter().any(|key| k.eq_ignore_ascii_case(key)))
        .map(|(_, v)| v)
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn parse_timestamp_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| s.parse::<i64>().ok().and_then(epoch_to_datetime)),
        Value::Number(n) => n.as_i64().and_then(epoch_to_datetime),
        _ => None,
    }
}

/// Interpret an epoch value as seconds, milliseconds, or microseconds by magnitude.
pub(crate) fn epoch_to_datetime(raw: i64) -> Option<DateTime<Utc>> {
    let abs = raw.unsigned_abs();
    if abs >= 100_000_000_000_000 {
        Utc.timestamp_micros(raw).single()
    } else if abs >= 100_000_000_000 {
        Utc.timestamp_millis_opt(raw).single()
    } else {
        Utc.timestamp_opt(raw, 0).single()
    }
}
