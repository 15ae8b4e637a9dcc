//! Opaque pagination cursor for time-ordered scans.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::errors::{DomainError, DomainResult};

const CURSOR_PREFIX: &str = "v1.";

/// Scan direction relative to the cursor timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorDirection {
    /// Continue with events after the timestamp.
    Forward,
    /// Continue with events before the timestamp.
    Backward,
}

/// Position within a time-ordered result stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeCursor {
    pub timestamp: DateTime<Utc>,
    pub limit: u32,
    pub direction: CursorDirection,
}

#[derive(Serialize, Deserialize)]
struct WireCursor {
    /// Microseconds since the epoch.
    t: i64,
    l: u32,
    d: char,
}

impl TimeCursor {
    pub fn new(timestamp: DateTime<Utc>, limit: u32, direction: CursorDirection) -> Self {
        Self {
            timestamp,
            limit,
            direction,
        }
    }

    /// Encode as a URL-safe token.
    pub fn encode(&self) -> String {
        let wire = WireCursor {
            t: self.timestamp.timestamp_micros(),
            l: self.limit,
            d: match self.direction {
                CursorDirection::Forward => 'f',
                CursorDirection::Backward => 'b',
            },
        };
        // WireCursor has only primitive fields, serialization cannot fail.
        let json = serde_json::to_vec(&wire).unwrap_or_default();
        format!("{CURSOR_PREFIX}{}", URL_SAFE_NO_PAD.encode(json))
    }

    /// Decode a token produced by [`TimeCursor::encode`].
    pub fn decode(token: &str) -> DomainResult<Self> {
        let body = token
            .strip_prefix(CURSOR_PREFIX)
            .ok_or_else(|| DomainError::InvalidCursor("unknown cursor version".to_string()))?;
        let bytes = URL_SAFE_NO_PAD
            .decode(body)
            .map_err(|e| DomainError::InvalidCursor(e.to_string()))?;
        let wire: WireCursor =
            serde_json::from_slice(&bytes).map_err(|e| DomainError::InvalidCursor(e.to_string()))?;

        let timestamp = DateTime::<Utc>::from_timestamp_micros(wire.t)
            .ok_or_else(|| DomainError::InvalidCursor(format!("timestamp out of range: {}", wire.t)))?;
        let direction = match wire.d {
            'f' => CursorDirection::Forward,
            'b' => CursorDirection::Backward,
            other => {
                return Err(DomainError::InvalidCursor(format!("unknown direction '{other}'")));
            }
        };
        if wire.l == 0 {
            return Err(DomainError::InvalidCursor("limit must be positive".to_string()));
        }

        Ok(Self {
            timestamp,
            limit: wire.l,
            direction,
        })
    }

    /// Filter clause continuing a scan from this cursor.
    pub fn continuation_filter(&self) -> String {
        let op = match self.direction {
            CursorDirection::Forward => ">",
            CursorDirection::Backward => "<",
        };
        format!("$m.timestamp {op} timestamp('{}')", self.timestamp.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_rejects_unknown_version() {
        assert!(matches!(
            TimeCursor::decode("v2.abc"),
            Err(DomainError::InvalidCursor(_))
        ));
    }

    #[test]
    fn test_rejects_garbage_body() {
        assert!(TimeCursor::decode("v1.!!!").is_err());
        let not_json = format!("v1.{}", URL_SAFE_NO_PAD.encode(b"hello"));
        assert!(TimeCursor::decode(&not_json).is_err());
    }

    #[test]
    fn test_continuation_filter_direction() {
        let ts = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();
        let forward = TimeCursor::new(ts, 100, CursorDirection::Forward);
        assert!(forward.continuation_filter().contains('>'));
        let backward = TimeCursor::new(ts, 100, CursorDirection::Backward);
        assert!(backward.continuation_filter().contains('<'));
    }
}
