//! Gatewatch Common - Shared protocol library for the security console
//!
//! This crate contains the backend wire types and parsing helpers used by
//! the CLI: the captured-request record, the live-feed envelope, and the
//! request/response payloads of every console endpoint.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Protocol errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Failed to decode message: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid message format")]
    InvalidFormat,
}

/// A request intercepted by the capture service, as the backend reports it.
///
/// The record is immutable on the client side: editing always goes through a
/// draft copy, never through the captured entry itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapturedRequest {
    /// Opaque unique token. The backend emits either a JSON number (database
    /// row id) or a string; both are accepted and normalized to a string.
    #[serde(deserialize_with = "lenient_id::deserialize")]
    pub id: String,

    /// HTTP method as observed (GET, POST, ...)
    pub method: String,

    /// Target URL as observed
    pub url: String,

    /// Request body, possibly absent or empty
    #[serde(default)]
    pub body: Option<String>,

    /// Legacy body field still emitted by older backend rows
    #[serde(default)]
    pub request_body: Option<String>,

    /// Header map, keys case-sensitive as received
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Classifier probability that the request is malicious
    #[serde(default)]
    pub malicious_prob: Option<f64>,

    /// Classifier verdict, when one has been computed
    #[serde(default)]
    pub malicious: Option<bool>,

    /// Disposition assigned by the proxy: pending, blocked, or forwarded
    #[serde(default)]
    pub status: Option<String>,

    /// Raw capture timestamp; see [`CapturedRequest::timestamp`]
    #[serde(default)]
    pub created_at: Option<String>,
}

impl CapturedRequest {
    /// Body text with the legacy-field fallback: `body` wins, then
    /// `request_body`, then empty.
    pub fn body_text(&self) -> &str {
        self.body
            .as_deref()
            .filter(|b| !b.is_empty())
            .or(self.request_body.as_deref())
            .unwrap_or("")
    }

    /// Parse `created_at` leniently. The backend stores timestamps in
    /// several formats (RFC 3339, ISO without zone, SQLite's
    /// `%Y-%m-%d %H:%M:%S[.f]`); naive values are taken as UTC.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        let raw = self.created_at.as_deref()?;

        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }

        const NAIVE_FORMATS: [&str; 4] = [
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%dT%H:%M:%S",
            "%Y-%m-%d %H:%M:%S%.f",
            "%Y-%m-%d %H:%M:%S",
        ];
        for format in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
                return Some(naive.and_utc());
            }
        }

        None
    }
}

/// One message on the live capture feed.
///
/// The backend wraps every push as `{"event": ..., "data": ...}`. Events the
/// client does not recognize decode to [`StreamEvent::Ignored`] so the
/// consumer can drop them without treating them as protocol failures.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// A newly captured request to add to the list
    NewRequest(CapturedRequest),

    /// A recognized envelope carrying an event this client does not handle
    Ignored { event: String },
}

/// Raw feed envelope before event dispatch
#[derive(Debug, Deserialize)]
struct StreamEnvelope {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

impl StreamEvent {
    /// Decode one feed message from its JSON text.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let envelope: StreamEnvelope = serde_json::from_str(text)?;
        match envelope.event.as_str() {
            "new_request" => {
                let request: CapturedRequest = serde_json::from_value(envelope.data)?;
                Ok(StreamEvent::NewRequest(request))
            }
            other => Ok(StreamEvent::Ignored {
                event: other.to_string(),
            }),
        }
    }
}

/// Structured request payload sent to `/analyze-request` and
/// `/replay-request`, and the shape a pasted raw request parses into.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestPayload {
    /// HTTP method (uppercased)
    pub method: String,

    /// Absolute URL when one could be reconstructed; callers must reject
    /// payloads whose URL is empty before dispatching
    pub url: String,

    /// Header map, last-wins on duplicate names
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Raw body text
    #[serde(default)]
    pub body: String,
}

/// Upstream response preview returned by `/replay-request`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponsePreview {
    /// Upstream status code
    pub status: u16,

    /// Upstream response headers
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Upstream body, truncated server-side for large responses
    #[serde(default)]
    pub body: String,
}

/// Error body the backend attaches to non-2xx responses
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<String>,
}

/// Ack for `/startproxy`
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CaptureStarted {
    pub running: bool,
}

/// Ack for `/stopproxy`
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CaptureStopped {
    pub stopped: bool,
}

/// Classifier verdict returned by `/analyze-request`
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeVerdict {
    /// Overall label: "Malicious" or "Normal"
    pub prediction: String,

    /// Confidence in the overall label, 0..1
    pub confidence: f64,

    /// Per-category scores (Normal, SQLi, XSS, Command Injection)
    #[serde(default)]
    pub probabilities: BTreeMap<String, f64>,

    /// Suspicious tokens found in the request
    #[serde(default, rename = "maliciousPatterns")]
    pub malicious_patterns: Vec<String>,

    /// Human-readable summary of the extracted features
    #[serde(default)]
    pub explanation: String,

    /// Raw model probability before thresholding
    #[serde(default, rename = "maliciousProbability")]
    pub malicious_probability: f64,

    /// Feature counts the model scored
    #[serde(default)]
    pub features: Option<FeatureCounts>,

    /// Echo of the analyzed request
    #[serde(default, rename = "requestDetails")]
    pub request_details: Option<RequestPayload>,
}

/// Feature counts extracted from a request for classification
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeatureCounts {
    pub single_q: u64,
    pub double_q: u64,
    pub dashes: u64,
    pub braces: u64,
    pub spaces: u64,
    pub badwords: u64,
}

/// Aggregate telemetry returned by `/dashboard-stats`
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardStats {
    pub totals: DashboardTotals,

    #[serde(default, rename = "trafficSeries")]
    pub traffic_series: Vec<TrafficPoint>,

    #[serde(default, rename = "attackDistribution")]
    pub attack_distribution: BTreeMap<String, u64>,

    #[serde(default)]
    pub blacklist: Vec<BlacklistEntry>,

    #[serde(default, rename = "recentRequests")]
    pub recent_requests: Vec<RecentRequest>,

    #[serde(default, rename = "statusBreakdown")]
    pub status_breakdown: StatusBreakdown,
}

/// Headline counters for the dashboard
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardTotals {
    #[serde(default)]
    pub requests: u64,
    #[serde(default)]
    pub blocked: u64,
    #[serde(default)]
    pub forwarded: u64,
    #[serde(default)]
    pub pending: u64,
    #[serde(default, rename = "detectionRate")]
    pub detection_rate: f64,
    #[serde(default, rename = "uniqueTargets")]
    pub unique_targets: u64,
}

/// One hourly traffic bucket
#[derive(Debug, Clone, Deserialize)]
pub struct TrafficPoint {
    pub label: String,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub blocked: u64,
}

/// Request disposition counts
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusBreakdown {
    #[serde(default)]
    pub blocked: u64,
    #[serde(default)]
    pub forwarded: u64,
    #[serde(default)]
    pub pending: u64,
}

/// High-probability offender surfaced on the dashboard blacklist
#[derive(Debug, Clone, Deserialize)]
pub struct BlacklistEntry {
    #[serde(deserialize_with = "lenient_id::deserialize")]
    pub id: String,
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub pattern: String,
    #[serde(default)]
    pub probability: f64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub detected_at: Option<String>,
    #[serde(default, rename = "attackType")]
    pub attack_type: String,
}

/// Recent request row on the dashboard
#[derive(Debug, Clone, Deserialize)]
pub struct RecentRequest {
    #[serde(deserialize_with = "lenient_id::deserialize")]
    pub id: String,
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub malicious_prob: f64,
    #[serde(default)]
    pub malicious: bool,
    #[serde(default, rename = "attackType")]
    pub attack_type: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Reputation verdict returned by `/check-url`
#[derive(Debug, Clone, Deserialize)]
pub struct ReputationVerdict {
    #[serde(default)]
    pub success: bool,

    /// Raw provider response; the backend forwards it unmodified
    #[serde(default)]
    pub phishtank_response: serde_json::Value,
}

/// Accept a captured-request id as either a JSON string or number
mod lenient_id {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(s) => Ok(s),
            serde_json::Value::Number(n) => Ok(n.to_string()),
            other => Err(serde::de::Error::custom(format!(
                "expected string or number id, got {}",
                other
            ))),
        }
    }
}

/// Constants for the console protocol
pub mod constants {
    /// Default backend base URL
    pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

    /// Snapshot of currently known captured requests
    pub const SNAPSHOT_PATH: &str = "/pendingRequests";

    /// Live capture feed (WebSocket)
    pub const STREAM_PATH: &str = "/ws";

    /// Start traffic capture
    pub const START_CAPTURE_PATH: &str = "/startproxy";

    /// Stop traffic capture
    pub const STOP_CAPTURE_PATH: &str = "/stopproxy";

    /// Replay an edited request against its target
    pub const REPLAY_PATH: &str = "/replay-request";

    /// Classify a pasted request
    pub const ANALYZE_PATH: &str = "/analyze-request";

    /// Aggregate dashboard telemetry
    pub const DASHBOARD_PATH: &str = "/dashboard-stats";

    /// URL reputation lookup
    pub const CHECK_URL_PATH: &str = "/check-url";

    /// Maximum consecutive stream reconnect attempts before giving up
    pub const MAX_RECONNECT_ATTEMPTS: u32 = 10;

    /// Fixed delay between stream reconnect attempts (milliseconds)
    pub const RECONNECT_DELAY_MS: u64 = 2000;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_event_new_request() {
        let text = r#"{"event":"new_request","data":{"id":7,"method":"POST","url":"https://example.com/login","body":"u=a","headers":{"Host":"example.com"},"malicious":true,"malicious_prob":0.91,"status":"blocked","created_at":"2025-03-01 10:22:07"}}"#;

        match StreamEvent::parse(text).unwrap() {
            StreamEvent::NewRequest(req) => {
                assert_eq!(req.id, "7");
                assert_eq!(req.method, "POST");
                assert_eq!(req.headers["Host"], "example.com");
                assert_eq!(req.malicious, Some(true));
                assert_eq!(req.status.as_deref(), Some("blocked"));
            }
            other => panic!("Wrong event: {:?}", other),
        }
    }

    #[test]
    fn test_stream_event_unknown_is_ignored() {
        match StreamEvent::parse(r#"{"event":"ping"}"#).unwrap() {
            StreamEvent::Ignored { event } => assert_eq!(event, "ping"),
            other => panic!("Wrong event: {:?}", other),
        }
    }

    #[test]
    fn test_stream_event_bad_json_is_an_error() {
        assert!(StreamEvent::parse("not json").is_err());
        assert!(StreamEvent::parse(r#"{"event":"new_request","data":{"nope":1}}"#).is_err());
    }

    #[test]
    fn test_captured_request_string_id() {
        let req: CapturedRequest =
            serde_json::from_str(r#"{"id":"abc-1","method":"GET","url":"https://x.dev/"}"#)
                .unwrap();
        assert_eq!(req.id, "abc-1");
        assert!(req.headers.is_empty());
        assert_eq!(req.body_text(), "");
    }

    #[test]
    fn test_body_falls_back_to_legacy_field() {
        let req: CapturedRequest = serde_json::from_str(
            r#"{"id":1,"method":"POST","url":"https://x.dev/","request_body":"legacy"}"#,
        )
        .unwrap();
        assert_eq!(req.body_text(), "legacy");

        let req: CapturedRequest = serde_json::from_str(
            r#"{"id":1,"method":"POST","url":"https://x.dev/","body":"current","request_body":"legacy"}"#,
        )
        .unwrap();
        assert_eq!(req.body_text(), "current");
    }

    #[test]
    fn test_timestamp_formats() {
        let mut req: CapturedRequest =
            serde_json::from_str(r#"{"id":1,"method":"GET","url":"/"}"#).unwrap();
        assert!(req.timestamp().is_none());

        for raw in [
            "2025-03-01T10:22:07+00:00",
            "2025-03-01T10:22:07.123456",
            "2025-03-01 10:22:07",
            "2025-03-01 10:22:07.123456",
        ] {
            req.created_at = Some(raw.to_string());
            let ts = req.timestamp().unwrap_or_else(|| panic!("failed on {raw}"));
            assert_eq!(ts.date_naive().to_string(), "2025-03-01");
        }

        req.created_at = Some("yesterday-ish".to_string());
        assert!(req.timestamp().is_none());
    }

    #[test]
    fn test_analyze_verdict_decodes_camel_case() {
        let text = r#"{
            "prediction": "Malicious",
            "confidence": 0.93,
            "probabilities": {"Normal": 0.07, "SQLi": 0.8},
            "maliciousPatterns": ["or 1=1", "--"],
            "explanation": "Detected 2 suspicious token(s).",
            "maliciousProbability": 0.93,
            "features": {"single_q": 2, "double_q": 0, "dashes": 1, "braces": 0, "spaces": 4, "badwords": 2},
            "requestDetails": {"method": "GET", "url": "https://x.dev/?id=1' or 1=1 --", "headers": {}, "body": ""}
        }"#;

        let verdict: AnalyzeVerdict = serde_json::from_str(text).unwrap();
        assert_eq!(verdict.prediction, "Malicious");
        assert_eq!(verdict.malicious_patterns.len(), 2);
        assert_eq!(verdict.features.unwrap().badwords, 2);
        assert_eq!(verdict.request_details.unwrap().method, "GET");
    }

    #[test]
    fn test_error_body_tolerates_missing_detail() {
        let body: ErrorBody = serde_json::from_str("{}").unwrap();
        assert!(body.detail.is_none());

        let body: ErrorBody = serde_json::from_str(r#"{"detail":"URL is required"}"#).unwrap();
        assert_eq!(body.detail.as_deref(), Some("URL is required"));
    }
}
