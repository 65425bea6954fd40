//! Upstream rate API boundary: error taxonomy, endpoint identifiers and
//! response decoding shared by upstream clients.

mod frankfurter;

use std::fmt::{Display, Formatter};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::http_client::{HttpError, HttpResponse};

pub use frankfurter::FrankfurterClient;

/// HTTP statuses that signal a transient upstream condition.
pub const TRANSIENT_STATUSES: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// Upstream resource, used to key circuit breakers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UpstreamEndpoint {
    Currencies,
    Latest,
    Historical,
}

impl UpstreamEndpoint {
    pub const ALL: [Self; 3] = [Self::Currencies, Self::Latest, Self::Historical];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Currencies => "currencies",
            Self::Latest => "latest",
            Self::Historical => "historical",
        }
    }
}

impl Display for UpstreamEndpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upstream failure classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamErrorKind {
    /// Transport failure, timeout or transient status. Retryable.
    Unavailable,
    /// Body failed to decode or violated the expected schema.
    Malformed,
    /// Non-transient, non-success status (e.g. 404 for an unknown base).
    Rejected,
    /// The endpoint's breaker refused the call.
    CircuitOpen,
}

/// Structured upstream error consumed by the resilience policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamError {
    kind: UpstreamErrorKind,
    message: String,
    status: Option<u16>,
}

impl UpstreamError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: UpstreamErrorKind::Unavailable,
            message: message.into(),
            status: None,
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            kind: UpstreamErrorKind::Malformed,
            message: message.into(),
            status: None,
        }
    }

    pub fn circuit_open(endpoint: UpstreamEndpoint) -> Self {
        Self {
            kind: UpstreamErrorKind::CircuitOpen,
            message: format!("circuit for '{endpoint}' is open; upstream call skipped"),
            status: None,
        }
    }

    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, body: &str) -> Self {
        let kind = if TRANSIENT_STATUSES.contains(&status) {
            UpstreamErrorKind::Unavailable
        } else {
            UpstreamErrorKind::Rejected
        };
        let detail = body.trim();
        let message = if detail.is_empty() {
            format!("upstream returned status {status}")
        } else {
            format!("upstream returned status {status}: {}", truncate(detail, 200))
        };

        Self {
            kind,
            message,
            status: Some(status),
        }
    }

    pub const fn kind(&self) -> UpstreamErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn status(&self) -> Option<u16> {
        self.status
    }

    /// Only `Unavailable` is worth another attempt.
    pub const fn retryable(&self) -> bool {
        matches!(self.kind, UpstreamErrorKind::Unavailable)
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            UpstreamErrorKind::Unavailable => "upstream.unavailable",
            UpstreamErrorKind::Malformed => "upstream.malformed",
            UpstreamErrorKind::Rejected => "upstream.rejected",
            UpstreamErrorKind::CircuitOpen => "upstream.circuit_open",
        }
    }
}

impl Display for UpstreamError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for UpstreamError {}

impl From<HttpError> for UpstreamError {
    fn from(error: HttpError) -> Self {
        if error.is_timeout() {
            Self::unavailable(format!("upstream timed out: {}", error.message()))
        } else {
            Self::unavailable(format!("upstream transport error: {}", error.message()))
        }
    }
}

/// Turn a transport outcome into a decoded record.
///
/// Top-level object keys are matched case-insensitively. Nested keys
/// (currency codes, dates) are left untouched.
pub(crate) fn decode_response<T>(
    outcome: Result<HttpResponse, HttpError>,
) -> Result<T, UpstreamError>
where
    T: DeserializeOwned,
{
    let value = read_json(outcome)?;
    serde_json::from_value(lowercase_top_level_keys(value))
        .map_err(|e| UpstreamError::malformed(format!("unexpected response shape: {e}")))
}

/// Like [`decode_response`] for payloads whose top-level keys are data
/// (e.g. the currency list), so key case is preserved.
pub(crate) fn decode_mapping<T>(
    outcome: Result<HttpResponse, HttpError>,
) -> Result<T, UpstreamError>
where
    T: DeserializeOwned,
{
    let value = read_json(outcome)?;
    serde_json::from_value(value)
        .map_err(|e| UpstreamError::malformed(format!("unexpected response shape: {e}")))
}

fn read_json(outcome: Result<HttpResponse, HttpError>) -> Result<Value, UpstreamError> {
    let response = outcome?;
    if !response.is_success() {
        return Err(UpstreamError::from_status(response.status, &response.body));
    }

    serde_json::from_str(&response.body)
        .map_err(|e| UpstreamError::malformed(format!("response is not valid JSON: {e}")))
}

fn lowercase_top_level_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key.to_ascii_lowercase(), value))
                .collect::<Map<String, Value>>(),
        ),
        other => other,
    }
}

fn truncate(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}
