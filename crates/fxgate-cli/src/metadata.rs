use std::fmt::{Display, Formatter};

use fxgate_core::ProviderId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request identifier (UUID v4) correlating output with log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Metadata attached to every command result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub request_id: RequestId,
    pub provider: ProviderId,
    pub command: String,
    pub latency_ms: u64,
}

/// Output envelope printed on stdout.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T> {
    pub meta: Metadata,
    pub data: T,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_id_is_uuid_v4() {
        let request_id = RequestId::new_v4();
        assert_eq!(request_id.0.get_version_num(), 4);
    }

    #[test]
    fn envelope_serializes_meta_before_data() {
        let request_id = RequestId(
            Uuid::parse_str("123e4567-e89b-42d3-a456-426614174000").expect("valid uuid"),
        );
        let envelope = Envelope {
            meta: Metadata {
                request_id,
                provider: ProviderId::Frankfurter,
                command: String::from("latest"),
                latency_ms: 42,
            },
            data: serde_json::json!({"base": "EUR"}),
        };

        let rendered = serde_json::to_string(&envelope).expect("serializes");
        assert_eq!(
            rendered,
            "{\"meta\":{\"request_id\":\"123e4567-e89b-42d3-a456-426614174000\",\
\"provider\":\"frankfurter\",\"command\":\"latest\",\"latency_ms\":42},\
\"data\":{\"base\":\"EUR\"}}"
        );
    }
}
