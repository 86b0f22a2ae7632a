//! Batch event and response types.
//!
//! These mirror the queue-triggered invocation format: a batch of records whose
//! `body` is an opaque string, and a response object with a status code and a
//! JSON-encoded body.

use serde::{Deserialize, Serialize};

/// JSON-encoded body of every invocation response.
pub const PROCESSED_BODY: &str = r#""Mensajes procesados.""#;

// =============================================================================
// Inbound Types
// =============================================================================

/// A batch of raw records handed over by the transport.
///
/// A missing `Records` key is treated as an empty batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchEvent {
    /// Records in delivery order
    #[serde(rename = "Records", default)]
    pub records: Vec<RawRecord>,
}

impl BatchEvent {
    /// Create a batch from a list of records.
    pub fn new(records: Vec<RawRecord>) -> Self {
        Self { records }
    }

    /// Create a batch holding exactly one record.
    pub fn single(record: RawRecord) -> Self {
        Self::new(vec![record])
    }
}

/// One record of a batch. Every field other than `body` is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRecord {
    /// Raw payload, either a direct message or a notification envelope
    #[serde(default)]
    pub body: Option<String>,
}

impl RawRecord {
    /// Create a record with the given body.
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
        }
    }

    /// Create a record from a queue delivery payload.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self::new(String::from_utf8_lossy(data))
    }

    /// The record body, or `None` when it is absent or empty.
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref().filter(|b| !b.is_empty())
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// Result returned to the transport after a batch has been processed.
///
/// The status is always 200; per-record failures are only visible in the logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

impl InvocationResponse {
    /// The fixed "messages processed" response.
    pub fn processed() -> Self {
        Self {
            status_code: 200,
            body: PROCESSED_BODY.to_string(),
        }
    }
}
