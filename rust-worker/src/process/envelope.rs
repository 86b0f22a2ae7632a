//! Envelope decoding.
//!
//! A record body is either the message fields themselves, or a notification
//! envelope whose `Message` field holds those fields as a JSON-encoded string:
//!
//! ```text
//! {"to": "a@x.com", "origen": "b@x.com"}
//! {"Type": "Notification", "Message": "{\"to\":\"a@x.com\",\"origen\":\"b@x.com\"}"}
//! ```
//!
//! Unwrapping is exactly one level deep. If the inner message is another
//! envelope it is read as plain fields.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::RecordError;

/// Field holding the wrapped payload in a notification envelope.
const ENVELOPE_FIELD: &str = "Message";

/// Fields read from the effective payload. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MailFields {
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub cc: Option<String>,
    #[serde(default)]
    pub bcc: Option<String>,
    /// Sender address
    #[serde(default)]
    pub origen: Option<String>,
}

/// A validated mail request. `to` is always non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailRequest {
    pub to: String,
    pub cc: Option<String>,
    pub bcc: Option<String>,
    pub from: Option<String>,
}

impl MailFields {
    /// Validate the fields into a [`MailRequest`].
    ///
    /// Empty `cc`/`bcc` values are dropped rather than rejected.
    pub fn into_request(self) -> Result<MailRequest, RecordError> {
        let to = self
            .to
            .filter(|to| !to.is_empty())
            .ok_or(RecordError::MissingRecipient)?;

        Ok(MailRequest {
            to,
            cc: non_empty(self.cc),
            bcc: non_empty(self.bcc),
            from: self.origen,
        })
    }
}

/// Decode a record body, unwrapping one envelope layer if present.
pub fn decode_envelope(body: &str) -> Result<MailFields, RecordError> {
    let outer: Value = serde_json::from_str(body).map_err(RecordError::parse)?;

    let effective = match outer.get(ENVELOPE_FIELD) {
        Some(Value::String(inner)) => {
            debug!(inner_length = inner.len(), "envelope_unwrapped");
            serde_json::from_str(inner).map_err(RecordError::parse)?
        }
        Some(other) => {
            return Err(RecordError::Parse(format!(
                "{} field is not a string: {}",
                ENVELOPE_FIELD,
                json_type(other)
            )));
        }
        None => outer,
    };

    // Struct deserialization would otherwise accept arrays positionally
    if !effective.is_object() {
        return Err(RecordError::Parse(format!(
            "payload is not a JSON object: {}",
            json_type(&effective)
        )));
    }

    serde_json::from_value(effective).map_err(RecordError::parse)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_direct_payload() {
        let fields =
            decode_envelope(r#"{"to": "a@x.com", "cc": "c@x.com", "origen": "b@x.com"}"#).unwrap();

        assert_eq!(fields.to.as_deref(), Some("a@x.com"));
        assert_eq!(fields.cc.as_deref(), Some("c@x.com"));
        assert_eq!(fields.bcc, None);
        assert_eq!(fields.origen.as_deref(), Some("b@x.com"));
    }

    #[test]
    fn test_decode_envelope_uses_inner_fields() {
        let body = r#"{
            "Type": "Notification",
            "to": "outer@x.com",
            "Message": "{\"to\":\"a@x.com\",\"origen\":\"b@x.com\"}"
        }"#;

        let fields = decode_envelope(body).unwrap();

        assert_eq!(fields.to.as_deref(), Some("a@x.com"));
        assert_eq!(fields.origen.as_deref(), Some("b@x.com"));
    }

    #[test]
    fn test_decode_unwraps_only_one_level() {
        let inner = r#"{"Message": "{\"to\":\"deep@x.com\"}"}"#;
        let body = serde_json::json!({ "Message": inner }).to_string();

        let fields = decode_envelope(&body).unwrap();

        // The second wrapper is read as plain fields, so there is no recipient
        assert_eq!(fields.to, None);
    }

    #[test]
    fn test_decode_malformed_outer() {
        let err = decode_envelope("not json").unwrap_err();
        assert!(matches!(err, RecordError::Parse(_)));
    }

    #[test]
    fn test_decode_malformed_inner() {
        let err = decode_envelope(r#"{"Message": "{not json"}"#).unwrap_err();
        assert!(matches!(err, RecordError::Parse(_)));
    }

    #[test]
    fn test_decode_non_string_message() {
        let err = decode_envelope(r#"{"Message": {"to": "a@x.com"}}"#).unwrap_err();
        match err {
            RecordError::Parse(detail) => assert!(detail.contains("object")),
            other => panic!("Expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_non_object_payload() {
        assert!(matches!(
            decode_envelope(r#"["a@x.com"]"#),
            Err(RecordError::Parse(_))
        ));
        assert!(matches!(
            decode_envelope(r#"{"to": 42}"#),
            Err(RecordError::Parse(_))
        ));
    }

    #[test]
    fn test_into_request_requires_recipient() {
        let missing = MailFields::default().into_request();
        assert!(matches!(missing, Err(RecordError::MissingRecipient)));

        let empty = MailFields {
            to: Some(String::new()),
            ..Default::default()
        }
        .into_request();
        assert!(matches!(empty, Err(RecordError::MissingRecipient)));
    }

    #[test]
    fn test_into_request_keeps_blank_values() {
        let request = MailFields {
            to: Some("  ".to_string()),
            cc: Some(" ".to_string()),
            bcc: Some(" ".to_string()),
            origen: Some(String::new()),
        }
        .into_request()
        .unwrap();

        // Only truly empty values count as absent
        assert_eq!(request.to, "  ");
        assert_eq!(request.cc.as_deref(), Some(" "));
        assert_eq!(request.bcc.as_deref(), Some(" "));
        assert_eq!(request.from.as_deref(), Some(""));
    }

    #[test]
    fn test_into_request_drops_empty_copies() {
        let request = MailFields {
            to: Some("a@x.com".to_string()),
            cc: Some(String::new()),
            bcc: Some("d@x.com".to_string()),
            origen: None,
        }
        .into_request()
        .unwrap();

        assert_eq!(request.to, "a@x.com");
        assert_eq!(request.cc, None);
        assert_eq!(request.bcc.as_deref(), Some("d@x.com"));
        assert_eq!(request.from, None);
    }
}
