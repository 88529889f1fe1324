//! Event envelope types for the fact stream.
//!
//! This crate defines the unit of published data that flows from producers,
//! through the broadcast hub, and out to every connected subscriber.
//!
//! # Types
//!
//! - **Payload**: A validated JSON value submitted by a producer. Validation happens
//!   before a payload can reach the hub, so nothing invalid ever enters history.
//! - **Envelope**: An immutable payload stamped with its sequence number and publish time.
//!
//! This crate has no dependencies on internal crates, so both the hub (`sse`) and the
//! HTTP layer (`web`) can share it without circular dependencies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::error::Error as StdError;
use std::fmt;

/// Sequence numbers are assigned by a hub, start at 1 and increase by exactly 1.
pub type Sequence = u64;

/// Reasons a producer-submitted payload is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// JSON `null` carries no fact.
    Null,
    /// Text payloads must contain at least one non-whitespace character.
    EmptyText,
    /// Object payloads must contain at least one field.
    EmptyObject,
    /// The serialized payload exceeds the configured limit.
    TooLarge { size: usize, max: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Null => write!(f, "payload must not be null"),
            Error::EmptyText => write!(f, "payload text must not be empty"),
            Error::EmptyObject => write!(f, "payload object must not be empty"),
            Error::TooLarge { size, max } => {
                write!(f, "payload is {size} bytes, exceeding the {max} byte limit")
            }
        }
    }
}

impl StdError for Error {}

/// A producer-submitted fact that passed validation.
///
/// Serializes transparently as the wrapped JSON value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(Value);

impl Payload {
    /// Validates `value` and wraps it. `max_bytes` bounds the serialized size.
    pub fn new(value: Value, max_bytes: usize) -> Result<Self, Error> {
        match &value {
            Value::Null => return Err(Error::Null),
            Value::String(text) if text.trim().is_empty() => return Err(Error::EmptyText),
            Value::Object(map) if map.is_empty() => return Err(Error::EmptyObject),
            _ => {}
        }

        let size = serde_json::to_vec(&value)
            .map(|bytes| bytes.len())
            .unwrap_or(usize::MAX);
        if size > max_bytes {
            return Err(Error::TooLarge {
                size,
                max: max_bytes,
            });
        }

        Ok(Self(value))
    }

    /// Shorthand for a plain text payload.
    pub fn text(text: impl Into<String>, max_bytes: usize) -> Result<Self, Error> {
        Self::new(Value::String(text.into()), max_bytes)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

/// One published item plus its ordering metadata. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    sequence: Sequence,
    payload: Payload,
    published_at: DateTime<Utc>,
}

impl Envelope {
    /// Stamps `payload` with `sequence` and the current time.
    pub fn new(sequence: Sequence, payload: Payload) -> Self {
        Self {
            sequence,
            payload,
            published_at: Utc::now(),
        }
    }

    pub fn sequence(&self) -> Sequence {
        self.sequence
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const MAX: usize = 1024;

    #[test]
    fn test_payload_accepts_text_and_structured_values() {
        assert!(Payload::text("Shark teeth are made of enamel", MAX).is_ok());
        assert!(Payload::new(json!({"info": "fact", "source": "web"}), MAX).is_ok());
        assert!(Payload::new(json!(42), MAX).is_ok());
        assert!(Payload::new(json!(["a", "b"]), MAX).is_ok());
    }

    #[test]
    fn test_payload_rejects_null() {
        assert_eq!(Payload::new(Value::Null, MAX), Err(Error::Null));
    }

    #[test]
    fn test_payload_rejects_blank_text() {
        assert_eq!(Payload::text("", MAX), Err(Error::EmptyText));
        assert_eq!(Payload::text("  \n\t", MAX), Err(Error::EmptyText));
    }

    #[test]
    fn test_payload_rejects_empty_object() {
        assert_eq!(Payload::new(json!({}), MAX), Err(Error::EmptyObject));
    }

    #[test]
    fn test_payload_rejects_oversized_value() {
        let text = "x".repeat(MAX);
        // Serialized form includes the surrounding quotes
        assert_eq!(
            Payload::text(text, MAX),
            Err(Error::TooLarge {
                size: MAX + 2,
                max: MAX
            })
        );
    }

    #[test]
    fn test_envelope_serializes_payload_transparently() {
        let payload = Payload::new(json!({"info": "fact"}), MAX).unwrap();
        let envelope = Envelope::new(7, payload);

        let value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(value["sequence"], json!(7));
        assert_eq!(value["payload"], json!({"info": "fact"}));
        assert!(value["published_at"].is_string());
    }
}
