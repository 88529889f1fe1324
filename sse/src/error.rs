//! Error types for the broadcast hub.
use std::error::Error as StdError;
use std::fmt;

/// Hub error type.
///
/// Mirrors the layered error design used across the workspace: an `error_kind`
/// the HTTP layer can map to a status code, plus the optional lower-level `source`
/// that caused it. Errors from the `events` crate are translated into hub errors
/// through `From`, so callers only ever see `sse::error::Error`.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// The kinds of failures the hub can observe.
///
/// Only `ResourceExhausted` and `InvalidPayload` are ever returned to callers.
/// `QueueOverflow`, `TransportWriteFailed` and `EncodingFailed` are local to one subscriber: they are
/// recorded as that subscriber's last error and resolved by closing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// `subscribe` was rejected because the hub is at its subscriber limit.
    ResourceExhausted,
    /// A subscriber's queue was full under the disconnect-slow-consumer policy.
    QueueOverflow,
    /// The transport refused a write, usually because the client went away.
    TransportWriteFailed,
    /// A frame could not be serialized for delivery.
    EncodingFailed,
    /// A producer submitted a payload that failed validation.
    InvalidPayload(String),
}

impl Error {
    pub fn new(error_kind: ErrorKind) -> Self {
        Self {
            source: None,
            error_kind,
        }
    }

    pub fn with_source(
        error_kind: ErrorKind,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            source: Some(Box::new(source)),
            error_kind,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ErrorKind::ResourceExhausted => write!(f, "subscriber limit reached"),
            ErrorKind::QueueOverflow => write!(f, "subscriber queue overflowed"),
            ErrorKind::TransportWriteFailed => write!(f, "transport write failed"),
            ErrorKind::EncodingFailed => write!(f, "frame encoding failed"),
            ErrorKind::InvalidPayload(reason) => write!(f, "invalid payload: {reason}"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Hub Error: {}", self.error_kind)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

// Payload validation happens in the `events` crate; surface it as a hub error.
impl From<events::Error> for Error {
    fn from(err: events::Error) -> Self {
        Error::with_source(ErrorKind::InvalidPayload(err.to_string()), err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_error_translates_to_invalid_payload() {
        let err: Error = events::Error::Null.into();

        assert_eq!(
            err.error_kind,
            ErrorKind::InvalidPayload("payload must not be null".to_string())
        );
        assert!(StdError::source(&err).is_some());
    }

    #[test]
    fn test_display_includes_kind() {
        let err = Error::new(ErrorKind::ResourceExhausted);
        assert_eq!(err.to_string(), "Hub Error: subscriber limit reached");
    }
}
