use events::Envelope;
use std::sync::Arc;

/// One unit of outbound data for a subscriber.
///
/// The first frame a subscriber receives is always its history `Snapshot`;
/// everything after that is a live `Event`.
#[derive(Debug, Clone)]
pub enum Frame {
    Snapshot(Vec<Arc<Envelope>>),
    Event(Arc<Envelope>),
}

impl Frame {
    /// Serialize the frame as the `data` field of an event-stream message.
    ///
    /// Snapshots encode as a JSON array of envelopes, events as one JSON envelope.
    /// `serde_json` escapes newlines inside strings, so the output is always a
    /// single line.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        match self {
            Frame::Snapshot(envelopes) => {
                let envelopes: Vec<&Envelope> = envelopes.iter().map(Arc::as_ref).collect();
                serde_json::to_string(&envelopes)
            }
            Frame::Event(envelope) => serde_json::to_string(envelope.as_ref()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use events::Payload;
    use serde_json::{json, Value};

    fn envelope(sequence: u64, text: &str) -> Arc<Envelope> {
        Arc::new(Envelope::new(sequence, Payload::text(text, 1024).unwrap()))
    }

    #[test]
    fn test_empty_snapshot_encodes_as_empty_array() {
        assert_eq!(Frame::Snapshot(Vec::new()).encode().unwrap(), "[]");
    }

    #[test]
    fn test_snapshot_encodes_envelopes_oldest_first() {
        let frame = Frame::Snapshot(vec![envelope(2, "b"), envelope(3, "c")]);

        let value: Value = serde_json::from_str(&frame.encode().unwrap()).unwrap();
        let payloads: Vec<&Value> = value
            .as_array()
            .unwrap()
            .iter()
            .map(|e| &e["payload"])
            .collect();

        assert_eq!(payloads, vec![&json!("b"), &json!("c")]);
    }

    #[test]
    fn test_event_with_newlines_encodes_on_one_line() {
        let frame = Frame::Event(envelope(1, "line one\nline two"));

        let data = frame.encode().unwrap();

        assert!(!data.contains('\n'));
        let value: Value = serde_json::from_str(&data).unwrap();
        assert_eq!(value["payload"], json!("line one\nline two"));
        assert_eq!(value["sequence"], json!(1));
    }
}
