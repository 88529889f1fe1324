use anyhow::Result;
use eventsource_client::{self as es, Client};
use futures_util::stream::StreamExt;
use log::*;
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub struct Event {
    pub data: Value,
}

pub struct Connection {
    pub label: String,
    event_rx: mpsc::UnboundedReceiver<Event>,
    _handle: tokio::task::JoinHandle<()>,
}

impl Connection {
    pub async fn establish(base_url: &str, label: String) -> Result<Self> {
        let url = format!("{}/events", base_url);
        let (tx, rx) = mpsc::unbounded_channel();

        // Reconnecting would replay history and confuse the scenarios
        let client = es::ClientBuilder::for_url(&url)?
            .reconnect(es::ReconnectOptions::reconnect(false).build())
            .build();

        let stream_label = label.clone();
        let handle = tokio::spawn(async move {
            let mut stream = client.stream();

            loop {
                match stream.next().await {
                    Some(Ok(es::SSE::Event(event))) => match serde_json::from_str(&event.data) {
                        Ok(data) => {
                            if tx.send(Event { data }).is_err() {
                                debug!("SSE receiver dropped for {}", stream_label);
                                break;
                            }
                        }
                        Err(e) => warn!("Non-JSON SSE data for {}: {}", stream_label, e),
                    },
                    Some(Ok(es::SSE::Comment(_))) => {
                        // Ignore comments (keep-alive)
                    }
                    Some(Err(e)) => {
                        warn!("SSE error for {}: {}", stream_label, e);
                    }
                    None => {
                        debug!("SSE stream ended for {}", stream_label);
                        break;
                    }
                }
            }
        });

        Ok(Self {
            label,
            event_rx: rx,
            _handle: handle,
        })
    }

    /// The first message on every connection is the history snapshot.
    pub async fn wait_for_snapshot(&mut self, timeout: Duration) -> Result<Vec<Value>> {
        let event = self.next_event(timeout).await?;
        match event.data {
            Value::Array(envelopes) => Ok(envelopes),
            other => anyhow::bail!("Expected a snapshot array, got: {}", other),
        }
    }

    /// Wait for the live envelope carrying `sequence`, skipping earlier ones.
    pub async fn wait_for_sequence(&mut self, sequence: u64, timeout: Duration) -> Result<Event> {
        let deadline = Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let event = self.next_event(remaining).await?;

            match event.data["sequence"].as_u64() {
                Some(received) if received == sequence => return Ok(event),
                Some(received) if received < sequence => continue,
                Some(received) => {
                    anyhow::bail!("Expected sequence {}, got {}", sequence, received)
                }
                None => anyhow::bail!("Envelope without sequence: {}", event.data),
            }
        }
    }

    async fn next_event(&mut self, timeout: Duration) -> Result<Event> {
        if timeout.is_zero() {
            anyhow::bail!("Timeout waiting for event");
        }

        match tokio::time::timeout(timeout, self.event_rx.recv()).await {
            Ok(Some(event)) => Ok(event),
            Ok(None) => anyhow::bail!("SSE connection closed"),
            Err(_) => anyhow::bail!("Timeout waiting for event"),
        }
    }
}
