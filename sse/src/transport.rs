use crate::error::{Error, ErrorKind};
use async_trait::async_trait;
use axum::response::sse::Event;
use std::convert::Infallible;
use tokio::sync::mpsc;

/// Frames in flight between a delivery worker and the HTTP response body.
/// Anything beyond this waits in the subscriber queue, where the overflow policy applies.
const FRAME_BUFFER: usize = 1;

/// Outbound side of one client connection.
///
/// A delivery worker hands every encoded frame to `send`, and watches `closed`
/// to learn that the client went away while nothing was being written.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Write one event-stream message whose `data` field is `data`.
    async fn send(&mut self, data: String) -> Result<(), Error>;

    /// Resolves once the connection can no longer accept writes.
    async fn closed(&self);
}

/// Transport backed by an axum `Sse` response stream.
///
/// The receiver returned from [`SseTransport::channel`] becomes the response body;
/// axum frames each event as `data: <json>\n\n`. When the client disconnects axum
/// drops the stream, which closes the channel.
pub struct SseTransport {
    sender: mpsc::Sender<Result<Event, Infallible>>,
}

impl SseTransport {
    pub fn channel() -> (Self, mpsc::Receiver<Result<Event, Infallible>>) {
        let (sender, receiver) = mpsc::channel(FRAME_BUFFER);
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl Transport for SseTransport {
    async fn send(&mut self, data: String) -> Result<(), Error> {
        self.sender
            .send(Ok(Event::default().data(data)))
            .await
            .map_err(|_| Error::new(ErrorKind::TransportWriteFailed))
    }

    async fn closed(&self) {
        self.sender.closed().await
    }
}
