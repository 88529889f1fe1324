//! Server-Sent Events (SSE) broadcast hub.
//!
//! This crate fans published facts out to any number of long-lived SSE
//! connections without letting a slow or disconnected client block producers
//! or grow memory without bound.
//!
//! # Architecture
//!
//! - **Single hub per process**: A [`Hub`] owns the subscriber registry, the bounded
//!   history buffer and the sequence counter. Producers call `publish`, connections
//!   call `subscribe`/`unsubscribe`.
//! - **Bounded per-subscriber queues**: `publish` only ever enqueues. A full queue is
//!   resolved by the hub's [`OverflowPolicy`], never by blocking the producer.
//! - **One delivery worker per subscriber**: Each connection gets its own task that
//!   drains the queue into a [`Transport`], so one slow network never stalls another.
//! - **History replay**: New subscribers first receive the last N envelopes as a single
//!   snapshot frame, then live events, with nothing missed or duplicated in between.
//!
//! # Message Flow
//!
//! 1. Client opens `/events`; the handler calls `hub.subscribe()`
//! 2. The subscriber is registered and its snapshot queued under the hub lock
//! 3. `worker::spawn` starts the delivery worker with an [`SseTransport`]
//! 4. A producer posts a fact; `hub.publish()` stamps it with the next sequence,
//!    appends it to history and enqueues it on every subscriber
//! 5. Each worker encodes its frames as JSON and writes them to the response stream
//! 6. When the client disconnects the transport closes and the worker unsubscribes
//!
//! # Example
//!
//! ```rust,ignore
//! use sse::{worker, Hub, HubConfig, SseTransport, Subscription};
//!
//! let hub = Arc::new(Hub::new(HubConfig::default()));
//! let Subscription { handle, .. } = hub.subscribe()?;
//! let (transport, receiver) = SseTransport::channel();
//! worker::spawn(hub.clone(), handle, transport);
//!
//! let sequence = hub.publish(Payload::text("Sharks are older than trees", 1024)?);
//! ```
//!
//! # Modules
//!
//! - `config`: Hub sizing and the overflow policy
//! - `connection`: Subscriber, its bounded queue and lifecycle, and type-safe SubscriberId
//! - `error`: Hub error type and kinds
//! - `history`: Bounded ring of recent envelopes
//! - `hub`: The broadcast hub itself
//! - `message`: Frame types and their JSON encoding
//! - `transport`: Transport trait and the axum SSE implementation
//! - `worker`: Per-subscriber delivery loop

pub mod config;
pub mod connection;
pub mod error;
pub mod history;
pub mod hub;
pub mod message;
pub mod transport;
pub mod worker;

pub use config::{HubConfig, OverflowPolicy};
pub use connection::{SubscriberHandle, SubscriberId, SubscriberState};
pub use error::{Error, ErrorKind};
pub use hub::{Hub, Subscription};
pub use transport::{SseTransport, Transport};
