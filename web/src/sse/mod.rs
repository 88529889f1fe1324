//! SSE HTTP handler for the web layer.
//!
//! This module contains only the Axum handler for the event stream endpoint.
//! The broadcast hub, delivery workers and transport live in the `sse` crate.

pub mod handler;
