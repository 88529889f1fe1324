use crate::{AppState, Error};
use async_stream::stream;
use axum::extract::State;
use axum::http::header;
use axum::response::sse::{KeepAlive, Sse};
use axum::response::IntoResponse;
use log::*;
use sse::{worker, SseTransport, Subscription};
use std::time::Duration;

/// SSE handler that establishes a long-lived connection streaming every published fact.
///
/// The first message carries the recent history as a JSON array; each later message
/// carries one JSON envelope. The stream ends when the hub closes the subscriber.
#[utoipa::path(
    get,
    path = "/events",
    responses(
        (status = 200, description = "Event stream of published facts", content_type = "text/event-stream", body = String),
        (status = 503, description = "Subscriber limit reached")
    )
)]
pub(crate) async fn sse_handler(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, Error> {
    let Subscription { handle, snapshot } = app_state.hub_ref().subscribe()?;

    debug!(
        "Establishing SSE connection for subscriber {} ({} facts replayed)",
        handle.id(),
        snapshot.len()
    );

    let (transport, mut rx) = SseTransport::channel();
    let subscriber_id = handle.id().clone();

    // The delivery worker owns the subscriber from here; when the client goes away
    // the receiver below is dropped and the worker unsubscribes.
    worker::spawn(app_state.hub.clone(), handle, transport);

    let stream = stream! {
        while let Some(event) = rx.recv().await {
            yield event;
        }

        debug!("SSE stream finished for subscriber {subscriber_id}");
    };

    let keep_alive =
        KeepAlive::new().interval(Duration::from_secs(app_state.config.keep_alive_secs.max(1)));

    Ok((
        [(header::CONNECTION, "keep-alive")],
        Sse::new(stream).keep_alive(keep_alive),
    ))
}
