use axum::http::{header::CONTENT_TYPE, HeaderValue, Method};
use log::*;
use ::sse::Hub;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

pub use error::{Error, Result};
pub use service::AppState;

mod controller;
mod error;
pub mod router;
mod sse;

/// Binds the configured interface and port and serves the API until Ctrl-C.
///
/// On shutdown the hub unsubscribes every subscriber, so open event streams
/// deliver what is still queued and then end, letting in-flight responses finish.
pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let listen_addr = format!(
        "{}:{}",
        app_state.config.interface(),
        app_state.config.port
    );

    let cors_layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE])
        .allow_origin(allowed_origins(&app_state.config.allowed_origins));

    let hub = app_state.hub.clone();
    let router = router::define_routes(app_state).layer(cors_layer);

    info!("Server starting... listening for connections on http://{listen_addr}");

    let listener = TcpListener::bind(&listen_addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(hub))
        .await
}

fn allowed_origins(origins: &[String]) -> Vec<HeaderValue> {
    origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin {origin}: {e}");
                None
            }
        })
        .collect()
}

async fn shutdown_signal(hub: Arc<Hub>) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received, closing event streams"),
        Err(e) => error!("Failed to listen for the shutdown signal: {e}"),
    }

    hub.shutdown();
}
