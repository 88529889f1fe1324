use crate::{controller::health_check_controller, sse::handler, AppState};
use axum::{
    routing::{get, post},
    Json, Router,
};
use tower_http::services::ServeDir;

use crate::controller::{fact_controller, status_controller};

use utoipa::OpenApi;

// Global definition of the OpenAPI document. To be a part
// of the rendered document, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Fact Stream API"
        ),
        paths(
            fact_controller::create,
            status_controller::read,
            health_check_controller::health_check,
            handler::sse_handler,
        ),
        components(
            schemas(
                fact_controller::PublishedFact,
                status_controller::Status,
            )
        ),
        tags(
            (name = "fact_stream", description = "Real-time fact broadcasting over Server-Sent Events")
        )
    )]
struct ApiDoc;

pub fn define_routes(app_state: AppState) -> Router {
    let static_dir = app_state.config.static_dir.clone();

    Router::new()
        .merge(event_stream_routes(app_state.clone()))
        .merge(fact_routes(app_state.clone()))
        .merge(status_routes(app_state))
        .merge(health_routes())
        .merge(api_doc_routes())
        .fallback_service(static_routes(&static_dir))
}

fn event_stream_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/events", get(handler::sse_handler))
        .with_state(app_state)
}

fn fact_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/fact", post(fact_controller::create))
        .with_state(app_state)
}

fn status_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/status", get(status_controller::read))
        .with_state(app_state)
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

fn api_doc_routes() -> Router {
    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDoc::openapi()) }),
    )
}

// The frontend that renders the fact stream is served as plain static files
pub fn static_routes(static_dir: &str) -> ServeDir {
    ServeDir::new(static_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::test_support::{app_state, get as get_request, json_body};
    use axum::http::StatusCode;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_openapi_document_lists_every_route() {
        let response = define_routes(app_state(&[]))
            .oneshot(get_request("/api-docs/openapi.json"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let document = json_body(response).await;
        for path in ["/events", "/fact", "/status", "/health"] {
            assert!(
                document["paths"].get(path).is_some(),
                "{path} should be documented"
            );
        }
    }

    #[tokio::test]
    async fn test_unknown_route_falls_back_to_static_files() {
        let response = define_routes(app_state(&["--static-dir", "./does-not-exist"]))
            .oneshot(get_request("/nope.html"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
