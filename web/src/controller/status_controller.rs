use crate::controller::ApiResponse;
use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use events::Sequence;
use serde::Serialize;
use utoipa::ToSchema;

use log::*;

/// Current state of the broadcast hub.
#[derive(Debug, Serialize, ToSchema)]
pub struct Status {
    /// Number of currently connected event stream subscribers.
    pub active_subscribers: usize,
    /// Sequence of the most recently published fact, absent before the first one.
    #[schema(value_type = Option<u64>)]
    pub last_sequence: Option<Sequence>,
}

/// GET the number of active subscribers and the latest published sequence
#[utoipa::path(
    get,
    path = "/status",
    responses(
        (status = 200, description = "Successfully retrieved hub status", body = Status),
    )
)]
pub async fn read(State(app_state): State<AppState>) -> impl IntoResponse {
    let hub = app_state.hub_ref();
    let status = Status {
        active_subscribers: hub.snapshot(),
        last_sequence: hub.last_sequence(),
    };

    debug!("GET Status: {status:?}");

    Json(ApiResponse::new(StatusCode::OK.into(), status))
}

#[cfg(test)]
mod tests {
    use crate::controller::test_support::{app_state, get, json_body};
    use crate::router::define_routes;
    use axum::http::StatusCode;
    use events::Payload;
    use serde_json::json;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_read_reports_empty_hub() {
        let response = define_routes(app_state(&[]))
            .oneshot(get("/status"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({"status_code": 200, "data": {"active_subscribers": 0, "last_sequence": null}})
        );
    }

    #[tokio::test]
    async fn test_read_reports_subscribers_and_last_sequence() {
        let app_state = app_state(&[]);
        let hub = app_state.hub_ref();
        let _first = hub.subscribe().unwrap();
        let _second = hub.subscribe().unwrap();
        hub.publish(Payload::text("one", 64).unwrap());
        hub.publish(Payload::text("two", 64).unwrap());

        let response = define_routes(app_state.clone())
            .oneshot(get("/status"))
            .await
            .unwrap();

        assert_eq!(
            json_body(response).await["data"],
            json!({"active_subscribers": 2, "last_sequence": 2})
        );
    }
}
