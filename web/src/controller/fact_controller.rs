use crate::controller::ApiResponse;
use crate::{AppState, Error};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use events::{Payload, Sequence};
use serde::Serialize;
use serde_json::Value;
use sse::error::{Error as HubError, ErrorKind};
use utoipa::ToSchema;

use log::*;

/// Sequence number assigned to a newly published fact.
#[derive(Debug, Serialize, ToSchema)]
pub struct PublishedFact {
    #[schema(value_type = u64)]
    pub sequence: Sequence,
}

/// POST submit a new fact and broadcast it to every connected subscriber
#[utoipa::path(
    post,
    path = "/fact",
    request_body(
        content = String,
        description = "Any non-empty JSON value, e.g. {\"info\": \"...\", \"source\": \"...\"}",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Successfully published the fact", body = PublishedFact),
        (status = 422, description = "Body is not JSON, or the fact is null, empty or too large"),
    )
)]
pub async fn create(
    State(app_state): State<AppState>,
    fact: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, Error> {
    // Malformed bodies are rejected the same way as invalid facts
    let Json(fact) =
        fact.map_err(|rejection| HubError::new(ErrorKind::InvalidPayload(rejection.body_text())))?;

    debug!("POST Submit a new fact: {fact}");

    let payload = Payload::new(fact, app_state.config.max_payload_bytes)?;
    let sequence = app_state.hub_ref().publish(payload);

    debug!("Published fact with sequence {sequence}");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            StatusCode::CREATED.into(),
            PublishedFact { sequence },
        )),
    ))
}
