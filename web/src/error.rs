use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use sse::error::{Error as HubError, ErrorKind};

extern crate log;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error(HubError);

impl StdError for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

// List of possible StatusCode variants https://docs.rs/http/latest/http/status/struct.StatusCode.html#associatedconstant.UNPROCESSABLE_ENTITY
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self.0.error_kind {
            ErrorKind::ResourceExhausted => {
                log::warn!("Rejecting event stream connection: {}", self.0);
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE UNAVAILABLE").into_response()
            }
            ErrorKind::InvalidPayload(reason) => {
                log::debug!("Rejecting fact: {reason}");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    format!("UNPROCESSABLE ENTITY: {reason}"),
                )
                    .into_response()
            }
            ErrorKind::QueueOverflow
            | ErrorKind::TransportWriteFailed
            | ErrorKind::EncodingFailed => {
                log::error!("Subscriber-local error reached the HTTP layer: {}", self.0);
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL SERVER ERROR").into_response()
            }
        }
    }
}

impl<E> From<E> for Error
where
    E: Into<HubError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
