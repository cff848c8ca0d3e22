//! Response handling for terminal failures.
//!
//! Dispatch failures never leak backend details: both terminal conditions are
//! answered `503 Service Unavailable` with a short plain-text body.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use http_body_util::LengthLimitError;
use std::error::Error as _;

use crate::resilience::dispatcher::DispatchError;

const UNAVAILABLE_BODY: &str = "service not available";

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            UNAVAILABLE_BODY,
        )
            .into_response()
    }
}

/// Answer for a request whose body could not be buffered.
///
/// A streamed body that runs past the body limit is a 413, like one whose
/// `Content-Length` already announced too much.
pub fn unreadable_body(error: axum::Error) -> Response {
    if exceeds_length_limit(&error) {
        tracing::debug!(error = %error, "Request body over limit");
        return (StatusCode::PAYLOAD_TOO_LARGE, "request body too large").into_response();
    }
    tracing::debug!(error = %error, "Failed to read request body");
    (StatusCode::BAD_REQUEST, "failed to read request body").into_response()
}

fn exceeds_length_limit(error: &axum::Error) -> bool {
    let mut source = error.source();
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}
