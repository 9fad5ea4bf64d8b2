//! Mapping relay outcomes to HTTP responses.
//!
//! # Design Decisions
//! - A full queue keeps the historic `500 server is overwhelmed` response
//! - Unclaimed producers get 504: the relay timed out waiting on a peer
//! - Every other failure is a 500 carrying the error text

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::relay::RelayError;

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::Unclaimed(_) => StatusCode::GATEWAY_TIMEOUT,
            RelayError::Overwhelmed | RelayError::EncoderInit(_) | RelayError::Copy { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}
