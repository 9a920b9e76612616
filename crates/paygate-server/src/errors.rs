//! HTTP error mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use paygate_core::{GatewayError, ValidationError};
use serde_json::json;

use crate::relay::RelayError;

/// Error returned by the HTTP handlers. Rendered as `{"error": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Undecodable request body.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// An upstream hop of `/createpayment` failed.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The callback could not be handed to the socket side.
    #[error(transparent)]
    Relay(#[from] RelayError),
}

impl ApiError {
    /// HTTP status the error is answered with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Relay(_) => StatusCode::BAD_REQUEST,
            Self::Gateway(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
