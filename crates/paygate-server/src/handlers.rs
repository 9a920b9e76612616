//! `POST /createpayment` and `POST /callback`.
//!
//! Bodies arrive as raw bytes so that any decode failure maps to 400 with the
//! same error shape as every other failure.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use paygate_core::{CallbackNotification, CreatePaymentRequest, ValidationError};
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::errors::ApiError;
use crate::relay::RelayOutcome;
use crate::server::AppState;

/// Body of a successful `POST /callback`.
pub const CALLBACK_ACK: &str = "Callback Received";

/// Run the token and QR hops and answer with the QR upstream's JSON.
///
/// Only an undecodable body is a 400. Missing fields default to empty, and
/// an unusable URL fails on the outbound call as a 500.
#[instrument(skip_all)]
pub async fn create_payment(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let request = CreatePaymentRequest::from_json(&body)
        .map_err(ValidationError::from)
        .inspect_err(|e| warn!(error = %e, "rejected create-payment request"))?;
    let qr = state.orchestrator.create_payment(&request).await?;
    Ok(Json(qr))
}

/// Relay a payment notification to the sockets waiting on its `ref2`.
#[instrument(skip_all)]
pub async fn callback(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<&'static str, ApiError> {
    let notification = CallbackNotification::from_json(&body)
        .map_err(ValidationError::from)
        .inspect_err(|e| warn!(error = %e, "rejected callback"))?;
    info!(
        code = notification.code,
        transaction_id = %notification.transaction_id,
        ref2 = %notification.key2,
        "callback received"
    );

    match state.relay.relay(&notification).await {
        Ok(RelayOutcome::Delivered(report)) if !report.is_clean() => {
            warn!(
                recipients = report.recipients(),
                failed = report.failed.len(),
                "callback partially delivered"
            );
        }
        Ok(_) => {}
        Err(e) => {
            warn!(error = %e, "callback relay failed");
            return Err(e.into());
        }
    }
    Ok(CALLBACK_ACK)
}
