//! Two-hop payment creation.
//!
//! `Start → TokenRequested → QrRequested → Done`, or `Failed` from either hop.
//! No retry, no compensation, no partial result.

use std::sync::Arc;

use paygate_core::{CreatePaymentRequest, GatewayError};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::gateway::UpstreamGateway;

/// Progress of one payment creation, reported in logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaymentStage {
    /// Nothing sent yet.
    Start,
    /// Token hop in flight.
    TokenRequested,
    /// QR hop in flight.
    QrRequested,
    /// QR response received.
    Done,
    /// A hop failed; see the error.
    Failed,
}

impl std::fmt::Display for PaymentStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Start => "start",
            Self::TokenRequested => "token_requested",
            Self::QrRequested => "qr_requested",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Runs payment creation against an [`UpstreamGateway`].
#[derive(Clone)]
pub struct PaymentOrchestrator {
    gateway: Arc<dyn UpstreamGateway>,
}

impl PaymentOrchestrator {
    /// Orchestrator calling `gateway` for both hops.
    pub fn new(gateway: Arc<dyn UpstreamGateway>) -> Self {
        Self { gateway }
    }

    /// Fetch a token, then generate the QR with it. Returns the QR upstream's
    /// JSON verbatim.
    #[instrument(skip_all, fields(system = %request.system_name, ref2 = %request.reference2))]
    pub async fn create_payment(
        &self,
        request: &CreatePaymentRequest,
    ) -> Result<Value, GatewayError> {
        let mut stage = PaymentStage::Start;
        let result = self.run(request, &mut stage).await;
        match &result {
            Ok(_) => info!(%stage, "payment created"),
            Err(e) => warn!(
                failed_after = %stage,
                stage = %PaymentStage::Failed,
                hop = %e.hop(),
                kind = e.error_kind(),
                error = %e,
                "payment creation failed"
            ),
        }
        result
    }

    async fn run(
        &self,
        request: &CreatePaymentRequest,
        stage: &mut PaymentStage,
    ) -> Result<Value, GatewayError> {
        *stage = PaymentStage::TokenRequested;
        debug!(%stage, url = %request.token_api);
        let token = self
            .gateway
            .fetch_token(&request.token_api, &request.token_request())
            .await?;

        *stage = PaymentStage::QrRequested;
        debug!(%stage, url = %request.gen_qr_api);
        let qr = self
            .gateway
            .generate_qr(&request.gen_qr_api, &token, &request.qr_request())
            .await?;

        *stage = PaymentStage::Done;
        Ok(qr)
    }
}
