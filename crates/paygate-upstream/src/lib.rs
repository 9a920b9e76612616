//! # paygate-upstream
//!
//! Outbound side of `POST /createpayment`.
//!
//! - [`UpstreamGateway`]: the two upstream hops (token fetch, QR generation)
//! - [`HttpGateway`]: `reqwest` implementation of the gateway
//! - [`PaymentOrchestrator`]: runs the hops in order, aborting on the first failure

#![deny(unsafe_code)]

pub mod gateway;
pub mod orchestrator;

pub use gateway::{ACCESS_TOKEN_HEADER, HttpGateway, UpstreamGateway};
pub use orchestrator::{PaymentOrchestrator, PaymentStage};
