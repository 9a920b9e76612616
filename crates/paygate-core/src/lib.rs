//! # paygate-core
//!
//! Shared vocabulary for the payment relay.
//!
//! - Payment wire types: create-payment, token and QR request/response bodies
//! - [`CallbackNotification`]: the asynchronous result relayed to waiting clients
//! - [`CorrelationKey`]: the `ref`/`ref2` value that matches a callback to a connection
//! - Error taxonomy shared by the upstream client and the HTTP layer

#![deny(unsafe_code)]

pub mod callback;
pub mod correlation;
pub mod errors;
pub mod payment;

pub use callback::CallbackNotification;
pub use correlation::CorrelationKey;
pub use errors::{GatewayError, Hop, ValidationError};
pub use payment::{AccessToken, CreatePaymentRequest, GenQrRequest, GenQrResponse, TokenRequest};
