//! Bodies exchanged on `POST /createpayment` and with the upstream gateway.
//!
//! Every struct binds leniently: missing fields take their zero value, so an
//! empty object is a valid (if useless) request. Only syntactically broken
//! JSON or a field of the wrong type is rejected.

use serde::{Deserialize, Serialize};

/// Body of `POST /createpayment`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    /// Token-issuing endpoint (hop 1).
    pub token_api: String,
    /// QR-generation endpoint (hop 2).
    pub gen_qr_api: String,
    /// Caller system, sent on both hops.
    pub system_name: String,
    /// Payment amount.
    pub amount: f64,
    /// Customer number at the biller.
    pub customer_no: String,
    /// Customer display name.
    pub customer_user: String,
    /// Billing branch code.
    pub branch: String,
    /// Biller suffix.
    pub suffix: i32,
    /// Biller tax id.
    pub dot_tax_id: String,
    /// Free-text description.
    pub description: String,
    /// Payment expiry, as the caller formats it.
    pub expire_date: String,
    /// Invoice date, as the caller formats it.
    pub invoice_date: String,
    /// Caller reference, usually the invoice.
    #[serde(rename = "ref1")]
    pub reference1: String,
    /// Correlation reference; the callback carries it back.
    #[serde(rename = "ref2")]
    pub reference2: String,
}

impl CreatePaymentRequest {
    /// Parse a raw request body.
    pub fn from_json(raw: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(raw)
    }

    /// Body for the token hop.
    pub fn token_request(&self) -> TokenRequest {
        TokenRequest {
            system_name: self.system_name.clone(),
        }
    }

    /// Body for the QR hop: everything except the two upstream URLs.
    pub fn qr_request(&self) -> GenQrRequest {
        GenQrRequest {
            system_name: self.system_name.clone(),
            amount: self.amount,
            customer_no: self.customer_no.clone(),
            customer_user: self.customer_user.clone(),
            branch: self.branch.clone(),
            suffix: self.suffix,
            dot_tax_id: self.dot_tax_id.clone(),
            description: self.description.clone(),
            expire_date: self.expire_date.clone(),
            invoice_date: self.invoice_date.clone(),
            reference1: self.reference1.clone(),
            reference2: self.reference2.clone(),
        }
    }
}

/// Body sent to the token endpoint.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TokenRequest {
    /// Caller system the token is issued to.
    pub system_name: String,
}

/// Token endpoint response. The token is attached to the QR hop as
/// `x-access-token`.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AccessToken {
    /// Opaque token value.
    pub access_token: String,
    /// Lifetime as reported by the upstream.
    pub expires: i64,
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("access_token", &"[REDACTED]")
            .field("expires", &self.expires)
            .finish()
    }
}

/// Body sent to the QR endpoint.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GenQrRequest {
    /// Caller system, sent on both hops.
    pub system_name: String,
    /// Payment amount.
    pub amount: f64,
    /// Customer number at the biller.
    pub customer_no: String,
    /// Customer display name.
    pub customer_user: String,
    /// Billing branch code.
    pub branch: String,
    /// Biller suffix.
    pub suffix: i32,
    /// Biller tax id.
    pub dot_tax_id: String,
    /// Free-text description.
    pub description: String,
    /// Payment expiry, as the caller formats it.
    pub expire_date: String,
    /// Invoice date, as the caller formats it.
    pub invoice_date: String,
    /// Caller reference, usually the invoice.
    #[serde(rename = "ref1")]
    pub reference1: String,
    /// Correlation reference; the callback carries it back.
    #[serde(rename = "ref2")]
    pub reference2: String,
}

/// Shape of the QR endpoint response.
///
/// Used to check the upstream answer; the caller receives the upstream JSON
/// as-is, not a re-serialization of this struct.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GenQrResponse {
    /// Where the payer is sent to scan or pay.
    pub redirect_url: String,
    /// Upstream result code.
    pub result_code: i64,
    /// Human-readable result.
    pub result_desc: String,
    /// Diagnostic text from the upstream.
    pub develop_message: String,
}
