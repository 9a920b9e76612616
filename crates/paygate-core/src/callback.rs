//! Callback notification received on `POST /callback` and relayed over
//! `/ws/payment`.

use serde::{Deserialize, Serialize};

use crate::correlation::CorrelationKey;

/// Result of a payment as reported by the provider.
///
/// Wire shape: `{responseCode, responseMsg, transactionId, ref1, ref2}`.
/// `ref2` is the correlation key used for fan-out.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallbackNotification {
    /// Provider result code.
    #[serde(rename = "responseCode")]
    pub code: i64,
    /// Provider result text.
    #[serde(rename = "responseMsg")]
    pub message: String,
    /// Provider transaction id.
    #[serde(rename = "transactionId")]
    pub transaction_id: String,
    /// Echo of the payment's `ref1`.
    #[serde(rename = "ref1")]
    pub key1: String,
    /// Echo of the payment's `ref2`; the correlation key.
    #[serde(rename = "ref2")]
    pub key2: String,
}

impl CallbackNotification {
    /// Parse a callback body or an inbound socket message.
    pub fn from_json(raw: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(raw)
    }

    /// Wire form sent to each matching socket.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Key the notification is delivered under (`ref2`).
    pub fn correlation_key(&self) -> CorrelationKey {
        CorrelationKey::new(self.key2.clone())
    }
}
