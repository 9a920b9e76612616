//! Error taxonomy.
//!
//! - [`ValidationError`]: the caller sent something unusable (HTTP 400)
//! - [`GatewayError`]: an upstream hop failed (HTTP 500); never retried

/// One of the two upstream hops of payment creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Hop {
    /// Access-token request to `tokenApi`.
    Token,
    /// QR generation request to `genQrApi`.
    Qr,
}

impl std::fmt::Display for Hop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Token => f.write_str("token"),
            Self::Qr => f.write_str("qr"),
        }
    }
}

/// Failure of an upstream hop.
#[derive(Clone, Debug, thiserror::Error)]
pub enum GatewayError {
    /// The outbound body could not be serialized.
    #[error("{hop} request could not be encoded: {message}")]
    Encode {
        /// Hop being encoded.
        hop: Hop,
        /// Serializer error.
        message: String,
    },

    /// The request never got a response: bad URL, refused, reset, timed out.
    #[error("{hop} request failed: {message}")]
    Transport {
        /// Hop being sent.
        hop: Hop,
        /// Client error.
        message: String,
    },

    /// The upstream answered outside 2xx.
    #[error("{hop} upstream returned {status}: {body}")]
    UpstreamStatus {
        /// Hop that answered.
        hop: Hop,
        /// HTTP status received.
        status: u16,
        /// Response body, lossily decoded.
        body: String,
    },

    /// The upstream body did not have the expected shape.
    #[error("{hop} response could not be decoded: {message}")]
    Decode {
        /// Hop whose response was decoded.
        hop: Hop,
        /// Deserializer error.
        message: String,
    },
}

impl GatewayError {
    /// Hop that failed.
    pub fn hop(&self) -> Hop {
        match self {
            Self::Encode { hop, .. }
            | Self::Transport { hop, .. }
            | Self::UpstreamStatus { hop, .. }
            | Self::Decode { hop, .. } => *hop,
        }
    }

    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Encode { .. } => "encode",
            Self::Transport { .. } => "transport",
            Self::UpstreamStatus { .. } => "upstream_status",
            Self::Decode { .. } => "decode",
        }
    }
}

/// Client input rejected before any outbound call.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The body is not JSON or a field has the wrong type.
    #[error("malformed request body: {0}")]
    MalformedBody(String),
}

impl From<serde_json::Error> for ValidationError {
    fn from(e: serde_json::Error) -> Self {
        Self::MalformedBody(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_hop() {
        let err = GatewayError::UpstreamStatus {
            hop: Hop::Qr,
            status: 502,
            body: "bad gateway".into(),
        };
        assert_eq!(err.to_string(), "qr upstream returned 502: bad gateway");
        assert_eq!(err.hop(), Hop::Qr);
    }

    #[test]
    fn error_kind_strings() {
        let transport = GatewayError::Transport {
            hop: Hop::Token,
            message: "connection refused".into(),
        };
        assert_eq!(transport.error_kind(), "transport");
        assert_eq!(transport.hop(), Hop::Token);

        let decode = GatewayError::Decode {
            hop: Hop::Token,
            message: "eof".into(),
        };
        assert_eq!(decode.error_kind(), "decode");
    }

    #[test]
    fn serde_error_becomes_malformed_body() {
        let json_err = serde_json::from_str::<serde_json::Value>("{bad").unwrap_err();
        let err: ValidationError = json_err.into();
        assert!(matches!(err, ValidationError::MalformedBody(_)));
    }
}
