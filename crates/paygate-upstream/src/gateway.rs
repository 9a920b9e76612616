//! Outbound HTTP client for the token and QR hops.

use std::time::Duration;

use async_trait::async_trait;
use paygate_core::{AccessToken, GatewayError, GenQrRequest, GenQrResponse, Hop, TokenRequest};
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

/// Header carrying the hop-1 access token on the QR request.
pub const ACCESS_TOKEN_HEADER: &str = "x-access-token";

/// The external token/QR provider.
///
/// Both URLs are supplied per request by the caller of `/createpayment`.
#[async_trait]
pub trait UpstreamGateway: Send + Sync {
    /// Hop 1: obtain an access token.
    async fn fetch_token(
        &self,
        url: &str,
        request: &TokenRequest,
    ) -> Result<AccessToken, GatewayError>;

    /// Hop 2: generate the QR payment. Returns the upstream JSON untouched.
    async fn generate_qr(
        &self,
        url: &str,
        token: &AccessToken,
        request: &GenQrRequest,
    ) -> Result<Value, GatewayError>;
}

/// `reqwest`-backed gateway. No retries; timeouts only if configured.
#[derive(Clone, Debug)]
pub struct HttpGateway {
    client: Client,
}

impl HttpGateway {
    /// Build the client. `None` leaves that timeout unset.
    pub fn new(
        connect_timeout: Option<Duration>,
        request_timeout: Option<Duration>,
    ) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder();
        if let Some(t) = connect_timeout {
            builder = builder.connect_timeout(t);
        }
        if let Some(t) = request_timeout {
            builder = builder.timeout(t);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    /// POST `body` as JSON and return the raw response body of a 2xx answer.
    async fn post_json(
        &self,
        hop: Hop,
        url: &str,
        body: &impl Serialize,
        access_token: Option<&str>,
    ) -> Result<Vec<u8>, GatewayError> {
        let payload = serde_json::to_vec(body).map_err(|e| GatewayError::Encode {
            hop,
            message: e.to_string(),
        })?;

        let mut req = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload);
        if let Some(token) = access_token {
            req = req.header(ACCESS_TOKEN_HEADER, token);
        }

        let resp = req.send().await.map_err(|e| GatewayError::Transport {
            hop,
            message: e.to_string(),
        })?;
        let status = resp.status();
        let bytes = resp.bytes().await.map_err(|e| GatewayError::Transport {
            hop,
            message: e.to_string(),
        })?;
        debug!(%hop, status = status.as_u16(), len = bytes.len(), "upstream responded");

        if !status.is_success() {
            return Err(GatewayError::UpstreamStatus {
                hop,
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl UpstreamGateway for HttpGateway {
    #[instrument(skip_all, fields(hop = "token"))]
    async fn fetch_token(
        &self,
        url: &str,
        request: &TokenRequest,
    ) -> Result<AccessToken, GatewayError> {
        let body = self.post_json(Hop::Token, url, request, None).await?;
        serde_json::from_slice(&body).map_err(|e| GatewayError::Decode {
            hop: Hop::Token,
            message: e.to_string(),
        })
    }

    #[instrument(skip_all, fields(hop = "qr"))]
    async fn generate_qr(
        &self,
        url: &str,
        token: &AccessToken,
        request: &GenQrRequest,
    ) -> Result<Value, GatewayError> {
        let body = self
            .post_json(Hop::Qr, url, request, Some(&token.access_token))
            .await?;
        let decode = |message: String| GatewayError::Decode {
            hop: Hop::Qr,
            message,
        };
        let value: Value = serde_json::from_slice(&body).map_err(|e| decode(e.to_string()))?;
        // Shape check only; the caller gets `value` verbatim.
        let _ = GenQrResponse::deserialize(&value).map_err(|e| decode(e.to_string()))?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateway() -> HttpGateway {
        HttpGateway::new(None, None).unwrap()
    }

    fn qr_request() -> GenQrRequest {
        GenQrRequest {
            system_name: "DOT".into(),
            amount: 99.0,
            reference2: "tx1".into(),
            ..GenQrRequest::default()
        }
    }

    #[tokio::test]
    async fn fetch_token_posts_system_name() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({"systemName": "DOT"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"accessToken": "abc", "expires": 300})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let token = gateway()
            .fetch_token(
                &format!("{}/token", server.uri()),
                &TokenRequest {
                    system_name: "DOT".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(token.access_token, "abc");
        assert_eq!(token.expires, 300);
    }

    #[tokio::test]
    async fn fetch_token_non_2xx_is_upstream_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
            .mount(&server)
            .await;

        let err = gateway()
            .fetch_token(&server.uri(), &TokenRequest::default())
            .await
            .unwrap_err();
        match err {
            GatewayError::UpstreamStatus { hop, status, body } => {
                assert_eq!(hop, Hop::Token);
                assert_eq!(status, 401);
                assert_eq!(body, "Unauthorized");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn fetch_token_garbage_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = gateway()
            .fetch_token(&server.uri(), &TokenRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Decode { hop: Hop::Token, .. }));
    }

    #[tokio::test]
    async fn empty_url_is_transport_error() {
        let err = gateway()
            .fetch_token("", &TokenRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Transport { hop: Hop::Token, .. }));
    }

    #[tokio::test]
    async fn unreachable_host_is_transport_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let err = gateway()
            .fetch_token(&format!("http://127.0.0.1:{port}/token"), &TokenRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Transport { hop: Hop::Token, .. }));
    }

    #[tokio::test]
    async fn generate_qr_sends_token_header_and_returns_body_verbatim() {
        let server = MockServer::start().await;
        let upstream = json!({
            "redirectUrl": "https://pay.example/qr/1",
            "resultCode": 0,
            "resultDesc": "ok",
            "developMessage": "",
            "extra": {"trace": "kept"}
        });
        Mock::given(method("POST"))
            .and(path("/qr"))
            .and(header(ACCESS_TOKEN_HEADER, "abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(upstream.clone()))
            .expect(1)
            .mount(&server)
            .await;

        let token = AccessToken {
            access_token: "abc".into(),
            expires: 300,
        };
        let value = gateway()
            .generate_qr(&format!("{}/qr", server.uri()), &token, &qr_request())
            .await
            .unwrap();
        assert_eq!(value, upstream);
    }

    #[tokio::test]
    async fn generate_qr_sends_payment_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(wiremock::matchers::body_partial_json(json!({
                "systemName": "DOT",
                "amount": 99.0,
                "ref2": "tx1"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"resultCode": 0})))
            .expect(1)
            .mount(&server)
            .await;

        let result = gateway()
            .generate_qr(&server.uri(), &AccessToken::default(), &qr_request())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn generate_qr_mistyped_response_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"resultCode": "zero"})),
            )
            .mount(&server)
            .await;

        let err = gateway()
            .generate_qr(&server.uri(), &AccessToken::default(), &qr_request())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Decode { hop: Hop::Qr, .. }));
    }
}
