// src/fetch/mod.rs

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Ways a single batch decode can fail. Each one is recoverable for the run.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("non-success status {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// The body could not be read to the end (connection dropped mid-body,
    /// broken gzip stream). Invalid UTF-8 is not an error here: `text()`
    /// replaces it lossily.
    #[error("unreadable response body: {0}")]
    Malformed(String),
}

/// Anything that can turn a `;`-joined VIN payload into raw CSV text.
#[async_trait]
pub trait BatchDecoder {
    async fn decode_batch(&self, payload: &str) -> Result<String, DecodeError>;
}

#[derive(Serialize)]
struct DecodeForm<'a> {
    format: &'a str,
    data: &'a str,
}

/// Client for the vPIC `DecodeVINValuesBatch` endpoint.
pub struct VpicClient {
    client: Client,
    url: Url,
}

impl VpicClient {
    pub fn new(url: Url, timeout: Duration) -> Result<Self, DecodeError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| DecodeError::Transport {
                url: url.to_string(),
                source,
            })?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl BatchDecoder for VpicClient {
    async fn decode_batch(&self, payload: &str) -> Result<String, DecodeError> {
        debug!(url = %self.url, bytes = payload.len(), "posting batch");
        let resp = self
            .client
            .post(self.url.clone())
            .form(&DecodeForm {
                format: "csv",
                data: payload,
            })
            .send()
            .await
            .map_err(|source| DecodeError::Transport {
                url: self.url.to_string(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DecodeError::Status { status, body });
        }

        resp.text()
            .await
            .map_err(|e| DecodeError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> VpicClient {
        let url = Url::parse(&format!("{}/api/vehicles/DecodeVINValuesBatch/", server.uri())).unwrap();
        VpicClient::new(url, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn posts_form_and_returns_csv_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/vehicles/DecodeVINValuesBatch/"))
            .and(body_string_contains("format=csv"))
            .and(body_string_contains("data=A%3BB"))
            .respond_with(ResponseTemplate::new(200).set_body_string("VIN\nA,1\nB,2"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let text = client.decode_batch("A;B").await.unwrap();
        assert_eq!(text, "VIN\nA,1\nB,2");
    }

    #[tokio::test]
    async fn server_error_is_status_variant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        match client.decode_batch("A").await {
            Err(DecodeError::Status { status, body }) => {
                assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
                assert_eq!(body, "busy");
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn undecodable_body_is_malformed_variant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-encoding", "gzip")
                    .set_body_bytes(b"definitely not gzip".to_vec()),
            )
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        assert!(matches!(
            client.decode_batch("A").await,
            Err(DecodeError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_host_is_transport_variant() {
        // Nothing listens on the discard port.
        let url = Url::parse("http://127.0.0.1:9/").unwrap();
        let client = VpicClient::new(url, Duration::from_secs(2)).unwrap();
        assert!(matches!(
            client.decode_batch("A").await,
            Err(DecodeError::Transport { .. })
        ));
    }
}
