//! HTTP transport for pushing line batches to a Warp10 endpoint

use crate::errors::{Result, WriterError};
use reqwest::Client;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

/// Header carrying the write token
pub const TOKEN_HEADER: &str = "X-Warp10-Token";

/// Deprecated alias of [`TOKEN_HEADER`], still sent for backward
/// compatibility with older ingestion endpoints
pub const LEGACY_TOKEN_HEADER: &str = "X-CityzenData-Token";

/// HTTP client for one push destination
#[derive(Debug, Clone)]
pub struct Warp10Transport {
    client: Client,
    url: String,
    token: String,
    timeout: Duration,
}

impl Warp10Transport {
    pub fn new(url: String, token: String, http_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(http_timeout)
            .user_agent(format!("warp10_writer/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(WriterError::Http)?;

        Ok(Self {
            client,
            url,
            token,
            timeout: http_timeout,
        })
    }

    /// Deliver one batch as a newline-joined POST body.
    ///
    /// Anything but HTTP 200, including a timeout or a connection failure,
    /// is a delivery failure the caller is expected to retry later.
    pub async fn send(&self, lines: &[String]) -> Result<()> {
        let body = lines.join("\n");

        debug!(url = %self.url, lines = lines.len(), "Posting batch");

        let response = timeout(
            self.timeout,
            self.client
                .post(&self.url)
                .header(TOKEN_HEADER, &self.token)
                .header(LEGACY_TOKEN_HEADER, &self.token)
                .body(body)
                .send(),
        )
        .await
        .map_err(|_| WriterError::Transport("Request timeout".to_string()))?
        .map_err(WriterError::Http)?;

        let status = response.status();
        if status.as_u16() == 200 {
            debug!(lines = lines.len(), "Batch accepted");
            return Ok(());
        }

        let error_body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        Err(WriterError::Transport(format!(
            "{} {}",
            status.as_u16(),
            error_body
        )))
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport(url: String) -> Warp10Transport {
        Warp10Transport::new(url, "secret".to_string(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_send_joins_lines_and_sets_both_token_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header(TOKEN_HEADER, "secret"))
            .and(header(LEGACY_TOKEN_HEADER, "secret"))
            .and(body_string("1// a{} 1.000000\n2// b{} 2.000000"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let transport = transport(server.uri());
        let lines = vec![
            "1// a{} 1.000000".to_string(),
            "2// b{} 2.000000".to_string(),
        ];

        transport.send(&lines).await.unwrap();
    }

    #[tokio::test]
    async fn test_non_200_is_a_delivery_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("ingestion down"))
            .mount(&server)
            .await;

        let transport = transport(server.uri());
        let result = transport.send(&["1// a{} 1.000000".to_string()]).await;

        match result {
            Err(WriterError::Transport(msg)) => {
                assert!(msg.contains("500"));
                assert!(msg.contains("ingestion down"));
            }
            other => panic!("expected Transport error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connection_failure_is_a_delivery_failure() {
        // Nothing listens here
        let transport = transport("http://127.0.0.1:1/update".to_string());
        assert!(transport.send(&["1// a{} 1.000000".to_string()]).await.is_err());
    }
}
