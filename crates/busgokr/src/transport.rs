//! HTTP transport seam
//!
//! Strategies only ever need "GET this URL and give me the JSON". Unit tests
//! substitute a mock here to count and inspect requests.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use crate::config::BusConfig;
use crate::error::TransportError;

/// Fetches and decodes one JSON document
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `url` (already percent-encoded) and decode the body as JSON
    async fn get_json(&self, url: &str) -> Result<Value, TransportError>;
}

/// `reqwest`-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    timeout_secs: u64,
}

impl HttpTransport {
    /// Create a transport with the configured timeout and user agent
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(config: &BusConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client,
            timeout_secs: config.timeout_secs,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_json(&self, url: &str) -> Result<Value, TransportError> {
        debug!(%url, "GET");

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout {
                    timeout_secs: self.timeout_secs,
                }
            } else {
                TransportError::ConnectionFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::RequestFailed(format!("HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| TransportError::ParseError(e.to_string()))?;

        serde_json::from_str(&body).map_err(|e| TransportError::ParseError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_transport_creation() {
        let transport = HttpTransport::new(&BusConfig::for_testing()).unwrap();
        assert_eq!(transport.timeout_secs, 5);
    }

    #[tokio::test]
    async fn test_mock_transport_returns_body() {
        let mut mock = MockTransport::new();
        mock.expect_get_json()
            .withf(|url| url.ends_with("getNBusRoute.bms"))
            .times(1)
            .returning(|_| Ok(serde_json::json!({ "error": { "errorCode": "0000" } })));

        let body = mock
            .get_json("http://m.bus.go.kr/mBus/bus/getNBusRoute.bms")
            .await
            .unwrap();
        assert_eq!(body["error"]["errorCode"], "0000");
    }
}
