//! HTTP transport used by fetch workers
//!
//! Workers only need `GET url -> (status, body)`. The trait keeps the
//! orchestration engine independent of reqwest so tests can substitute an
//! in-memory transport.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::config::SyncConfig;
use crate::core::error::{Result, SyncError};

/// Status and full body of a GET request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn new(status: u16, body: Vec<u8>) -> Self {
        Self { status, body }
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Fetches a URL in full
///
/// An `Err` means no HTTP status was received at all. Non-200 statuses are
/// returned as ordinary responses.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<TransportResponse>;
}

/// Upper bound on the body buffer reserved up front from `Content-Length`
const MAX_PREALLOCATION: u64 = 1024 * 1024;

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    timeout: Option<Duration>,
}

impl HttpTransport {
    /// Create a transport from the timeout and user agent in `config`
    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| SyncError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
                field: None,
                suggestion: None,
            })?;

        Ok(Self {
            client,
            timeout: Some(config.timeout),
        })
    }

    /// Wrap an already configured client
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            timeout: None,
        }
    }

    fn map_error(&self, error: reqwest::Error) -> SyncError {
        match self.timeout {
            Some(timeout) => SyncError::from_reqwest(error, timeout),
            None => error.into(),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<TransportResponse> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;
        let status = response.status().as_u16();

        if status != 200 {
            debug!("GET {} returned {}", url, status);
            return Ok(TransportResponse::new(status, Vec::new()));
        }

        // Content-Length is whatever the mirror claims
        let reserve = response
            .content_length()
            .map_or(0, |length| length.min(MAX_PREALLOCATION) as usize);
        let mut body = Vec::with_capacity(reserve);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            body.extend_from_slice(&chunk.map_err(|e| self.map_error(e))?);
        }

        debug!("GET {} returned {} bytes", url, body.len());
        Ok(TransportResponse::new(status, body))
    }
}

/// Minimal HTTP server for responses wiremock cannot produce
#[cfg(test)]
pub(crate) mod test_server {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve `response` verbatim to every connection; returns the base URL
    pub async fn serve_raw(response: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut request = vec![0u8; 4096];
                    let _ = socket.read(&mut request).await;
                    let _ = socket.write_all(response).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        format!("http://{}", addr)
    }

    /// A 200 whose `Content-Length` is far larger than anything addressable
    pub const HUGE_CONTENT_LENGTH: &[u8] =
        b"HTTP/1.1 200 OK\r\nContent-Length: 9223372036854775807\r\nConnection: close\r\n\r\nabc";
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport() -> HttpTransport {
        HttpTransport::from_config(&SyncConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_get_returns_body_on_200() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/abc/csv_logic/a.csv"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"payload".to_vec()))
            .mount(&server)
            .await;

        let url = format!("{}/abc/csv_logic/a.csv", server.uri());
        let response = transport().get(&url).await.unwrap();
        assert!(response.is_ok());
        assert_eq!(response.body, b"payload");
    }

    #[tokio::test]
    async fn test_get_reports_non_200_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = format!("{}/abc/missing.sc", server.uri());
        let response = transport().get(&url).await.unwrap();
        assert_eq!(response.status, 404);
        assert!(response.body.is_empty());
    }

    #[tokio::test]
    async fn test_get_unreachable_host_is_error() {
        // Port 9 (discard) on localhost is expected to refuse connections
        let result = transport().get("http://127.0.0.1:9/abc/x.sc").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_bogus_content_length_is_an_error_not_an_allocation() {
        let base = test_server::serve_raw(test_server::HUGE_CONTENT_LENGTH).await;
        let result = transport().get(&format!("{}/abc/x.csv", base)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_timeout_reports_configured_duration() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let config = SyncConfig::builder()
            .timeout(Duration::from_secs(1))
            .build()
            .unwrap();
        let transport = HttpTransport::from_config(&config).unwrap();
        let result = transport.get(&format!("{}/abc/slow.sc", server.uri())).await;

        match result {
            Err(SyncError::NetworkTimeout { duration_secs, .. }) => assert_eq!(duration_secs, 1),
            other => panic!("Expected NetworkTimeout, got {:?}", other),
        }
    }
}
