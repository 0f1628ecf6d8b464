//! HTTP client abstraction for testability

use std::future::Future;
use std::time::Duration;

use super::types::ResolutionError;

/// Default request timeout for address lookups.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A raw HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Returns true for 2xx status codes.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for async HTTP client operations.
///
/// This abstraction allows for dependency injection and easier testing
/// by enabling mock HTTP clients in tests. Non-2xx responses are returned
/// as responses, not errors, so callers can decode API error bodies.
pub trait AsyncHttpClient: Send + Sync {
    /// Performs an HTTP GET request.
    fn get(&self, url: &str) -> impl Future<Output = Result<HttpResponse, ResolutionError>> + Send;
}

/// Real HTTP client implementation using reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Creates a new ReqwestClient with default configuration.
    pub fn new() -> Result<Self, ResolutionError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Creates a new ReqwestClient with custom timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, ResolutionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ResolutionError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl AsyncHttpClient for ReqwestClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, ResolutionError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ResolutionError::Http(format!("Request failed: {}", e)))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| ResolutionError::Http(format!("Failed to read response: {}", e)))?;

        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Mock HTTP client for testing
    pub struct MockHttpClient {
        pub response: Result<HttpResponse, ResolutionError>,
        pub requested: Mutex<Vec<String>>,
    }

    impl MockHttpClient {
        pub fn json(status: u16, body: &str) -> Self {
            Self {
                response: Ok(HttpResponse {
                    status,
                    body: body.as_bytes().to_vec(),
                }),
                requested: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(error: ResolutionError) -> Self {
            Self {
                response: Err(error),
                requested: Mutex::new(Vec::new()),
            }
        }

        pub fn last_url(&self) -> Option<String> {
            self.requested.lock().last().cloned()
        }
    }

    impl AsyncHttpClient for MockHttpClient {
        async fn get(&self, url: &str) -> Result<HttpResponse, ResolutionError> {
            self.requested.lock().push(url.to_string());
            self.response.clone()
        }
    }

    #[tokio::test]
    async fn test_mock_client_success() {
        let mock = MockHttpClient::json(200, "{}");
        let result = mock.get("http://example.com").await.unwrap();
        assert!(result.is_success());
        assert_eq!(result.body, b"{}".to_vec());
        assert_eq!(mock.last_url().as_deref(), Some("http://example.com"));
    }

    #[tokio::test]
    async fn test_mock_client_error() {
        let mock = MockHttpClient::failing(ResolutionError::Http("Test error".to_string()));
        assert!(mock.get("http://example.com").await.is_err());
    }

    #[test]
    fn test_status_classification() {
        let ok = HttpResponse { status: 204, body: Vec::new() };
        let bad = HttpResponse { status: 400, body: Vec::new() };
        assert!(ok.is_success());
        assert!(!bad.is_success());
    }
}
