//! Transport abstraction for testability.

use std::future::Future;
use std::io::ErrorKind;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;

use super::error::{FetchError, FetchResult};
use crate::config::DEFAULT_TIMEOUT_SECS;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// URI scheme served from the local filesystem.
const FILE_SCHEME: &str = "file://";

/// A completed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Transport status code.
    pub status: u16,
    /// Response body.
    pub body: Bytes,
}

impl HttpResponse {
    /// Create a response.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// A `200` response.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(200, body)
    }

    /// An empty `404` response.
    pub fn not_found() -> Self {
        Self::new(404, Bytes::new())
    }

    /// Only `200` counts as success.
    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

/// Trait for GET-style transfers.
///
/// This abstraction allows for dependency injection and easier testing
/// by enabling mock clients in tests.
pub trait AsyncHttpClient: Send + Sync {
    /// Performs a GET request.
    ///
    /// Returns the response for any completed transfer, including non-success
    /// statuses, and an error only when the transport itself failed.
    fn get<'a>(&'a self, uri: &'a str) -> BoxFuture<'a, FetchResult<HttpResponse>>;
}

/// Real client: `http(s)://` through reqwest, `file://` through `tokio::fs`.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestClient {
    /// Creates a new ReqwestClient with the default timeout.
    pub fn new() -> FetchResult<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a new ReqwestClient with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> FetchResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self { client, timeout })
    }

    /// The configured request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn get_remote(&self, uri: &str) -> FetchResult<HttpResponse> {
        let response = self.client.get(uri).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    uri: uri.to_string(),
                    timeout_secs: self.timeout.as_secs(),
                }
            } else {
                FetchError::Transport {
                    uri: uri.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            return Ok(HttpResponse::new(status, Bytes::new()));
        }

        let body = response.bytes().await.map_err(|e| FetchError::Transport {
            uri: uri.to_string(),
            reason: format!("Failed to read response: {}", e),
        })?;

        Ok(HttpResponse::new(status, body))
    }
}

/// Read a `file://` URI, mapping missing files to `404`.
async fn get_file(uri: &str, path: &str) -> FetchResult<HttpResponse> {
    match tokio::fs::read(path).await {
        Ok(data) => Ok(HttpResponse::ok(data)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(HttpResponse::not_found()),
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            Ok(HttpResponse::new(403, Bytes::new()))
        }
        Err(e) => Err(FetchError::Transport {
            uri: uri.to_string(),
            reason: e.to_string(),
        }),
    }
}

impl AsyncHttpClient for ReqwestClient {
    fn get<'a>(&'a self, uri: &'a str) -> BoxFuture<'a, FetchResult<HttpResponse>> {
        Box::pin(async move {
            match uri.strip_prefix(FILE_SCHEME) {
                Some(path) => get_file(uri, path).await,
                None => self.get_remote(uri).await,
            }
        })
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::io::Write;

    #[derive(Clone)]
    enum MockReply {
        Respond(HttpResponse),
        Fail(String),
        Pending,
    }

    /// Mock client for testing.
    ///
    /// Unknown URIs answer `404`. Every request is counted per URI.
    #[derive(Default)]
    pub struct MockHttpClient {
        replies: Mutex<HashMap<String, MockReply>>,
        calls: Mutex<HashMap<String, usize>>,
        delay: Option<Duration>,
    }

    impl MockHttpClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_response(self, uri: &str, response: HttpResponse) -> Self {
            self.set_response(uri, response);
            self
        }

        pub fn with_transport_error(self, uri: &str, reason: &str) -> Self {
            self.replies
                .lock()
                .insert(uri.to_string(), MockReply::Fail(reason.to_string()));
            self
        }

        /// Requests to `uri` never complete.
        pub fn with_pending(self, uri: &str) -> Self {
            self.replies
                .lock()
                .insert(uri.to_string(), MockReply::Pending);
            self
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn set_response(&self, uri: &str, response: HttpResponse) {
            self.replies
                .lock()
                .insert(uri.to_string(), MockReply::Respond(response));
        }

        pub fn request_count(&self, uri: &str) -> usize {
            self.calls.lock().get(uri).copied().unwrap_or(0)
        }
    }

    impl AsyncHttpClient for MockHttpClient {
        fn get<'a>(&'a self, uri: &'a str) -> BoxFuture<'a, FetchResult<HttpResponse>> {
            *self.calls.lock().entry(uri.to_string()).or_insert(0) += 1;
            let reply = self
                .replies
                .lock()
                .get(uri)
                .cloned()
                .unwrap_or(MockReply::Respond(HttpResponse::not_found()));
            let delay = self.delay;

            Box::pin(async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                match reply {
                    MockReply::Respond(response) => Ok(response),
                    MockReply::Fail(reason) => Err(FetchError::Transport {
                        uri: uri.to_string(),
                        reason,
                    }),
                    MockReply::Pending => futures::future::pending().await,
                }
            })
        }
    }

    #[tokio::test]
    async fn test_mock_client_success() {
        let mock = MockHttpClient::new()
            .with_response("http://example.com/a", HttpResponse::ok(vec![1, 2, 3, 4]));

        let result = mock.get("http://example.com/a").await.unwrap();
        assert!(result.is_success());
        assert_eq!(result.body.as_ref(), &[1, 2, 3, 4]);
        assert_eq!(mock.request_count("http://example.com/a"), 1);
    }

    #[tokio::test]
    async fn test_mock_client_unknown_uri_is_404() {
        let mock = MockHttpClient::new();
        let result = mock.get("http://example.com/missing").await.unwrap();
        assert_eq!(result.status, 404);
    }

    #[tokio::test]
    async fn test_mock_client_transport_error() {
        let mock = MockHttpClient::new().with_transport_error("http://example.com/a", "reset");
        let result = mock.get("http://example.com/a").await;
        assert!(matches!(result, Err(FetchError::Transport { .. })));
    }

    #[test]
    fn test_response_success_is_200_only() {
        assert!(HttpResponse::ok(Vec::new()).is_success());
        assert!(!HttpResponse::new(204, Bytes::new()).is_success());
        assert!(!HttpResponse::not_found().is_success());
    }

    #[test]
    fn test_reqwest_client_timeout() {
        let client = ReqwestClient::with_timeout(Duration::from_secs(7)).unwrap();
        assert_eq!(client.timeout(), Duration::from_secs(7));
        let client = ReqwestClient::new().unwrap();
        assert_eq!(client.timeout().as_secs(), DEFAULT_TIMEOUT_SECS);
    }

    #[tokio::test]
    async fn test_reqwest_client_reads_file_uri() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("gfx01");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"payload")
            .unwrap();

        let client = ReqwestClient::new().unwrap();
        let uri = format!("file://{}", path.display());
        let response = client.get(&uri).await.unwrap();

        assert!(response.is_success());
        assert_eq!(response.body.as_ref(), b"payload");
    }

    #[tokio::test]
    async fn test_reqwest_client_missing_file_is_404() {
        let temp = tempfile::TempDir::new().unwrap();
        let client = ReqwestClient::new().unwrap();
        let uri = format!("file://{}", temp.path().join("nope").display());

        let response = client.get(&uri).await.unwrap();
        assert_eq!(response.status, 404);
    }
}
