//! HTTP Client Implementation using Reqwest

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{ByteStream, HttpClient, HttpMethod, HttpRequest, HttpResponse},
};
use futures_util::StreamExt;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Default per-request timeout. Catalog callers are expected to degrade on
/// failure, so requests must fail fast rather than hang.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Number of attempts for requests that fail with a retryable status.
const MAX_ATTEMPTS: u32 = 3;

/// Reqwest-based HTTP client implementation
///
/// Provides HTTP operations with:
/// - Connection pooling via reqwest
/// - Automatic retry with exponential backoff on 429/5xx
/// - TLS (rustls) by default
/// - Streaming range downloads
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    /// Create a new HTTP client with the default fail-fast timeout
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a new HTTP client with a custom timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .pool_max_idle_per_host(10)
            .build()
            .expect("Failed to build HTTP client");

        Self { client }
    }

    /// Wrap an already-configured reqwest client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn convert_method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Head => reqwest::Method::HEAD,
        }
    }

    fn build_request(&self, request: &HttpRequest) -> reqwest::RequestBuilder {
        let method = Self::convert_method(request.method);
        let mut req = self.client.request(method, &request.url);

        for (key, value) in &request.headers {
            req = req.header(key, value);
        }

        if let Some(body) = &request.body {
            req = req.body(body.clone());
        }

        if let Some(timeout) = request.timeout {
            req = req.timeout(timeout);
        }

        req
    }

    fn convert_response_headers(response: &reqwest::Response) -> HashMap<String, String> {
        response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect()
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut attempt = 0u32;
        let mut last_error = None;

        while attempt < MAX_ATTEMPTS {
            debug!(
                attempt = attempt + 1,
                url = %request.url,
                "Executing HTTP request"
            );

            match self.build_request(&request).send().await {
                Ok(response) => {
                    let status = response.status().as_u16();

                    if status >= 500 || status == 429 {
                        warn!(status, attempt = attempt + 1, "Retryable HTTP status");
                        last_error =
                            Some(BridgeError::Transport(format!("HTTP {} error", status)));
                    } else {
                        let headers = Self::convert_response_headers(&response);
                        let body = response
                            .bytes()
                            .await
                            .map_err(|e| BridgeError::Transport(e.to_string()))?;

                        return Ok(HttpResponse {
                            status,
                            headers,
                            body,
                        });
                    }
                }
                Err(e) => {
                    warn!(error = %e, attempt = attempt + 1, "HTTP request failed");
                    last_error = Some(BridgeError::Transport(e.to_string()));
                }
            }

            attempt += 1;
            if attempt < MAX_ATTEMPTS {
                let backoff = Duration::from_millis(100 * 2u64.pow(attempt));
                tokio::time::sleep(backoff).await;
            }
        }

        Err(last_error
            .unwrap_or_else(|| BridgeError::Transport("Request failed".to_string())))
    }

    async fn download(&self, url: &str, range_start: Option<u64>) -> Result<ByteStream> {
        let mut req = self.client.get(url);

        if let Some(offset) = range_start {
            req = req.header("Range", format!("bytes={}-", offset));
        }

        let response = req
            .send()
            .await
            .map_err(|e| BridgeError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(BridgeError::Transport(format!(
                "Download failed: HTTP {}",
                status
            )));
        }

        // A server that ignores the Range header restarts from byte zero;
        // callers detect that via the 200-vs-206 status.
        if range_start.is_some() && status != 206 {
            warn!(status, url, "Server ignored Range request, restarting transfer");
            return Err(BridgeError::Transport(format!(
                "Range not honoured: HTTP {}",
                status
            )));
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| BridgeError::Transport(e.to_string())));

        Ok(Box::new(Box::pin(stream)))
    }
}
