use async_trait::async_trait;
use deertick_core::{DeertickError, DeertickResult};
use std::time::Duration;

/// A fully shaped outbound request, produced by a provider adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: serde_json::Value,
}

impl HttpRequest {
    pub fn new(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            body,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Case-insensitive header lookup.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Boundary through which agents talk to the network.
///
/// Every failure, including non-2xx statuses and non-JSON bodies, is reported
/// as [`DeertickError::Provider`].
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post_json(&self, request: &HttpRequest) -> DeertickResult<serde_json::Value>;

    /// Download a generated artifact.
    async fn get_bytes(&self, url: &str) -> DeertickResult<Vec<u8>>;
}

/// [`HttpTransport`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> DeertickResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeertickError::Configuration(format!("HTTP client: {e}")))?;
        Ok(Self { http })
    }
}

fn transport_error(e: reqwest::Error) -> DeertickError {
    if e.is_timeout() {
        DeertickError::Provider(format!("request timed out: {e}"))
    } else {
        DeertickError::Provider(e.to_string())
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post_json(&self, request: &HttpRequest) -> DeertickResult<serde_json::Value> {
        let mut builder = self.http.post(&request.url).json(&request.body);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let resp = builder.send().await.map_err(transport_error)?;
        let status = resp.status();
        let text = resp.text().await.map_err(transport_error)?;

        if !status.is_success() {
            return Err(DeertickError::Provider(format!("API error {status}: {text}")));
        }

        serde_json::from_str(&text)
            .map_err(|e| DeertickError::Provider(format!("response is not JSON: {e}")))
    }

    async fn get_bytes(&self, url: &str) -> DeertickResult<Vec<u8>> {
        let resp = self.http.get(url).send().await.map_err(transport_error)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(DeertickError::Provider(format!(
                "download of {url} failed with {status}"
            )));
        }
        let bytes = resp.bytes().await.map_err(transport_error)?;
        Ok(bytes.to_vec())
    }
}
