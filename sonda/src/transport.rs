use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ConfigError, TransportFailure};
use crate::message::{Endpoint, Method};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Normalized result of one HTTP exchange. A 4xx or 5xx status is data at
/// this layer, not an error — classification happens above.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// One request/response exchange against a named endpoint. No state, no
/// retries: retry-via-alternate-candidate is the probe engine's job.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, endpoint: &Endpoint, payload: &Value)
    -> Result<RawResponse, TransportFailure>;
}

/// Reqwest-backed transport with a bounded per-request timeout.
///
/// Instantiate once and share; the client holds the connection pool, which
/// is the only resource shared between concurrent load executions.
pub struct HttpTransport {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ConfigError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        endpoint: &Endpoint,
        payload: &Value,
    ) -> Result<RawResponse, TransportFailure> {
        let url = format!("{}{}", self.base_url, endpoint.path);
        let request = match endpoint.method {
            Method::Post => self.client.post(&url).json(payload),
            Method::Get => self.client.get(&url),
        };

        let response = request
            .send()
            .await
            .map_err(|err| request_failure(err, self.timeout))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|err| TransportFailure::MalformedResponse(err.to_string()))?;

        Ok(RawResponse { status, body })
    }
}

fn request_failure(err: reqwest::Error, timeout: Duration) -> TransportFailure {
    if err.is_timeout() {
        TransportFailure::Timeout(timeout)
    } else if err.is_connect() {
        TransportFailure::Connect(err.to_string())
    } else {
        TransportFailure::Http(err.to_string())
    }
}
