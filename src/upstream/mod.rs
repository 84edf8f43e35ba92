use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::Value;
use url::Url;

use crate::credentials::Credential;

const API_KEY_PARAM: &str = "api-key";

/// Transport towards the Helius RPC endpoint. The key is attached per request
/// and never stored on the client.
#[derive(Clone)]
pub struct UpstreamClient {
    inner: reqwest::Client,
    endpoint: Url,
}

#[derive(Debug)]
pub struct UpstreamReply {
    pub status: StatusCode,
    pub body: Value,
}

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("Upstream endpoint must use http or https, got {0}")]
    UnsupportedScheme(String),
    #[error("Upstream request failed: {0}")]
    Transport(reqwest::Error),
    #[error("Upstream returned a non-JSON body (status {status}): {source}")]
    InvalidBody { status: u16, source: reqwest::Error },
}

impl UpstreamClient {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self> {
        assert!(
            timeout >= Duration::from_millis(100),
            "Timeout below 100ms is unsafe"
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .with_context(|| format!("Failed to build upstream client for {endpoint}"))?;

        Ok(Self {
            inner: client,
            endpoint,
        })
    }

    pub fn check_endpoint(&self) -> Result<(), UpstreamError> {
        match self.endpoint.scheme() {
            "http" | "https" => Ok(()),
            other => Err(UpstreamError::UnsupportedScheme(other.to_string())),
        }
    }

    /// Full RPC URL for `credential`. Server-side only; the result carries the key.
    pub fn endpoint_for(&self, credential: &Credential) -> Result<Url, UpstreamError> {
        self.check_endpoint()?;
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair(API_KEY_PARAM, credential.expose());
        Ok(url)
    }

    /// POSTs `body` unchanged and returns whatever JSON the upstream answered
    /// with, alongside its status. Errors carry no URL.
    pub async fn forward(
        &self,
        body: &Value,
        credential: &Credential,
    ) -> Result<UpstreamReply, UpstreamError> {
        let url = self.endpoint_for(credential)?;
        let response = self
            .inner
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|err| UpstreamError::Transport(err.without_url()))?;

        let status = response.status();
        let body = response
            .json::<Value>()
            .await
            .map_err(|err| UpstreamError::InvalidBody {
                status: status.as_u16(),
                source: err.without_url(),
            })?;

        Ok(UpstreamReply { status, body })
    }
}
