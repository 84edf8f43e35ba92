//! Client for the Helius Digital Asset Standard API, reached through the
//! gateway proxy so the API key never leaves the server.
//!
//! Every call is a JSON-RPC 2.0 envelope with a fixed id. Failures are logged
//! and returned as-is; retrying is the query layer's job.

pub mod models;

use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};
use url::Url;

use crate::config::ClientConfig;
use crate::credentials;
use crate::models::health::HealthReport;

use self::models::{AssetList, AssetProof, CompressedNft, DasAsset, compressed_nfts};

pub const DAS_REQUEST_ID: &str = "helius-das-api";
pub const PROXY_PATH: &str = "api/helius/proxy";
pub const HEALTH_PATH: &str = "api/helius/health";
pub const OWNER_PAGE_LIMIT: u32 = 1_000;

const API_ERROR_FALLBACK: &str = "Helius API request failed";

#[derive(Debug, thiserror::Error)]
pub enum DasError {
    /// The proxy answered with a non-2xx status.
    #[error("Helius proxy error: {status} {body}")]
    Transport { status: u16, body: String },
    #[error("Helius proxy request failed: {0}")]
    Http(reqwest::Error),
    /// The JSON-RPC envelope carried an `error` member.
    #[error("{message}")]
    Api { code: Option<i64>, message: String },
    #[error("Failed to decode {method} response: {source}")]
    Decode {
        method: String,
        source: serde_json::Error,
    },
    #[error("Invalid gateway URL: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a, P> {
    jsonrpc: &'static str,
    id: &'static str,
    method: &'a str,
    params: P,
}

#[derive(Debug, serde::Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AssetsByOwnerParams<'a> {
    owner_address: &'a str,
    page: u32,
    limit: u32,
    display_options: DisplayOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DisplayOptions {
    show_fungible: bool,
    show_native_balance: bool,
}

#[derive(Debug, Serialize)]
struct AssetIdParams<'a> {
    id: &'a str,
}

#[derive(Clone)]
pub struct DasClient {
    http: reqwest::Client,
    proxy_url: Url,
    health_url: Url,
    configured: bool,
}

impl DasClient {
    pub fn new(config: &ClientConfig) -> Result<Self, DasError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(DasError::Http)?;

        Ok(Self {
            http,
            proxy_url: config.gateway_url.join(PROXY_PATH)?,
            health_url: config.gateway_url.join(HEALTH_PATH)?,
            configured: config
                .public_api_key
                .as_deref()
                .is_some_and(credentials::is_usable),
        })
    }

    /// Client-side key check; consults the public key only.
    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Sends one DAS method through the proxy and returns its `result`.
    pub async fn call<P, T>(&self, method: &str, params: P) -> Result<T, DasError>
    where
        P: Serialize,
        T: DeserializeOwned,
    {
        assert!(!method.is_empty(), "DAS method must be provided");
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: DAS_REQUEST_ID,
            method,
            params,
        };

        let response = self
            .http
            .post(self.proxy_url.clone())
            .json(&request)
            .send()
            .await
            .map_err(DasError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.map_err(DasError::Http)?;
            return Err(DasError::Transport {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await.map_err(DasError::Http)?;
        let envelope: RpcResponse =
            serde_json::from_slice(&bytes).map_err(|source| DasError::Decode {
                method: method.to_string(),
                source,
            })?;

        if is_error_set(&envelope.error) {
            return Err(api_error(&envelope.error));
        }

        debug!(method, "DAS call succeeded");
        serde_json::from_value(envelope.result).map_err(|source| DasError::Decode {
            method: method.to_string(),
            source,
        })
    }

    /// All compressed NFTs held by `owner`, first page of up to 1000 assets.
    pub async fn get_assets_by_owner(&self, owner: &str) -> Result<Vec<CompressedNft>, DasError> {
        let params = AssetsByOwnerParams {
            owner_address: owner,
            page: 1,
            limit: OWNER_PAGE_LIMIT,
            display_options: DisplayOptions {
                show_fungible: false,
                show_native_balance: false,
            },
        };
        let result = self
            .call::<_, AssetList>("getAssetsByOwner", params)
            .await
            .and_then(|page| {
                compressed_nfts(&page.items).map_err(|source| DasError::Decode {
                    method: "getAssetsByOwner".to_string(),
                    source,
                })
            });
        log_failure("Error fetching cNFTs", result)
    }

    pub async fn get_asset(&self, id: &str) -> Result<DasAsset, DasError> {
        log_failure(
            "Error fetching asset",
            self.call("getAsset", AssetIdParams { id }).await,
        )
    }

    /// Merkle proof needed by on-chain instructions acting on the asset.
    pub async fn get_asset_proof(&self, id: &str) -> Result<AssetProof, DasError> {
        log_failure(
            "Error fetching asset proof",
            self.call("getAssetProof", AssetIdParams { id }).await,
        )
    }

    /// Asks the gateway whether it holds a usable key. Any failure to get an
    /// answer counts as not ok.
    pub async fn gateway_health(&self) -> HealthReport {
        let response = match self.http.get(self.health_url.clone()).send().await {
            Ok(response) => response,
            Err(err) => return HealthReport::failed(err.without_url().to_string()),
        };
        let status = response.status();
        match response.json::<HealthReport>().await {
            Ok(report) if status == StatusCode::OK => report,
            Ok(report) => HealthReport {
                ok: false,
                message: report.message,
            },
            Err(err) => HealthReport::failed(err.without_url().to_string()),
        }
    }
}

/// An `error` member only counts when it carries something: `null`, `false`,
/// `0` and `""` are treated as absent.
fn is_error_set(error: &Value) -> bool {
    match error {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn api_error(error: &Value) -> DasError {
    let message = match error {
        Value::Object(map) => map.get("message").and_then(Value::as_str),
        Value::String(text) => Some(text.as_str()),
        _ => None,
    }
    .filter(|m| !m.is_empty())
    .unwrap_or(API_ERROR_FALLBACK)
    .to_string();

    DasError::Api {
        code: error.get("code").and_then(Value::as_i64),
        message,
    }
}

fn log_failure<T>(context: &str, result: Result<T, DasError>) -> Result<T, DasError> {
    if let Err(err) = &result {
        error!("{context}: {err}");
    }
    result
}
