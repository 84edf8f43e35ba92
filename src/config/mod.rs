use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use url::Url;

use crate::retry::RetryPolicy;

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub server: ServerConfig,
    pub helius: HeliusConfig,
}

impl ApiConfig {
    pub fn load() -> Result<Self> {
        let configured_path = std::env::var("DAS_GATEWAY_CONFIG")
            .unwrap_or_else(|_| "config/gateway.toml".to_string());
        assert!(
            !configured_path.is_empty(),
            "Configuration path must be non-empty"
        );
        assert!(
            configured_path.len() < 4096,
            "Configuration path length exceeds hard limit"
        );

        let mut builder = Config::builder()
            .add_source(File::new(&configured_path, FileFormat::Toml).required(true));

        if let Ok(env_override) = std::env::var("DAS_GATEWAY_ENV") {
            if !env_override.is_empty() {
                let env_file = format!("config/gateway.{}.toml", env_override);
                if Path::new(&env_file).exists() {
                    builder = builder.add_source(File::new(&env_file, FileFormat::Toml));
                }
            }
        }

        builder = builder.add_source(Environment::with_prefix("DAS_GATEWAY").separator("__"));

        let settings = builder
            .build()
            .map_err(|err| map_config_error(err, &configured_path))?;
        let config: Self = settings
            .try_deserialize()
            .context("Failed to deserialize gateway configuration")?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        assert!(
            self.server.port > 0,
            "Server port must be greater than zero"
        );
        self.helius.upstream_url().context("Invalid Helius upstream URL")?;
        self.helius.request_timeout();
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: Option<IpAddr>,
    pub port: u16,
}

impl ServerConfig {
    pub fn address(&self) -> SocketAddr {
        let host = self.host.unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert!(self.port != 0, "HTTP port cannot be zero");
        assert!(self.port < 65535, "HTTP port must be below 65535");
        SocketAddr::new(host, self.port)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeliusNetwork {
    #[default]
    Devnet,
    Mainnet,
}

impl HeliusNetwork {
    pub fn rpc_base(self) -> &'static str {
        match self {
            HeliusNetwork::Devnet => "https://devnet.helius-rpc.com/",
            HeliusNetwork::Mainnet => "https://mainnet.helius-rpc.com/",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeliusConfig {
    #[serde(default)]
    pub network: HeliusNetwork,
    /// Replaces the network-derived endpoint, mostly for tests and staging.
    #[serde(default)]
    pub upstream_url: Option<String>,
    pub request_timeout_ms: Option<u64>,
}

impl HeliusConfig {
    pub fn for_network(network: HeliusNetwork) -> Self {
        Self {
            network,
            upstream_url: None,
            request_timeout_ms: None,
        }
    }

    pub fn upstream_url(&self) -> Result<Url, url::ParseError> {
        let raw = self
            .upstream_url
            .as_deref()
            .unwrap_or_else(|| self.network.rpc_base());
        Url::parse(raw)
    }

    pub fn request_timeout(&self) -> Duration {
        let millis = self.request_timeout_ms.unwrap_or(10_000);
        assert!(millis >= 100, "Upstream timeout must be at least 100ms");
        assert!(millis <= 60_000, "Upstream timeout cannot exceed 60 seconds");
        Duration::from_millis(millis)
    }
}

/// Settings for code that talks to the gateway rather than to Helius.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub gateway_url: Url,
    /// Public key as exposed to browser bundles. Only its presence is checked.
    #[serde(default)]
    pub public_api_key: Option<String>,
    #[serde(default = "ClientConfig::default_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl ClientConfig {
    pub fn new(gateway_url: Url, public_api_key: Option<String>) -> Self {
        Self {
            gateway_url,
            public_api_key,
            request_timeout_ms: Self::default_timeout_ms(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        assert!(
            self.request_timeout_ms >= 100,
            "Client timeout must be at least 100ms"
        );
        assert!(
            self.request_timeout_ms <= 120_000,
            "Client timeout cannot exceed 120 seconds"
        );
        Duration::from_millis(self.request_timeout_ms)
    }

    const fn default_timeout_ms() -> u64 {
        30_000
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "QueryConfig::default_stale_time_ms")]
    pub stale_time_ms: u64,
    #[serde(default = "QueryConfig::default_retention_seconds")]
    pub retention_seconds: u64,
    #[serde(default = "QueryConfig::default_max_capacity")]
    pub max_capacity: u64,
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            stale_time_ms: Self::default_stale_time_ms(),
            retention_seconds: Self::default_retention_seconds(),
            max_capacity: Self::default_max_capacity(),
            retry: RetryPolicy::default(),
        }
    }
}

impl QueryConfig {
    pub fn stale_time(&self) -> Duration {
        Duration::from_millis(self.stale_time_ms)
    }

    pub fn retention(&self) -> Duration {
        assert!(
            self.retention_seconds <= 86_400,
            "Query cache retention cannot exceed one day"
        );
        let retention = Duration::from_secs(self.retention_seconds);
        assert!(
            retention >= self.stale_time(),
            "Retention must cover the stale window"
        );
        retention
    }

    const fn default_stale_time_ms() -> u64 {
        30_000
    }

    const fn default_retention_seconds() -> u64 {
        300
    }

    const fn default_max_capacity() -> u64 {
        1_024
    }
}

fn map_config_error(err: ConfigError, path: &str) -> ConfigError {
    match err {
        ConfigError::NotFound(_) => ConfigError::NotFound(path.to_string()),
        other => other,
    }
}
