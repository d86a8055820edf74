use std::env;
use std::time::Duration;

use stacks_gate::clarity::validate_contract_name;
use stacks_gate::{validate_address, GateConfig, Network};
use url::Url;

use crate::generator::DEFAULT_GENERATOR_URL;

const DEFAULT_PORT: u16 = 8787;
const DEFAULT_RATE_LIMIT_RPM: u64 = 60;
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;

#[derive(Clone)]
pub struct ServerConfig {
    /// Protocol settings: networks, contract coordinates, message domain
    pub gate: GateConfig,
    /// Server port
    pub port: u16,
    /// Rate limit requests per minute per IP
    pub rate_limit_rpm: u64,
    /// CORS allowed origins (empty = localhost only)
    pub allowed_origins: Vec<String>,
    /// Bearer token required for /metrics (None = public)
    pub metrics_token: Option<String>,
    /// Resource generator endpoint
    pub generator_url: String,
    /// Timeout for ledger and generator calls
    pub upstream_timeout: Duration,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("gate", &self.gate)
            .field("port", &self.port)
            .field("rate_limit_rpm", &self.rate_limit_rpm)
            .field("allowed_origins", &self.allowed_origins)
            .field(
                "metrics_token",
                &self.metrics_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("generator_url", &self.generator_url)
            .field("upstream_timeout", &self.upstream_timeout)
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            gate: GateConfig::default(),
            port: DEFAULT_PORT,
            rate_limit_rpm: DEFAULT_RATE_LIMIT_RPM,
            allowed_origins: Vec::new(),
            metrics_token: None,
            generator_url: DEFAULT_GENERATOR_URL.to_string(),
            upstream_timeout: Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| var(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(port) = var("PORT") {
            config.port = port
                .parse()
                .map_err(|_| ConfigError::InvalidNumber("PORT", port))?;
        }

        if let Some(rpm) = var("RATE_LIMIT_RPM") {
            config.rate_limit_rpm = rpm
                .parse()
                .ok()
                .filter(|r| *r > 0)
                .ok_or(ConfigError::InvalidNumber("RATE_LIMIT_RPM", rpm))?;
        }

        if let Some(secs) = var("UPSTREAM_TIMEOUT_SECS") {
            let parsed: u64 = secs
                .parse()
                .ok()
                .filter(|s| *s > 0)
                .ok_or(ConfigError::InvalidNumber("UPSTREAM_TIMEOUT_SECS", secs))?;
            config.upstream_timeout = Duration::from_secs(parsed);
        }

        config.allowed_origins = var("ALLOWED_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        config.metrics_token = var("METRICS_TOKEN");

        if let Some(url) = var("GENERATOR_URL") {
            config.generator_url = validate_url(url)?;
        }
        if let Some(url) = var("STACKS_MAINNET_API_URL") {
            config.gate.mainnet.api_url = validate_url(url)?;
        }
        if let Some(url) = var("STACKS_TESTNET_API_URL") {
            config.gate.testnet.api_url = validate_url(url)?;
        }

        if let Some(addr) = var("CONTRACT_ADDRESS_MAINNET") {
            config.gate.mainnet.contract.contract_address =
                validate_contract_address(addr, Network::Mainnet)?;
        }
        if let Some(addr) = var("CONTRACT_ADDRESS_TESTNET") {
            config.gate.testnet.contract.contract_address =
                validate_contract_address(addr, Network::Testnet)?;
        }
        if let Some(name) = var("CONTRACT_NAME") {
            validate_contract_name(&name)
                .map_err(|_| ConfigError::InvalidContractName(name.clone()))?;
            config.gate.mainnet.contract.contract_name = name.clone();
            config.gate.testnet.contract.contract_name = name;
        }

        if config.allowed_origins.iter().any(|o| o == "*") {
            tracing::warn!("ALLOWED_ORIGINS contains '*'; any origin may call the API");
        }
        if config.metrics_token.is_none() {
            tracing::warn!("METRICS_TOKEN not set; /metrics endpoint is publicly accessible");
        }

        Ok(config)
    }
}

fn validate_url(url: String) -> Result<String, ConfigError> {
    match Url::parse(&url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(url),
        _ => Err(ConfigError::InvalidUrl(url)),
    }
}

fn validate_contract_address(addr: String, network: Network) -> Result<String, ConfigError> {
    if validate_address(&addr, network) {
        Ok(addr)
    } else {
        Err(ConfigError::InvalidAddress(format!("{addr} is not a {network} address")))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid number for {0}: {1}")]
    InvalidNumber(&'static str, String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("invalid contract name: {0}")]
    InvalidContractName(String),
}
