//! Resource generation for granted requests.
//!
//! A paid invoice maps to one deterministic [`ResourceKey`]; the generator
//! renders the resource for that key.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use stacks_gate::{ContractCoordinates, GateError, InvoiceData};

pub const DEFAULT_GENERATOR_URL: &str = "https://bitcoinfaces.xyz/api/get-image";

/// Content type assumed when the generator does not send one.
pub const DEFAULT_CONTENT_TYPE: &str = "image/svg+xml";

/// Maximum generated resource size (10 MB).
const MAX_RESOURCE_SIZE: usize = 10 * 1024 * 1024;

/// Generation key: `<contractAddress>.<contractName>.<resourceName>.<userIndex>[.<createdAt>]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceKey {
    pub contract_address: String,
    pub contract_name: String,
    pub resource_name: String,
    pub user_index: u128,
    pub created_at: Option<u128>,
}

impl ResourceKey {
    pub fn for_invoice(contract: &ContractCoordinates, invoice: &InvoiceData) -> Self {
        Self {
            contract_address: contract.contract_address.clone(),
            contract_name: contract.contract_name.clone(),
            resource_name: invoice.resource_name.clone(),
            user_index: invoice.user_index,
            created_at: Some(invoice.created_at),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.contract_address, self.contract_name, self.resource_name, self.user_index
        )?;
        if let Some(created_at) = self.created_at {
            write!(f, ".{created_at}")?;
        }
        Ok(())
    }
}

/// Rendered resource returned to the caller as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedResource {
    pub content_type: String,
    pub body: Bytes,
}

pub trait ResourceGenerator: Send + Sync {
    fn generate(
        &self,
        key: &ResourceKey,
    ) -> impl Future<Output = Result<GeneratedResource, GateError>> + Send;
}

/// [`ResourceGenerator`] that fetches `GET {base_url}?name={key}`.
#[derive(Debug, Clone)]
pub struct HttpGenerator {
    http: reqwest::Client,
    base_url: String,
}

impl HttpGenerator {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GateError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GateError::ConfigError(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(http, base_url))
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

impl ResourceGenerator for HttpGenerator {
    async fn generate(&self, key: &ResourceKey) -> Result<GeneratedResource, GateError> {
        let name = key.to_string();
        let mut response = self
            .http
            .get(&self.base_url)
            .query(&[("name", name.as_str())])
            .send()
            .await
            .map_err(|e| GateError::GeneratorError(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GateError::GeneratorError(format!(
                "generator returned status {status}"
            )));
        }

        if let Some(len) = response.content_length() {
            if len > MAX_RESOURCE_SIZE as u64 {
                return Err(GateError::GeneratorError(format!(
                    "resource too large: {len} bytes (max {MAX_RESOURCE_SIZE})"
                )));
            }
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();

        // Chunked responses carry no content-length, so enforce the cap while reading
        let mut body = Vec::with_capacity(
            response
                .content_length()
                .unwrap_or(0)
                .min(MAX_RESOURCE_SIZE as u64) as usize,
        );
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| GateError::GeneratorError(format!("failed to read body: {e}")))?
        {
            if body.len() + chunk.len() > MAX_RESOURCE_SIZE {
                return Err(GateError::GeneratorError(format!(
                    "resource exceeded {MAX_RESOURCE_SIZE} bytes"
                )));
            }
            body.extend_from_slice(&chunk);
        }

        tracing::debug!(key = %name, bytes = body.len(), "Generated resource");

        Ok(GeneratedResource {
            content_type,
            body: Bytes::from(body),
        })
    }
}
