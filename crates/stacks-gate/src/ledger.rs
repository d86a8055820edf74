//! Read-only contract calls against the Stacks ledger.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::clarity::ClarityValue;
use crate::{GateError, NetworkConfig};

/// One read-only contract function invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOnlyCall {
    pub contract_address: String,
    pub contract_name: String,
    pub function_name: String,
    pub function_args: Vec<ClarityValue>,
    pub sender: String,
}

/// Ledger access used by the invoice resolver.
///
/// Implementations must be side-effect free on chain; a call may be retried or
/// abandoned at any time.
pub trait LedgerClient: Send + Sync {
    /// Evaluate a read-only function on `network` and return its Clarity result.
    fn call_read_only(
        &self,
        network: &NetworkConfig,
        call: &ReadOnlyCall,
    ) -> impl Future<Output = Result<ClarityValue, GateError>> + Send;
}

#[derive(Debug, Serialize)]
struct CallReadRequest<'a> {
    sender: &'a str,
    arguments: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CallReadResponse {
    okay: bool,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    cause: Option<String>,
}

/// [`LedgerClient`] backed by the Stacks node HTTP API
/// (`POST /v2/contracts/call-read/{address}/{name}/{function}`).
#[derive(Debug, Clone)]
pub struct StacksApiClient {
    http: reqwest::Client,
}

impl StacksApiClient {
    /// Build a client whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, GateError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GateError::ConfigError(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    fn call_url(network: &NetworkConfig, call: &ReadOnlyCall) -> String {
        format!(
            "{}/v2/contracts/call-read/{}/{}/{}",
            network.api_url.trim_end_matches('/'),
            call.contract_address,
            call.contract_name,
            call.function_name
        )
    }
}

impl LedgerClient for StacksApiClient {
    async fn call_read_only(
        &self,
        network: &NetworkConfig,
        call: &ReadOnlyCall,
    ) -> Result<ClarityValue, GateError> {
        let arguments = call
            .function_args
            .iter()
            .map(ClarityValue::to_hex)
            .collect::<Result<Vec<_>, _>>()?;
        let body = CallReadRequest {
            sender: &call.sender,
            arguments,
        };
        let url = Self::call_url(network, call);

        tracing::debug!(
            network = %network.network,
            function = %call.function_name,
            "read-only call"
        );

        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| GateError::LedgerError(format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(GateError::LedgerError(format!(
                "call-read returned HTTP {status}"
            )));
        }

        let parsed: CallReadResponse = resp
            .json()
            .await
            .map_err(|e| GateError::LedgerError(format!("response parse failed: {e}")))?;

        parse_call_read(parsed)
    }
}

fn parse_call_read(resp: CallReadResponse) -> Result<ClarityValue, GateError> {
    if !resp.okay {
        return Err(GateError::LedgerError(format!(
            "read-only call rejected: {}",
            resp.cause.as_deref().unwrap_or("no cause given")
        )));
    }
    let result = resp
        .result
        .ok_or_else(|| GateError::LedgerError("response missing result".to_string()))?;
    ClarityValue::from_hex(&result)
}
