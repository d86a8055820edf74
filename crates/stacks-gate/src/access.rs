//! Access decision engine.
//!
//! Runs the per-request pipeline: required parameters, network, address
//! format, signature, then the on-chain invoice lookup. The first failing
//! step decides the outcome; no step is retried.

use serde::{Deserialize, Serialize};

use crate::address::validate_address;
use crate::invoice::{InvoiceData, InvoiceResolver, PaymentData, PaymentDecision, PaymentInfo};
use crate::ledger::LedgerClient;
use crate::message::verify_signed_message;
use crate::{GateConfig, GateError, Network};

/// One incoming access request, as received (parameters may be absent).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRequest {
    pub resource: Option<String>,
    pub address: Option<String>,
    pub network: Option<String>,
    pub signed_message: Option<String>,
}

/// Terminal outcome of [`decide`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// The request is malformed or the signature does not prove the address.
    BadRequest(String),
    /// No qualifying payment; carries instructions for paying.
    PaymentRequired {
        status: String,
        payment_info: PaymentInfo,
    },
    /// Paid; the invoice drives the resource fetch.
    Granted {
        status: String,
        invoice: InvoiceData,
        network: Network,
    },
}

impl AccessDecision {
    /// Short label for logs and metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            AccessDecision::BadRequest(_) => "bad_request",
            AccessDecision::PaymentRequired { .. } => "payment_required",
            AccessDecision::Granted { .. } => "granted",
        }
    }

    /// Response body for payment outcomes; `None` for bad requests.
    pub fn payment_data(&self) -> Option<PaymentData> {
        match self {
            AccessDecision::BadRequest(_) => None,
            AccessDecision::PaymentRequired {
                status,
                payment_info,
            } => Some(
                PaymentDecision::Unpaid {
                    status: status.clone(),
                    payment_info: payment_info.clone(),
                }
                .to_payment_data(),
            ),
            AccessDecision::Granted { status, invoice, .. } => Some(
                PaymentDecision::Paid {
                    status: status.clone(),
                    invoice: invoice.clone(),
                }
                .to_payment_data(),
            ),
        }
    }

    fn from_payment(decision: PaymentDecision, network: Network) -> Self {
        match decision {
            PaymentDecision::Unpaid {
                status,
                payment_info,
            } => AccessDecision::PaymentRequired {
                status,
                payment_info,
            },
            PaymentDecision::Paid { status, invoice } => AccessDecision::Granted {
                status,
                invoice,
                network,
            },
        }
    }
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, AccessDecision> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AccessDecision::BadRequest(format!(
            "Missing required parameter: {name}"
        ))),
    }
}

/// Validate the request without touching the network.
///
/// Returns the checked `(resource, address, network)` or the bad-request outcome.
pub fn check_request<'a>(
    config: &GateConfig,
    request: &'a AccessRequest,
) -> Result<(&'a str, &'a str, Network), AccessDecision> {
    let resource = required(&request.resource, "resource")?;
    let address = required(&request.address, "address")?;
    let signed_message = required(&request.signed_message, "signedMessage")?;

    let network = match request.network.as_deref().map(str::trim) {
        None | Some("") => Network::default(),
        Some(tag) => tag.parse::<Network>().map_err(|_| {
            AccessDecision::BadRequest("Invalid network, must be mainnet or testnet".to_string())
        })?,
    };

    if !validate_address(address, network) {
        return Err(AccessDecision::BadRequest(format!(
            "Invalid address for network {network}"
        )));
    }

    match verify_signed_message(config, network, address, signed_message) {
        Ok(_) => Ok((resource, address, network)),
        Err(GateError::AddressMismatch { claimed, recovered }) => {
            tracing::debug!(%claimed, %recovered, "signature recovered a different address");
            Err(AccessDecision::BadRequest("address mismatch".to_string()))
        }
        Err(e) => {
            tracing::debug!(error = %e, "signature verification failed");
            Err(AccessDecision::BadRequest(format!("Invalid signature: {e}")))
        }
    }
}

/// Decide whether a request may access its resource.
///
/// Request problems come back as [`AccessDecision::BadRequest`]; only ledger
/// and decode faults are returned as `Err`.
pub async fn decide<L: LedgerClient>(
    config: &GateConfig,
    ledger: &L,
    request: &AccessRequest,
) -> Result<AccessDecision, GateError> {
    let (resource, address, network) = match check_request(config, request) {
        Ok(checked) => checked,
        Err(decision) => return Ok(decision),
    };

    let decision = InvoiceResolver::new(config, ledger)
        .resolve(resource, address, network)
        .await?;

    tracing::info!(
        %resource,
        %address,
        %network,
        paid = decision.is_paid(),
        "access decision"
    );

    Ok(AccessDecision::from_payment(decision, network))
}
