//! Invoice lookup: ask the contract for the most recent payment a user made
//! for a resource and turn the answer into a payment decision.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::clarity::ClarityValue;
use crate::ledger::{LedgerClient, ReadOnlyCall};
use crate::{GateConfig, GateError, Network};

/// Most recent payment recorded on chain for a (resource, user) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceData {
    pub amount: u128,
    /// Block height at which the invoice was created.
    pub created_at: u128,
    pub resource_index: u128,
    pub resource_name: String,
    pub user_index: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

/// What a caller needs to submit payment without out-of-band docs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
    pub contract_name: String,
    pub contract_address: String,
    pub function_name: String,
    pub function_args: Vec<String>,
}

/// JSON body describing payment state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentData {
    pub paid: bool,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_data: Option<InvoiceData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_info: Option<PaymentInfo>,
}

/// Result of resolving one (resource, address) pair. Built fresh per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentDecision {
    Unpaid {
        status: String,
        payment_info: PaymentInfo,
    },
    Paid {
        status: String,
        invoice: InvoiceData,
    },
}

impl PaymentDecision {
    pub fn is_paid(&self) -> bool {
        matches!(self, PaymentDecision::Paid { .. })
    }

    pub fn to_payment_data(&self) -> PaymentData {
        match self {
            PaymentDecision::Unpaid {
                status,
                payment_info,
            } => PaymentData {
                paid: false,
                status: status.clone(),
                invoice_data: None,
                payment_info: Some(payment_info.clone()),
            },
            PaymentDecision::Paid { status, invoice } => PaymentData {
                paid: true,
                status: status.clone(),
                invoice_data: Some(invoice.clone()),
                payment_info: None,
            },
        }
    }
}

/// Decode the contract's answer.
///
/// `none` means no qualifying payment. `(some x)` and `(ok x)` are unwrapped.
/// A tuple must carry every invoice field with the right type; anything else
/// is a decode error, never an "unpaid" result.
pub fn decode_invoice(value: ClarityValue) -> Result<Option<InvoiceData>, GateError> {
    match value {
        ClarityValue::OptionalNone => Ok(None),
        ClarityValue::OptionalSome(inner) | ClarityValue::ResponseOk(inner) => {
            match *inner {
                ClarityValue::OptionalNone => Ok(None),
                ClarityValue::Tuple(fields) => decode_invoice_tuple(fields).map(Some),
                other => Err(GateError::DecodeError(format!(
                    "expected invoice tuple, got {}",
                    other.type_name()
                ))),
            }
        }
        ClarityValue::Tuple(fields) => decode_invoice_tuple(fields).map(Some),
        ClarityValue::ResponseErr(inner) => Err(GateError::DecodeError(format!(
            "contract returned error {}",
            inner.repr()
        ))),
        other => Err(GateError::DecodeError(format!(
            "unexpected {} in invoice response",
            other.type_name()
        ))),
    }
}

fn decode_invoice_tuple(
    mut fields: BTreeMap<String, ClarityValue>,
) -> Result<InvoiceData, GateError> {
    let hash = match fields.remove("hash") {
        None => None,
        Some(ClarityValue::Buffer(bytes)) => Some(alloy::hex::encode(bytes)),
        Some(other) => {
            return Err(GateError::DecodeError(format!(
                "field 'hash' must be buff, got {}",
                other.type_name()
            )))
        }
    };

    Ok(InvoiceData {
        amount: take_uint(&mut fields, "amount")?,
        created_at: take_uint(&mut fields, "createdAt")?,
        resource_index: take_uint(&mut fields, "resourceIndex")?,
        resource_name: take_string(&mut fields, "resourceName")?,
        user_index: take_uint(&mut fields, "userIndex")?,
        hash,
    })
}

fn take_uint(fields: &mut BTreeMap<String, ClarityValue>, key: &str) -> Result<u128, GateError> {
    match fields.remove(key) {
        Some(ClarityValue::UInt(v)) => Ok(v),
        Some(other) => Err(GateError::DecodeError(format!(
            "field '{key}' must be uint, got {}",
            other.type_name()
        ))),
        None => Err(GateError::DecodeError(format!("missing field '{key}'"))),
    }
}

fn take_string(
    fields: &mut BTreeMap<String, ClarityValue>,
    key: &str,
) -> Result<String, GateError> {
    match fields.remove(key) {
        Some(ClarityValue::StringUtf8(s)) | Some(ClarityValue::StringAscii(s)) => Ok(s),
        Some(other) => Err(GateError::DecodeError(format!(
            "field '{key}' must be a string, got {}",
            other.type_name()
        ))),
        None => Err(GateError::DecodeError(format!("missing field '{key}'"))),
    }
}

/// Looks up the latest payment for a (resource, address) pair.
pub struct InvoiceResolver<'a, L> {
    config: &'a GateConfig,
    ledger: &'a L,
}

impl<'a, L: LedgerClient> InvoiceResolver<'a, L> {
    pub fn new(config: &'a GateConfig, ledger: &'a L) -> Self {
        Self { config, ledger }
    }

    /// Contract call arguments, in order: `(string-utf8 resource, principal address)`.
    fn query_args(resource_name: &str, address: &str) -> Result<Vec<ClarityValue>, GateError> {
        Ok(vec![
            ClarityValue::string_utf8(resource_name),
            ClarityValue::principal(address)?,
        ])
    }

    /// Instructions for paying the invoice for `resource_name` as `address`.
    pub fn payment_info(
        &self,
        resource_name: &str,
        address: &str,
        network: Network,
    ) -> Result<PaymentInfo, GateError> {
        let contract = &self.config.network(network).contract;
        Ok(PaymentInfo {
            contract_name: contract.contract_name.clone(),
            contract_address: contract.contract_address.clone(),
            function_name: self.config.payment_function.clone(),
            function_args: Self::query_args(resource_name, address)?
                .iter()
                .map(ClarityValue::repr)
                .collect(),
        })
    }

    pub async fn resolve(
        &self,
        resource_name: &str,
        address: &str,
        network: Network,
    ) -> Result<PaymentDecision, GateError> {
        let network_config = self.config.network(network);
        let call = ReadOnlyCall {
            contract_address: network_config.contract.contract_address.clone(),
            contract_name: network_config.contract.contract_name.clone(),
            function_name: self.config.query_function.clone(),
            function_args: Self::query_args(resource_name, address)?,
            sender: address.to_string(),
        };

        let value = self.ledger.call_read_only(network_config, &call).await?;

        match decode_invoice(value)? {
            Some(invoice) => {
                tracing::debug!(
                    resource = %resource_name,
                    user_index = %invoice.user_index,
                    created_at = %invoice.created_at,
                    "payment found"
                );
                Ok(PaymentDecision::Paid {
                    status: format!("Payment found for resource {resource_name}"),
                    invoice,
                })
            }
            None => Ok(PaymentDecision::Unpaid {
                status: format!("No payment found for resource {resource_name}"),
                payment_info: self.payment_info(resource_name, address, network)?,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoice_tuple() -> ClarityValue {
        ClarityValue::tuple([
            ("amount", ClarityValue::uint(1000)),
            ("createdAt", ClarityValue::uint(148918)),
            ("resourceIndex", ClarityValue::uint(1)),
            ("resourceName", ClarityValue::string_utf8("bitcoin-face")),
            ("userIndex", ClarityValue::uint(1)),
        ])
    }

    #[test]
    fn test_decode_none_is_unpaid() {
        assert_eq!(decode_invoice(ClarityValue::OptionalNone).unwrap(), None);
        assert_eq!(
            decode_invoice(ClarityValue::ok(ClarityValue::OptionalNone)).unwrap(),
            None
        );
    }

    #[test]
    fn test_decode_some_tuple() {
        let invoice = decode_invoice(ClarityValue::some(invoice_tuple()))
            .unwrap()
            .unwrap();
        assert_eq!(invoice.amount, 1000);
        assert_eq!(invoice.created_at, 148918);
        assert_eq!(invoice.resource_index, 1);
        assert_eq!(invoice.resource_name, "bitcoin-face");
        assert_eq!(invoice.user_index, 1);
        assert!(invoice.hash.is_none());
    }

    #[test]
    fn test_decode_bare_tuple_with_hash() {
        let mut value = invoice_tuple();
        if let ClarityValue::Tuple(ref mut fields) = value {
            fields.insert("hash".to_string(), ClarityValue::Buffer(vec![0xab, 0xcd]));
        }
        let invoice = decode_invoice(value).unwrap().unwrap();
        assert_eq!(invoice.hash.as_deref(), Some("abcd"));
    }

    #[test]
    fn test_decode_missing_field_fails() {
        let mut value = invoice_tuple();
        if let ClarityValue::Tuple(ref mut fields) = value {
            fields.remove("userIndex");
        }
        let err = decode_invoice(ClarityValue::some(value)).unwrap_err();
        assert!(matches!(err, GateError::DecodeError(_)));
        assert!(err.to_string().contains("userIndex"));
    }

    #[test]
    fn test_decode_wrong_type_fails() {
        let mut value = invoice_tuple();
        if let ClarityValue::Tuple(ref mut fields) = value {
            fields.insert("amount".to_string(), ClarityValue::Int(1000));
        }
        let err = decode_invoice(value).unwrap_err();
        assert!(err.to_string().contains("must be uint"));
    }

    #[test]
    fn test_decode_unexpected_shape_fails() {
        assert!(decode_invoice(ClarityValue::Bool(true)).is_err());
        assert!(decode_invoice(ClarityValue::some(ClarityValue::uint(1))).is_err());
        assert!(decode_invoice(ClarityValue::err(ClarityValue::uint(404))).is_err());
    }

    #[test]
    fn test_payment_data_json_shape() {
        let decision = PaymentDecision::Unpaid {
            status: "No payment found for resource x".to_string(),
            payment_info: PaymentInfo {
                contract_name: "c".to_string(),
                contract_address: "a".to_string(),
                function_name: "f".to_string(),
                function_args: vec!["u\"x\"".to_string()],
            },
        };
        let json = serde_json::to_value(decision.to_payment_data()).unwrap();
        assert_eq!(json["paid"], false);
        assert_eq!(json["paymentInfo"]["contractName"], "c");
        assert_eq!(json["paymentInfo"]["functionArgs"][0], "u\"x\"");
        assert!(json.get("invoiceData").is_none());
    }
}
