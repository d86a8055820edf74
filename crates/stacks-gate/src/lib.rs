//! Pay-per-use access gating against invoices recorded on the Stacks blockchain.
//!
//! A caller proves control of a Stacks address with a SIP-018 structured-message
//! signature, and the invoice contract is asked whether that address has paid
//! for the requested resource. Each request ends in exactly one outcome:
//! bad request, payment required (with payment instructions), or granted.
//!
//! # Pipeline
//!
//! - [`address`]: c32check address parsing and per-network validation
//! - [`message`]: structured-message hashing and signer recovery
//! - [`invoice`]: read-only invoice lookup and strict response decoding
//! - [`access`]: the decision engine tying the steps together
//!
//! # Quick example
//!
//! ```no_run
//! use std::time::Duration;
//! use stacks_gate::{decide, AccessDecision, AccessRequest, GateConfig, StacksApiClient};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let config = GateConfig::default();
//! let ledger = StacksApiClient::new(Duration::from_secs(30)).unwrap();
//! let request = AccessRequest {
//!     resource: Some("bitcoin-face".into()),
//!     address: Some("ST2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKQYAC0RQ".into()),
//!     network: Some("testnet".into()),
//!     signed_message: Some("<rsv hex>".into()),
//! };
//!
//! match decide(&config, &ledger, &request).await.unwrap() {
//!     AccessDecision::BadRequest(reason) => println!("rejected: {reason}"),
//!     AccessDecision::PaymentRequired { payment_info, .. } => println!("pay: {payment_info:?}"),
//!     AccessDecision::Granted { invoice, .. } => println!("paid at {}", invoice.created_at),
//! }
//! # }
//! ```

pub mod constants;
pub mod error;

pub mod address;
pub mod clarity;
pub mod message;

pub mod access;
pub mod invoice;
pub mod ledger;

pub use constants::*;
pub use error::GateError;

pub use access::{check_request, decide, AccessDecision, AccessRequest};
pub use address::{validate_address, StacksAddress};
pub use clarity::ClarityValue;
pub use invoice::{InvoiceData, InvoiceResolver, PaymentData, PaymentDecision, PaymentInfo};
pub use ledger::{LedgerClient, ReadOnlyCall, StacksApiClient};
pub use message::{sign_address_message, verify_signed_message};
