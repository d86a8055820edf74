use thiserror::Error;

/// Errors returned by stacks-gate operations.
///
/// Request-level problems (`InvalidNetwork`, `InvalidAddress`, `SignatureError`,
/// `AddressMismatch`) are recovered by the access engine and reported to the
/// caller as bad requests. The remaining variants are faults.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("invalid network: {0}")]
    InvalidNetwork(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("signature error: {0}")]
    SignatureError(String),

    #[error("address mismatch: claimed {claimed}, recovered {recovered}")]
    AddressMismatch { claimed: String, recovered: String },

    #[error("clarity error: {0}")]
    ClarityError(String),

    #[error("decode error: {0}")]
    DecodeError(String),

    #[error("ledger error: {0}")]
    LedgerError(String),

    #[error("generator error: {0}")]
    GeneratorError(String),

    #[error("config error: {0}")]
    ConfigError(String),

    #[error("serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

impl GateError {
    /// True for errors caused by the caller's input rather than by a collaborator.
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            GateError::InvalidNetwork(_)
                | GateError::InvalidAddress(_)
                | GateError::SignatureError(_)
                | GateError::AddressMismatch { .. }
        )
    }
}
