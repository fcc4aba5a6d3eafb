//! Gateway error taxonomy.

use thiserror::Error;

/// Malformed ABI data. Always terminal for the call that produced it.
#[derive(Debug, Error)]
pub enum AbiError {
    #[error("return data truncated: need {need} bytes, have {have}")]
    Truncated { need: usize, have: usize },

    #[error("offset out of range: {0}")]
    BadOffset(usize),

    #[error("array length out of range: {0}")]
    BadLength(usize),

    #[error("invalid utf-8 in string field")]
    InvalidUtf8,
}

/// Errors crossing the remote-call boundary.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The endpoint could not be reached at all. This class is never
    /// retried by [`crate::retry_read`].
    #[error("RPC endpoint unreachable: {0}")]
    Unreachable(String),

    /// The node or wallet refused to sign/broadcast the transaction.
    #[error("transaction rejected: {0}")]
    Rejected(String),

    /// The transaction was mined but reverted.
    #[error("transaction reverted on-chain")]
    Reverted,

    /// The RPC call itself failed (node-side error object).
    #[error("RPC call failed: {0}")]
    Call(String),

    #[error(transparent)]
    Abi(#[from] AbiError),

    /// The node returned something we could not interpret.
    #[error("unexpected RPC response: {0}")]
    Response(String),
}

impl GatewayError {
    /// Whether a polling read may try again. Unreachable-endpoint and
    /// decode failures are terminal for the calling layer.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Call(_) | GatewayError::Response(_))
    }
}
