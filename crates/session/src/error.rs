//! Session error taxonomy.
//!
//! Precondition errors reject locally before any network call and change no
//! state. Gateway errors cross the remote boundary; broadcast and revert
//! failures reset the submission machine, and none of them touch pending
//! points.

use alloy_primitives::U256;
use click_gateway::chain::{format_native, NATIVE_SYMBOL};
use click_gateway::GatewayError;
use thiserror::Error;

use crate::registration::MAX_USERNAME_LEN;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no points to submit")]
    NothingToSubmit,

    #[error(
        "insufficient balance: need {} {}, have {} {}",
        format_native(*.required), NATIVE_SYMBOL, format_native(*.available), NATIVE_SYMBOL
    )]
    InsufficientBalance { required: U256, available: U256 },

    /// At most one submission may be in flight per session.
    #[error("a submission is already in flight")]
    SubmissionInFlight,

    /// `resume_pending` called with nothing awaiting confirmation.
    #[error("no submission awaiting confirmation")]
    NothingPending,

    #[error("username must not be empty")]
    EmptyUsername,

    #[error("username longer than {} characters", MAX_USERNAME_LEN)]
    UsernameTooLong,

    #[error("unknown country: {0:?}")]
    UnknownCountry(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl SessionError {
    /// True for errors rejected locally, before any remote call.
    pub fn is_precondition(&self) -> bool {
        !matches!(self, SessionError::Gateway(_))
    }
}
