//! Submission state machine types.
//!
//! Life cycle of one submission:
//!
//! ```text
//! Idle -> Submitting -> Confirming -> Confirmed
//!              |             |-> Failed        (reverted)
//!              |-> Failed                      (rejected / broadcast error)
//!              |             |-> StillPending  (timeout / poll failure)
//! ```
//!
//! `Confirmed` and `Failed` are observable ends of one cycle; the next
//! submit treats them as `Idle`. `StillPending` keeps the single-flight slot
//! occupied because the transaction may still land.

use std::time::Duration;

use alloy_primitives::{B256, U256};

/// Bound on the receipt wait. The source this replaces would block forever;
/// after this window the submission surfaces as "still pending, check
/// explorer" instead.
pub const CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Submitting,
    Confirming { tx: B256 },
    Confirmed { tx: B256 },
    Failed,
    StillPending { tx: B256 },
}

impl SubmissionState {
    /// States that occupy the single-flight slot.
    pub fn in_flight(&self) -> bool {
        matches!(
            self,
            SubmissionState::Submitting
                | SubmissionState::Confirming { .. }
                | SubmissionState::StillPending { .. }
        )
    }
}

/// Successful result of driving a submission to rest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Mined with success status; local counters were reset and the
    /// authoritative record re-fetched.
    Confirmed { tx: B256, total_points: U256 },
    /// Outcome undetermined: not mined within [`CONFIRMATION_TIMEOUT`], or
    /// receipt polling failed. Pending points preserved.
    StillPending { tx: B256 },
}
