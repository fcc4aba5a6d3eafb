//! Earth Click local session state.
//!
//! Everything here is ephemeral: one [`Session`] per connected wallet
//! address, created on connect, gone on drop. The contract is the system of
//! record; the session holds the optimistic local delta (pending clicks) and
//! the submission state machine that reconciles it on-chain.

pub mod accumulator;
pub mod countries;
pub mod error;
pub mod registration;
pub mod session;
pub mod submission;

pub use accumulator::{ClickAccumulator, CLICK_PULSE};
pub use countries::{is_supported_country, COUNTRIES};
pub use error::SessionError;
pub use registration::{RegistrationState, MAX_USERNAME_LEN, REGISTRATION_REFETCH_DELAY};
pub use session::Session;
pub use submission::{SubmissionState, SubmitOutcome, CONFIRMATION_TIMEOUT};
