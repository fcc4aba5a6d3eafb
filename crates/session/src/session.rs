//! One session per connected wallet address.
//!
//! Holds the optimistic local counters and the cached remote snapshot as
//! separate values; they meet only at the defined reconciliation points
//! (confirmed submission, explicit refresh). No locks: the state machine's
//! single-flight rule is the only concurrency discipline needed.

use alloy_primitives::{Address, B256, U256};
use click_gateway::chain::SUBMIT_FEE;
use click_gateway::{ContractGateway, GatewayError, ReceiptStatus, UserRecord};

use crate::accumulator::ClickAccumulator;
use crate::error::SessionError;
use crate::registration::{self, RegistrationState, REGISTRATION_REFETCH_DELAY};
use crate::submission::{SubmissionState, SubmitOutcome, CONFIRMATION_TIMEOUT};

#[derive(Debug)]
pub struct Session {
    address: Address,
    clicks: ClickAccumulator,
    submission: SubmissionState,
    /// Last authoritative record seen; stale until the next refresh.
    record: Option<UserRecord>,
    /// Last native balance seen; submission preconditions check against this.
    balance: Option<U256>,
}

impl Session {
    /// Created on wallet connection; dropped on disconnect. Never persisted.
    pub fn connect(address: Address) -> Self {
        tracing::debug!("session created for {}", address);
        Self {
            address,
            clicks: ClickAccumulator::new(),
            submission: SubmissionState::Idle,
            record: None,
            balance: None,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn register_click(&mut self) {
        self.clicks.register_click();
    }

    pub fn click_count(&self) -> u64 {
        self.clicks.click_count()
    }

    pub fn pending_points(&self) -> u64 {
        self.clicks.pending_points()
    }

    pub fn is_clicking(&self) -> bool {
        self.clicks.is_clicking()
    }

    pub fn submission(&self) -> SubmissionState {
        self.submission
    }

    pub fn record(&self) -> Option<&UserRecord> {
        self.record.as_ref()
    }

    pub fn balance(&self) -> Option<U256> {
        self.balance
    }

    pub fn registration(&self) -> RegistrationState {
        match &self.record {
            Some(record) if record.is_registered() => RegistrationState::Registered,
            _ => RegistrationState::Unregistered,
        }
    }

    /// Re-fetches the authoritative record and balance.
    pub async fn refresh<G>(&mut self, gateway: &G) -> Result<(), SessionError>
    where
        G: ContractGateway + ?Sized,
    {
        self.record = Some(gateway.user_info(self.address).await?);
        self.balance = Some(gateway.native_balance(self.address).await?);
        Ok(())
    }

    /// Registers the address. Preconditions are checked locally; afterwards
    /// one delayed re-fetch decides whether the gateway saw it.
    pub async fn register<G>(
        &mut self,
        gateway: &G,
        username: &str,
        country: &str,
    ) -> Result<RegistrationState, SessionError>
    where
        G: ContractGateway + ?Sized,
    {
        let username = registration::validate(username, country)?;
        gateway.register(username, country).await?;
        tracing::info!("registration submitted: {} ({})", username, country);

        tokio::time::sleep(REGISTRATION_REFETCH_DELAY).await;
        let record = gateway.user_info(self.address).await?;
        let state = if record.is_registered() {
            RegistrationState::Registered
        } else {
            // The transaction may simply not be mined yet; the caller polls.
            RegistrationState::Submitting
        };
        self.record = Some(record);
        Ok(state)
    }

    /// Turns pending points into a `submitPoints` transaction and drives it
    /// to rest. Pending points survive every failure path; only a confirmed
    /// receipt resets them.
    pub async fn submit_pending<G>(&mut self, gateway: &G) -> Result<SubmitOutcome, SessionError>
    where
        G: ContractGateway + ?Sized,
    {
        if self.submission.in_flight() {
            return Err(SessionError::SubmissionInFlight);
        }
        let points = self.clicks.pending_points();
        if points == 0 {
            return Err(SessionError::NothingToSubmit);
        }
        let available = self.balance.unwrap_or(U256::ZERO);
        if available < SUBMIT_FEE {
            return Err(SessionError::InsufficientBalance {
                required: SUBMIT_FEE,
                available,
            });
        }

        self.submission = SubmissionState::Submitting;
        tracing::info!("submitting {} points", points);
        let tx = match gateway.submit_points(U256::from(points), SUBMIT_FEE).await {
            Ok(tx) => tx,
            Err(e) => {
                self.submission = SubmissionState::Failed;
                tracing::warn!("broadcast failed: {}", e);
                return Err(e.into());
            }
        };

        self.submission = SubmissionState::Confirming { tx };
        self.confirm(gateway, tx).await
    }

    /// Re-polls a submission parked in `StillPending` for another bounded
    /// window.
    pub async fn resume_pending<G>(&mut self, gateway: &G) -> Result<SubmitOutcome, SessionError>
    where
        G: ContractGateway + ?Sized,
    {
        let SubmissionState::StillPending { tx } = self.submission else {
            return Err(SessionError::NothingPending);
        };
        self.submission = SubmissionState::Confirming { tx };
        self.confirm(gateway, tx).await
    }

    async fn confirm<G>(&mut self, gateway: &G, tx: B256) -> Result<SubmitOutcome, SessionError>
    where
        G: ContractGateway + ?Sized,
    {
        match tokio::time::timeout(CONFIRMATION_TIMEOUT, gateway.await_receipt(tx)).await {
            Err(_) => {
                // The transaction cannot be cancelled once broadcast; keep
                // the slot occupied and tell the user where to look.
                self.submission = SubmissionState::StillPending { tx };
                tracing::warn!("no receipt for {} within {:?}", tx, CONFIRMATION_TIMEOUT);
                Ok(SubmitOutcome::StillPending { tx })
            }
            Ok(Err(e)) => {
                // Polling failed, not the transaction: the outcome is
                // unknown and the tx may still mine. Freeing the slot here
                // would let a second submit double-spend the same clicks.
                self.submission = SubmissionState::StillPending { tx };
                tracing::warn!("receipt polling failed for {}: {}", tx, e);
                Ok(SubmitOutcome::StillPending { tx })
            }
            Ok(Ok(ReceiptStatus::Reverted)) => {
                self.submission = SubmissionState::Failed;
                Err(GatewayError::Reverted.into())
            }
            Ok(Ok(ReceiptStatus::Success)) => {
                self.clicks.reset();
                // Refresh is best effort; a failed read leaves the snapshot
                // stale, not the submission unconfirmed.
                match gateway.user_info(self.address).await {
                    Ok(record) => self.record = Some(record),
                    Err(e) => tracing::warn!("post-confirmation refresh failed: {}", e),
                }
                let total_points = self
                    .record
                    .as_ref()
                    .map(|r| r.total_points)
                    .unwrap_or_default();
                self.submission = SubmissionState::Confirmed { tx };
                tracing::info!("submission confirmed: {}", tx);
                Ok(SubmitOutcome::Confirmed { tx, total_points })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use click_gateway::{CountryAggregate, CountryScore, PlayerStanding};
    use parking_lot::Mutex;

    /// What the mock does with a broadcast transaction.
    #[derive(Clone, Copy)]
    enum TxBehavior {
        Confirm(ReceiptStatus),
        RejectBroadcast,
        NeverMine,
        /// Broadcast succeeds but every receipt poll errors.
        PollError,
    }

    struct MockGateway {
        user: Mutex<UserRecord>,
        balance: Mutex<U256>,
        behavior: Mutex<TxBehavior>,
        submit_calls: Mutex<u32>,
        register_calls: Mutex<u32>,
    }

    impl MockGateway {
        fn new() -> Self {
            Self {
                user: Mutex::new(UserRecord::default()),
                balance: Mutex::new(SUBMIT_FEE),
                behavior: Mutex::new(TxBehavior::Confirm(ReceiptStatus::Success)),
                submit_calls: Mutex::new(0),
                register_calls: Mutex::new(0),
            }
        }

        fn set_balance(&self, balance: U256) {
            *self.balance.lock() = balance;
        }

        fn set_behavior(&self, behavior: TxBehavior) {
            *self.behavior.lock() = behavior;
        }

        fn submit_calls(&self) -> u32 {
            *self.submit_calls.lock()
        }
    }

    #[async_trait]
    impl ContractGateway for MockGateway {
        async fn register(&self, username: &str, country: &str) -> Result<B256, GatewayError> {
            *self.register_calls.lock() += 1;
            let mut user = self.user.lock();
            user.username = username.to_string();
            user.country = country.to_string();
            Ok(B256::repeat_byte(0x11))
        }

        async fn submit_points(&self, points: U256, fee: U256) -> Result<B256, GatewayError> {
            *self.submit_calls.lock() += 1;
            assert_eq!(fee, SUBMIT_FEE);
            match *self.behavior.lock() {
                TxBehavior::RejectBroadcast => {
                    Err(GatewayError::Rejected("user denied signature".to_string()))
                }
                TxBehavior::Confirm(ReceiptStatus::Success) => {
                    let mut user = self.user.lock();
                    user.total_points += points;
                    Ok(B256::repeat_byte(0x22))
                }
                _ => Ok(B256::repeat_byte(0x22)),
            }
        }

        async fn user_info(&self, _user: Address) -> Result<UserRecord, GatewayError> {
            Ok(self.user.lock().clone())
        }

        async fn country_leaderboard(&self, _limit: u64) -> Result<Vec<CountryScore>, GatewayError> {
            Ok(Vec::new())
        }

        async fn top_players_in_country(
            &self,
            _country: &str,
            _limit: u64,
        ) -> Result<Vec<PlayerStanding>, GatewayError> {
            Ok(Vec::new())
        }

        async fn all_countries(&self) -> Result<Vec<CountryAggregate>, GatewayError> {
            Ok(Vec::new())
        }

        async fn native_balance(&self, _address: Address) -> Result<U256, GatewayError> {
            Ok(*self.balance.lock())
        }

        async fn await_receipt(&self, _tx: B256) -> Result<ReceiptStatus, GatewayError> {
            // Copy out before awaiting; the guard must not cross a suspend.
            let behavior = *self.behavior.lock();
            match behavior {
                TxBehavior::Confirm(status) => Ok(status),
                TxBehavior::NeverMine => std::future::pending().await,
                TxBehavior::PollError => Err(GatewayError::Call("header not found".to_string())),
                TxBehavior::RejectBroadcast => unreachable!("broadcast was rejected"),
            }
        }
    }

    fn funded_session(gateway: &MockGateway) -> Session {
        let mut session = Session::connect(Address::repeat_byte(0xaa));
        session.balance = Some(*gateway.balance.lock());
        session
    }

    #[tokio::test(start_paused = true)]
    async fn submit_with_zero_pending_is_rejected_locally() {
        let gateway = MockGateway::new();
        let mut session = funded_session(&gateway);

        let err = session.submit_pending(&gateway).await.unwrap_err();
        assert!(matches!(err, SessionError::NothingToSubmit));
        assert!(err.is_precondition());
        assert_eq!(gateway.submit_calls(), 0);
        assert_eq!(session.submission(), SubmissionState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn submit_below_fee_names_the_required_amount() {
        let gateway = MockGateway::new();
        gateway.set_balance(SUBMIT_FEE - U256::from(1u64));
        let mut session = Session::connect(Address::repeat_byte(0xaa));
        session.refresh(&gateway).await.unwrap();
        session.register_click();

        let err = session.submit_pending(&gateway).await.unwrap_err();
        assert!(matches!(err, SessionError::InsufficientBalance { .. }));
        assert!(err.to_string().contains("0.0666"));
        assert_eq!(gateway.submit_calls(), 0);
        assert_eq!(session.pending_points(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn confirmed_submission_resets_counters_and_refetches() {
        let gateway = MockGateway::new();
        let mut session = funded_session(&gateway);
        for _ in 0..7 {
            session.register_click();
        }

        let outcome = session.submit_pending(&gateway).await.unwrap();
        match outcome {
            SubmitOutcome::Confirmed { total_points, .. } => {
                assert_eq!(total_points, U256::from(7u64));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(session.pending_points(), 0);
        assert_eq!(session.click_count(), 0);
        assert_eq!(session.record().unwrap().total_points, U256::from(7u64));
        assert!(matches!(session.submission(), SubmissionState::Confirmed { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_broadcast_preserves_pending_points() {
        let gateway = MockGateway::new();
        gateway.set_behavior(TxBehavior::RejectBroadcast);
        let mut session = funded_session(&gateway);
        for _ in 0..5 {
            session.register_click();
        }

        let err = session.submit_pending(&gateway).await.unwrap_err();
        assert!(matches!(err, SessionError::Gateway(GatewayError::Rejected(_))));
        assert_eq!(session.pending_points(), 5);
        assert_eq!(session.click_count(), 5);
        assert_eq!(session.submission(), SubmissionState::Failed);

        // Failed does not hold the slot; the retry goes through.
        gateway.set_behavior(TxBehavior::Confirm(ReceiptStatus::Success));
        let outcome = session.submit_pending(&gateway).await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Confirmed { .. }));
        assert_eq!(session.pending_points(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn reverted_receipt_preserves_pending_points() {
        let gateway = MockGateway::new();
        gateway.set_behavior(TxBehavior::Confirm(ReceiptStatus::Reverted));
        let mut session = funded_session(&gateway);
        session.register_click();

        let err = session.submit_pending(&gateway).await.unwrap_err();
        assert!(matches!(err, SessionError::Gateway(GatewayError::Reverted)));
        assert_eq!(session.pending_points(), 1);
        assert_eq!(session.submission(), SubmissionState::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn confirmation_timeout_parks_as_still_pending() {
        let gateway = MockGateway::new();
        gateway.set_behavior(TxBehavior::NeverMine);
        let mut session = funded_session(&gateway);
        for _ in 0..3 {
            session.register_click();
        }

        let outcome = session.submit_pending(&gateway).await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::StillPending { .. }));
        assert_eq!(session.pending_points(), 3);
        assert!(session.submission().in_flight());
        assert_eq!(gateway.submit_calls(), 1);

        // The slot stays occupied: a second submit must never produce a
        // second transaction.
        let err = session.submit_pending(&gateway).await.unwrap_err();
        assert!(matches!(err, SessionError::SubmissionInFlight));
        assert_eq!(gateway.submit_calls(), 1);

        // Once the transaction mines, resume resolves it.
        gateway.set_behavior(TxBehavior::Confirm(ReceiptStatus::Success));
        let outcome = session.resume_pending(&gateway).await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Confirmed { .. }));
        assert_eq!(session.pending_points(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn poll_error_never_frees_the_submission_slot() {
        let gateway = MockGateway::new();
        gateway.set_behavior(TxBehavior::PollError);
        let mut session = funded_session(&gateway);
        for _ in 0..5 {
            session.register_click();
        }

        // Polling failed, not the transaction: outcome undetermined.
        let outcome = session.submit_pending(&gateway).await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::StillPending { .. }));
        assert_eq!(session.pending_points(), 5);
        assert!(session.submission().in_flight());

        // The same clicks must never produce a second transaction.
        let err = session.submit_pending(&gateway).await.unwrap_err();
        assert!(matches!(err, SessionError::SubmissionInFlight));
        assert_eq!(gateway.submit_calls(), 1);

        gateway.set_behavior(TxBehavior::Confirm(ReceiptStatus::Success));
        let outcome = session.resume_pending(&gateway).await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Confirmed { .. }));
        assert_eq!(session.pending_points(), 0);
        assert_eq!(gateway.submit_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn resume_without_pending_submission_is_an_error() {
        let gateway = MockGateway::new();
        let mut session = funded_session(&gateway);
        let err = session.resume_pending(&gateway).await.unwrap_err();
        assert!(matches!(err, SessionError::NothingPending));
    }

    #[tokio::test(start_paused = true)]
    async fn registration_rejects_bad_input_locally() {
        let gateway = MockGateway::new();
        let mut session = funded_session(&gateway);

        let err = session.register(&gateway, "  ", "France").await.unwrap_err();
        assert!(matches!(err, SessionError::EmptyUsername));
        let err = session.register(&gateway, "alice", "Atlantis").await.unwrap_err();
        assert!(matches!(err, SessionError::UnknownCountry(_)));
        assert_eq!(*gateway.register_calls.lock(), 0);
        assert_eq!(session.registration(), RegistrationState::Unregistered);
    }

    #[tokio::test(start_paused = true)]
    async fn registration_flips_once_gateway_reports_username() {
        let gateway = MockGateway::new();
        let mut session = funded_session(&gateway);

        let state = session.register(&gateway, " alice ", "France").await.unwrap();
        assert_eq!(state, RegistrationState::Registered);
        assert_eq!(session.registration(), RegistrationState::Registered);
        assert_eq!(session.record().unwrap().username, "alice");
        assert_eq!(session.record().unwrap().country, "France");
    }

    #[tokio::test(start_paused = true)]
    async fn local_counters_stay_separate_from_remote_total() {
        let gateway = MockGateway::new();
        {
            let mut user = gateway.user.lock();
            user.username = "alice".to_string();
            user.total_points = U256::from(100u64);
        }
        let mut session = funded_session(&gateway);
        session.refresh(&gateway).await.unwrap();
        for _ in 0..4 {
            session.register_click();
        }

        // Optimistic delta and confirmed total never merge outside a
        // confirmed submission.
        assert_eq!(session.pending_points(), 4);
        assert_eq!(session.record().unwrap().total_points, U256::from(100u64));

        let outcome = session.submit_pending(&gateway).await.unwrap();
        match outcome {
            SubmitOutcome::Confirmed { total_points, .. } => {
                assert_eq!(total_points, U256::from(104u64));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(session.pending_points(), 0);
    }
}
