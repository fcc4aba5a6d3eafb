//! Local click accumulator.
//!
//! Purely local and synchronous: no network call, no failure mode. The
//! pending counter is the optimistic delta that the submission reconciler
//! later turns into an on-chain transaction.

use std::time::Duration;

use tokio::time::Instant;

/// How long the "clicking" pulse stays set after a click.
pub const CLICK_PULSE: Duration = Duration::from_millis(150);

#[derive(Debug, Default)]
pub struct ClickAccumulator {
    click_count: u64,
    pending_points: u64,
    pulse_deadline: Option<Instant>,
}

impl ClickAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// One click: both counters advance by exactly 1 and the pulse deadline
    /// is replaced, not stacked.
    pub fn register_click(&mut self) {
        self.click_count += 1;
        self.pending_points += 1;
        self.pulse_deadline = Some(Instant::now() + CLICK_PULSE);
    }

    /// Transient visual flag; self-clears once the deadline passes.
    pub fn is_clicking(&self) -> bool {
        self.pulse_deadline.is_some_and(|deadline| Instant::now() < deadline)
    }

    pub fn click_count(&self) -> u64 {
        self.click_count
    }

    pub fn pending_points(&self) -> u64 {
        self.pending_points
    }

    /// Only called on a confirmed submission.
    pub(crate) fn reset(&mut self) {
        self.click_count = 0;
        self.pending_points = 0;
    }
}
