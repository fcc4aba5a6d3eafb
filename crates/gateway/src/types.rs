//! Remote records owned by the contract.
//!
//! These mirror the view-function return shapes. All durable state lives
//! on-chain; the client only ever holds snapshots of these.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Per-address record kept by the contract. An empty `username` means the
/// address has never registered.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    pub country: String,
    pub total_points: U256,
    pub pending_points: U256,
    pub last_submit_timestamp: U256,
}

impl UserRecord {
    /// Registration is determined by a non-empty username.
    pub fn is_registered(&self) -> bool {
        !self.username.is_empty()
    }
}

/// One row of `getCountryLeaderboard`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryScore {
    pub name: String,
    pub total_points: U256,
}

/// One row of `getAllCountries` (adds the player count).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryAggregate {
    pub name: String,
    pub total_points: U256,
    pub player_count: U256,
}

/// One row of `getTopPlayersInCountry`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStanding {
    pub address: Address,
    pub username: String,
    pub points: U256,
}

/// Outcome of a mined transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReceiptStatus {
    Success,
    Reverted,
}
