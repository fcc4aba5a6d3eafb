//! The remote seam: everything the client needs from the chain.

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;

use crate::error::GatewayError;
use crate::types::{CountryAggregate, CountryScore, PlayerStanding, ReceiptStatus, UserRecord};

/// The deployed contract plus the two ambient chain reads the client needs.
///
/// Transactions resolve with a hash once the network has accepted the signed
/// broadcast; confirmation is a separate wait via [`await_receipt`].
///
/// [`await_receipt`]: ContractGateway::await_receipt
#[async_trait]
pub trait ContractGateway: Send + Sync {
    /// `register(username, country)` transaction.
    async fn register(&self, username: &str, country: &str) -> Result<B256, GatewayError>;

    /// `submitPoints(points)` transaction carrying `fee` as value.
    async fn submit_points(&self, points: U256, fee: U256) -> Result<B256, GatewayError>;

    /// `getUserInfo(user)` view.
    async fn user_info(&self, user: Address) -> Result<UserRecord, GatewayError>;

    /// `getCountryLeaderboard(limit)` view.
    async fn country_leaderboard(&self, limit: u64) -> Result<Vec<CountryScore>, GatewayError>;

    /// `getTopPlayersInCountry(country, limit)` view.
    async fn top_players_in_country(
        &self,
        country: &str,
        limit: u64,
    ) -> Result<Vec<PlayerStanding>, GatewayError>;

    /// `getAllCountries()` view.
    async fn all_countries(&self) -> Result<Vec<CountryAggregate>, GatewayError>;

    /// Native-token balance of `address`.
    async fn native_balance(&self, address: Address) -> Result<U256, GatewayError>;

    /// Resolves once the transaction is mined. Has no internal timeout;
    /// callers bound the wait themselves.
    async fn await_receipt(&self, tx: B256) -> Result<ReceiptStatus, GatewayError>;
}
