//! JSON-RPC implementation of [`ContractGateway`].
//!
//! Views go through `eth_call`, writes through `eth_sendTransaction` (the
//! node or wallet behind the endpoint owns the key; signing is not this
//! client's concern), receipts are polled on a fixed interval.

use std::future::Future;
use std::time::Duration;

use alloy_primitives::{hex, Address, B256, U256};
use async_trait::async_trait;
use jsonrpsee::core::client::ClientT;
use jsonrpsee::core::ClientError;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;
use serde::{Deserialize, Serialize};

use crate::abi;
use crate::chain;
use crate::error::GatewayError;
use crate::gateway::ContractGateway;
use crate::types::{CountryAggregate, CountryScore, PlayerStanding, ReceiptStatus, UserRecord};

/// How the gateway reaches the chain.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    /// JSON-RPC endpoint (direct, or the `/api/rpc` proxy path).
    pub rpc_url: String,
    /// Deployed contract address.
    pub contract: Address,
    /// Sender for transactions; the account must be managed by the node.
    pub from: Address,
    /// Receipt polling interval.
    pub receipt_poll_interval: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            rpc_url: chain::DEFAULT_RPC_URL.to_string(),
            contract: chain::CONTRACT_ADDRESS,
            from: Address::ZERO,
            receipt_poll_interval: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Serialize)]
struct CallObject {
    to: Address,
    data: String,
}

#[derive(Debug, Serialize)]
struct TransactionObject {
    from: Address,
    to: Address,
    data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<U256>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    status: Option<String>,
    #[allow(dead_code)]
    block_number: Option<String>,
}

/// [`ContractGateway`] over a JSON-RPC HTTP endpoint.
#[derive(Debug)]
pub struct EvmGateway {
    client: HttpClient,
    contract: Address,
    from: Address,
    receipt_poll_interval: Duration,
}

impl EvmGateway {
    pub fn connect(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let client = HttpClientBuilder::default()
            .build(&config.rpc_url)
            .map_err(|e| GatewayError::Unreachable(e.to_string()))?;
        tracing::info!("gateway connected: {} -> {}", config.rpc_url, config.contract);
        Ok(Self {
            client,
            contract: config.contract,
            from: config.from,
            receipt_poll_interval: config.receipt_poll_interval,
        })
    }

    async fn call(&self, data: Vec<u8>) -> Result<Vec<u8>, GatewayError> {
        let object = CallObject {
            to: self.contract,
            data: hex::encode_prefixed(&data),
        };
        let result: String = self
            .client
            .request("eth_call", rpc_params![object, "latest"])
            .await
            .map_err(map_read_err)?;
        hex::decode(&result).map_err(|e| GatewayError::Response(e.to_string()))
    }

    async fn send(&self, data: Vec<u8>, value: Option<U256>) -> Result<B256, GatewayError> {
        let object = TransactionObject {
            from: self.from,
            to: self.contract,
            data: hex::encode_prefixed(&data),
            value,
        };
        let hash: String = self
            .client
            .request("eth_sendTransaction", rpc_params![object])
            .await
            .map_err(map_send_err)?;
        let tx = hash
            .parse::<B256>()
            .map_err(|e| GatewayError::Response(e.to_string()))?;
        tracing::debug!("transaction broadcast: {}", tx);
        Ok(tx)
    }
}

#[async_trait]
impl ContractGateway for EvmGateway {
    async fn register(&self, username: &str, country: &str) -> Result<B256, GatewayError> {
        self.send(abi::encode_register(username, country), None).await
    }

    async fn submit_points(&self, points: U256, fee: U256) -> Result<B256, GatewayError> {
        self.send(abi::encode_submit_points(points), Some(fee)).await
    }

    async fn user_info(&self, user: Address) -> Result<UserRecord, GatewayError> {
        let data = self.call(abi::encode_get_user_info(user)).await?;
        Ok(abi::decode_user_info(&data)?)
    }

    async fn country_leaderboard(&self, limit: u64) -> Result<Vec<CountryScore>, GatewayError> {
        let data = self
            .call(abi::encode_get_country_leaderboard(U256::from(limit)))
            .await?;
        Ok(abi::decode_country_leaderboard(&data)?)
    }

    async fn top_players_in_country(
        &self,
        country: &str,
        limit: u64,
    ) -> Result<Vec<PlayerStanding>, GatewayError> {
        let data = self
            .call(abi::encode_get_top_players(country, U256::from(limit)))
            .await?;
        Ok(abi::decode_top_players(&data)?)
    }

    async fn all_countries(&self) -> Result<Vec<CountryAggregate>, GatewayError> {
        let data = self.call(abi::encode_get_all_countries()).await?;
        Ok(abi::decode_all_countries(&data)?)
    }

    async fn native_balance(&self, address: Address) -> Result<U256, GatewayError> {
        let balance: String = self
            .client
            .request("eth_getBalance", rpc_params![address, "latest"])
            .await
            .map_err(map_read_err)?;
        parse_quantity(&balance)
    }

    async fn await_receipt(&self, tx: B256) -> Result<ReceiptStatus, GatewayError> {
        loop {
            let polled: Result<Option<RawReceipt>, ClientError> = self
                .client
                .request("eth_getTransactionReceipt", rpc_params![tx])
                .await;
            let receipt = match polled {
                Ok(receipt) => receipt,
                Err(e) => {
                    let e = map_read_err(e);
                    if !e.is_retryable() {
                        return Err(e);
                    }
                    // A flaky poll says nothing about the transaction; keep
                    // polling and let the caller's timeout bound the wait.
                    tracing::debug!("receipt poll failed for {}: {}", tx, e);
                    None
                }
            };
            if let Some(receipt) = receipt {
                let status = match receipt.status.as_deref() {
                    Some("0x0") => ReceiptStatus::Reverted,
                    _ => ReceiptStatus::Success,
                };
                tracing::debug!("receipt observed for {}: {:?}", tx, status);
                return Ok(status);
            }
            tokio::time::sleep(self.receipt_poll_interval).await;
        }
    }
}

fn parse_quantity(quantity: &str) -> Result<U256, GatewayError> {
    let digits = quantity.strip_prefix("0x").unwrap_or(quantity);
    U256::from_str_radix(digits, 16).map_err(|e| GatewayError::Response(e.to_string()))
}

fn map_read_err(err: ClientError) -> GatewayError {
    match err {
        ClientError::Call(e) => GatewayError::Call(e.message().to_string()),
        ClientError::Transport(e) => GatewayError::Unreachable(e.to_string()),
        ClientError::RequestTimeout => GatewayError::Unreachable("request timed out".to_string()),
        ClientError::ParseError(e) => GatewayError::Response(e.to_string()),
        other => GatewayError::Response(other.to_string()),
    }
}

fn map_send_err(err: ClientError) -> GatewayError {
    match err {
        // The node refused the transaction (bad fee, user rejection, revert
        // during estimation). The submission layer treats this as Failed.
        ClientError::Call(e) => GatewayError::Rejected(e.message().to_string()),
        other => map_read_err(other),
    }
}

/// Retries a polling read on a fixed interval. The unreachable class is
/// never retried; the caller keeps its last known snapshot.
pub async fn retry_read<T, F, Fut>(
    attempts: u32,
    interval: Duration,
    mut op: F,
) -> Result<T, GatewayError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GatewayError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < attempts => {
                tracing::debug!("read failed (attempt {}/{}): {}", attempt, attempts, e);
                tokio::time::sleep(interval).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_quantities() {
        assert_eq!(parse_quantity("0x0").unwrap(), U256::ZERO);
        assert_eq!(parse_quantity("0xde0b6b3a7640000").unwrap(), U256::from(10u64).pow(U256::from(18u64)));
        assert!(parse_quantity("not hex").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn retry_read_gives_up_on_unreachable() {
        let mut calls = 0u32;
        let result: Result<(), _> = retry_read(5, Duration::from_millis(10), || {
            calls += 1;
            async { Err(GatewayError::Unreachable("down".to_string())) }
        })
        .await;
        assert!(matches!(result, Err(GatewayError::Unreachable(_))));
        assert_eq!(calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_read_retries_call_errors() {
        let mut calls = 0u32;
        let result = retry_read(3, Duration::from_millis(10), || {
            calls += 1;
            let ok = calls >= 3;
            async move {
                if ok {
                    Ok(7u32)
                } else {
                    Err(GatewayError::Call("flaky".to_string()))
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls, 3);
    }
}
