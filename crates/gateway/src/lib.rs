//! Earth Click contract gateway.
//!
//! Binds the deployed Earth Click contract: six entry points, fixed submit
//! fee, Sova Testnet constants. All remote access goes through the
//! [`ContractGateway`] trait; the JSON-RPC implementation lives in [`rpc`].

pub mod abi;
pub mod chain;
pub mod error;
pub mod rpc;
pub mod types;

mod gateway;

pub use error::{AbiError, GatewayError};
pub use gateway::ContractGateway;
pub use rpc::{retry_read, EvmGateway, GatewayConfig};
pub use types::{CountryAggregate, CountryScore, PlayerStanding, ReceiptStatus, UserRecord};
