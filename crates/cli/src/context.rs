//! App context: one explicitly constructed bundle of gateway + session.
//!
//! Built at startup, torn down on exit. Nothing in the client lives in
//! process-wide globals.

use alloy_primitives::Address;
use click_gateway::{EvmGateway, GatewayConfig};
use click_session::Session;

#[derive(Debug)]
pub struct AppContext {
    pub gateway: EvmGateway,
    pub session: Session,
}

impl AppContext {
    pub fn connect(rpc_url: String, contract: Option<Address>, from: Address) -> anyhow::Result<Self> {
        let config = GatewayConfig {
            rpc_url,
            contract: contract.unwrap_or(click_gateway::chain::CONTRACT_ADDRESS),
            from,
            ..GatewayConfig::default()
        };
        let gateway = EvmGateway::connect(&config)?;
        let session = Session::connect(from);
        Ok(Self { gateway, session })
    }

    pub fn disconnect(self) {
        tracing::debug!("session closed for {}", self.session.address());
    }
}
