//! Sova Testnet constants
//!
//! These must match the deployed contract and chain exactly. The submit fee
//! in particular is enforced as `msg.value` by the contract; a mismatch makes
//! every submission revert.

use alloy_primitives::{address, Address, U256};

/// Chain id of Sova Testnet.
pub const CHAIN_ID: u64 = 120_893;

/// Human-readable chain name.
pub const CHAIN_NAME: &str = "Sova Testnet";

/// Native currency symbol.
pub const NATIVE_SYMBOL: &str = "SOVA";

/// Native currency decimals.
pub const NATIVE_DECIMALS: u32 = 18;

/// Public JSON-RPC endpoint. Browser clients reach it through the `/api/rpc`
/// proxy path instead of calling this host directly.
pub const DEFAULT_RPC_URL: &str = "https://rpc.testnet.sova.io";

/// Block explorer base URL.
pub const EXPLORER_URL: &str = "https://explorer.testnet.sova.io";

/// Deployed Earth Click contract.
pub const CONTRACT_ADDRESS: Address = address!("D749D9Aff970082dd0910dF5af09b588a07F7ddd");

/// Fee required as `msg.value` on `submitPoints`: 0.0666 SOVA in wei.
pub const SUBMIT_FEE: U256 = U256::from_limbs([66_600_000_000_000_000, 0, 0, 0]);

/// Format a wei amount as a decimal native-token string ("0.0666").
pub fn format_native(amount: U256) -> String {
    let scale = U256::from(10u64).pow(U256::from(NATIVE_DECIMALS));
    let whole = amount / scale;
    let frac = amount % scale;
    if frac.is_zero() {
        return whole.to_string();
    }
    let frac = format!("{:0>width$}", frac.to_string(), width = NATIVE_DECIMALS as usize);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

/// Explorer link for a transaction hash string.
pub fn explorer_tx_url(tx: &str) -> String {
    format!("{}/tx/{}", EXPLORER_URL, tx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_fee_formats_as_decimal() {
        assert_eq!(format_native(SUBMIT_FEE), "0.0666");
    }

    #[test]
    fn whole_amounts_have_no_fraction() {
        let one = U256::from(10u64).pow(U256::from(NATIVE_DECIMALS));
        assert_eq!(format_native(one), "1");
        assert_eq!(format_native(U256::ZERO), "0");
    }

    #[test]
    fn mixed_amount_keeps_significant_digits() {
        // 1.5 SOVA
        let amount = U256::from(1_500_000_000_000_000_000u64);
        assert_eq!(format_native(amount), "1.5");
    }
}
