//! Account access needed to address and build swap transactions

use crate::error::SwapResult;

/// Wallet accounts across chains, provided by the account-management layer
#[cfg_attr(test, mockall::automock)]
pub trait AccountManager: Send + Sync {
    /// Bech32 address of the wallet on a Cosmos chain
    fn bech32_address(&self, chain_id: &str) -> String;

    /// Hex address of the wallet on an EVM chain
    fn ethereum_hex_address(&self, chain_id: &str) -> String;

    /// Initialize the account for `chain_id` if needed; calling it again is a no-op
    fn ensure_account_ready(&self, chain_id: &str) -> SwapResult<()>;
}
