//! Gas simulation for EVM swap transactions

use super::builder::EvmTxRequest;
use crate::error::SwapResult;

use async_trait::async_trait;
use tracing::debug;

/// Estimates gas for an EVM transaction on its chain
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GasSimulator: Send + Sync {
    /// Gas the transaction would use when sent from `from`
    async fn simulate_gas(&self, from: &str, request: &EvmTxRequest) -> SwapResult<u64>;
}

/// Result of simulating an EVM transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasSimulation {
    pub gas_used: u64,
    /// Suggested gas limit including the safety buffer
    pub gas_limit: u64,
}

/// Applies a buffer on top of simulated gas
pub struct GasEstimator {
    /// Buffer percentage for gas limit (e.g., 20 = 20% buffer)
    gas_limit_buffer_percent: u64,
}

impl GasEstimator {
    pub fn new() -> Self {
        Self {
            gas_limit_buffer_percent: 20,
        }
    }

    pub fn with_buffer_percent(gas_limit_buffer_percent: u64) -> Self {
        Self {
            gas_limit_buffer_percent,
        }
    }

    /// Simulate and add the buffer
    pub async fn estimate(
        &self,
        simulator: &dyn GasSimulator,
        from: &str,
        request: &EvmTxRequest,
    ) -> SwapResult<GasSimulation> {
        let gas_used = simulator.simulate_gas(from, request).await?;
        let simulation = GasSimulation {
            gas_used,
            gas_limit: self.buffered_gas_limit(gas_used),
        };

        debug!(
            "Gas for swap on chain {}: {:?}",
            request.chain_id, simulation
        );
        Ok(simulation)
    }

    pub fn buffered_gas_limit(&self, gas_used: u64) -> u64 {
        let buffer = gas_used.saturating_mul(self.gas_limit_buffer_percent) / 100;
        gas_used.saturating_add(buffer)
    }
}

impl Default for GasEstimator {
    fn default() -> Self {
        Self::new()
    }
}
