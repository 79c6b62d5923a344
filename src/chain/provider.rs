//! EVM chain provider with multi-RPC support and automatic failover

use super::{ChainRegistry, EvmInfo};
use crate::error::{SwapError, SwapResult};
use crate::tx::{EvmTxRequest, GasSimulator};

use async_trait::async_trait;
use dashmap::DashMap;
use ethers::prelude::*;
use ethers::providers::{Http, Provider};
use ethers::types::transaction::eip2718::TypedTransaction;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Multi-provider wrapper with automatic failover
pub struct EvmProvider {
    /// EVM chain id
    chain_id: u64,
    /// HTTP providers (multiple for failover)
    http_providers: Vec<Provider<Http>>,
    /// Current active provider index
    current_provider: AtomicUsize,
}

impl EvmProvider {
    /// Create a provider for an EVM chain
    pub fn new(evm: &EvmInfo) -> SwapResult<Self> {
        let mut http_providers = Vec::new();

        for url in &evm.rpc_urls {
            match Provider::<Http>::try_from(url.as_str()) {
                Ok(provider) => {
                    let provider = provider.interval(Duration::from_millis(100));
                    http_providers.push(provider);
                    debug!("Added HTTP provider for chain {}: {}", evm.chain_id, url);
                }
                Err(e) => {
                    warn!("Failed to create provider for {}: {}", url, e);
                }
            }
        }

        if http_providers.is_empty() {
            return Err(SwapError::Config(format!(
                "No valid RPC providers for EVM chain {}",
                evm.chain_id
            )));
        }

        Ok(Self {
            chain_id: evm.chain_id,
            http_providers,
            current_provider: AtomicUsize::new(0),
        })
    }

    /// Get the active HTTP provider
    pub fn http(&self) -> &Provider<Http> {
        let idx = self.current_provider.load(Ordering::Relaxed);
        &self.http_providers[idx % self.http_providers.len()]
    }

    /// Switch to next available provider
    pub fn failover(&self) {
        let current = self.current_provider.load(Ordering::Relaxed);
        let next = (current + 1) % self.http_providers.len();
        self.current_provider.store(next, Ordering::Relaxed);
        warn!("Chain {} failover to provider {}", self.chain_id, next);
    }

    /// Estimate gas for a transaction, trying every provider once
    pub async fn estimate_gas(&self, tx: &TypedTransaction) -> SwapResult<U256> {
        let mut last_error = None;

        for _ in 0..self.http_providers.len() {
            match self.http().estimate_gas(tx, None).await {
                Ok(gas) => return Ok(gas),
                Err(e) => {
                    warn!("Failed to estimate gas on chain {}: {}", self.chain_id, e);
                    last_error = Some(e.to_string());
                    self.failover();
                }
            }
        }

        Err(SwapError::GasEstimation(last_error.unwrap_or_else(|| {
            format!("All providers failed for chain {}", self.chain_id)
        })))
    }

    /// Get chain ID
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }
}

/// Build the typed call a wallet would send for `request`
pub fn typed_transaction(from: &str, request: &EvmTxRequest) -> SwapResult<TypedTransaction> {
    let from = Address::from_str(from)
        .map_err(|e| SwapError::GasEstimation(format!("Invalid sender {}: {}", from, e)))?;
    let to = Address::from_str(&request.to)
        .map_err(|e| SwapError::GasEstimation(format!("Invalid target {}: {}", request.to, e)))?;
    let value = U256::from_str_radix(request.value.trim_start_matches("0x"), 16)
        .map_err(|e| SwapError::GasEstimation(format!("Invalid value {}: {}", request.value, e)))?;
    let data = ::hex::decode(request.data.trim_start_matches("0x"))
        .map_err(|e| SwapError::GasEstimation(format!("Invalid calldata: {}", e)))?;

    let tx = Eip1559TransactionRequest::new()
        .from(from)
        .to(to)
        .value(value)
        .data(Bytes::from(data))
        .chain_id(request.chain_id);

    Ok(TypedTransaction::Eip1559(tx))
}

/// Gas simulation against the configured RPC endpoints of each EVM chain
pub struct EvmGasSimulator {
    providers: DashMap<u64, Arc<EvmProvider>>,
}

impl EvmGasSimulator {
    pub fn new() -> Self {
        Self {
            providers: DashMap::new(),
        }
    }

    /// Create providers for every registered chain with an EVM layer and RPC endpoints
    pub fn from_registry(registry: &ChainRegistry) -> Self {
        let simulator = Self::new();

        for chain_id in registry.chain_ids() {
            let Ok(chain) = registry.get_chain(&chain_id) else {
                continue;
            };
            let Some(evm) = chain.evm.as_ref() else {
                continue;
            };
            if evm.rpc_urls.is_empty() {
                debug!("No RPC endpoints for {}, gas simulation disabled", chain_id);
                continue;
            }

            match EvmProvider::new(evm) {
                Ok(provider) => {
                    simulator.providers.insert(evm.chain_id, Arc::new(provider));
                }
                Err(e) => warn!("Skipping gas simulation for {}: {}", chain_id, e),
            }
        }

        simulator
    }

    pub fn has_provider(&self, evm_chain_id: u64) -> bool {
        self.providers.contains_key(&evm_chain_id)
    }

    /// Number of EVM chains gas can be simulated on
    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }
}

impl Default for EvmGasSimulator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GasSimulator for EvmGasSimulator {
    async fn simulate_gas(&self, from: &str, request: &EvmTxRequest) -> SwapResult<u64> {
        let provider = self
            .providers
            .get(&request.chain_id)
            .map(|p| p.value().clone())
            .ok_or_else(|| SwapError::ChainNotFound {
                chain_id: format!("{}{}", super::EVM_CHAIN_PREFIX, request.chain_id),
            })?;

        let tx = typed_transaction(from, request)?;
        let gas = provider.estimate_gas(&tx).await?;

        if gas > U256::from(u64::MAX) {
            return Err(SwapError::GasEstimation(format!(
                "Gas estimate {} out of range",
                gas
            )));
        }
        Ok(gas.as_u64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainInfo;

    fn request() -> EvmTxRequest {
        EvmTxRequest {
            chain_id: 1,
            to: "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48".to_string(),
            value: "0xff".to_string(),
            data: "0xa9059cbb".to_string(),
        }
    }

    #[test]
    fn test_typed_transaction_fields() {
        let tx = typed_transaction("0x0000000000000000000000000000000000000001", &request())
            .unwrap();

        assert_eq!(tx.value(), Some(&U256::from(255u64)));
        assert_eq!(tx.data().map(|d| d.to_vec()), Some(vec![0xa9, 0x05, 0x9c, 0xbb]));
        assert_eq!(tx.chain_id(), Some(U64::from(1u64)));
    }

    #[test]
    fn test_typed_transaction_rejects_bad_sender() {
        assert!(matches!(
            typed_transaction("osmo1sender", &request()),
            Err(SwapError::GasEstimation(_))
        ));
    }

    #[test]
    fn test_provider_requires_rpc_url() {
        let evm = EvmInfo {
            chain_id: 1,
            rpc_urls: vec![],
        };
        assert!(EvmProvider::new(&evm).is_err());

        let evm = EvmInfo {
            chain_id: 1,
            rpc_urls: vec!["http://localhost:8545".to_string()],
        };
        let provider = EvmProvider::new(&evm).unwrap();
        assert_eq!(provider.chain_id(), 1);
    }

    #[test]
    fn test_simulator_skips_chains_without_rpc() {
        let registry = ChainRegistry::new(vec![
            ChainInfo {
                evm: Some(EvmInfo {
                    chain_id: 1,
                    rpc_urls: vec![],
                }),
                ..ChainInfo::cosmos("eip155:1", "", vec![])
            },
            ChainInfo {
                evm: Some(EvmInfo {
                    chain_id: 10,
                    rpc_urls: vec!["http://localhost:8545".to_string()],
                }),
                ..ChainInfo::cosmos("eip155:10", "", vec![])
            },
        ]);

        let simulator = EvmGasSimulator::from_registry(&registry);
        assert!(!simulator.has_provider(1));
        assert!(simulator.has_provider(10));
        assert_eq!(simulator.provider_count(), 1);
    }

    #[tokio::test]
    async fn test_simulate_unknown_chain() {
        let simulator = EvmGasSimulator::new();
        let result = simulator
            .simulate_gas("0x0000000000000000000000000000000000000001", &request())
            .await;
        assert!(matches!(result, Err(SwapError::ChainNotFound { .. })));
    }
}
