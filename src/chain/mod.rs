//! Chain module - local chain registry, chain id normalization and EVM access
//!
//! This module provides:
//! - The registry of chains and currencies known locally
//! - Chain id normalization across the route service boundary
//! - Currency and coin amount types
//! - EVM RPC providers used for gas simulation

pub mod currency;
pub mod id;
pub mod provider;

pub use currency::{Coin, CoinPretty, Currency, DenomHelper, DenomType};
pub use id::{chain_identifier, ChainIdNormalizer, EVM_CHAIN_PREFIX};
pub use provider::{EvmGasSimulator, EvmProvider};

use crate::config::{ChainConfig, Settings};
use crate::error::{SwapError, SwapResult};

use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// EVM execution layer of a chain
#[derive(Debug, Clone, PartialEq)]
pub struct EvmInfo {
    pub chain_id: u64,
    pub rpc_urls: Vec<String>,
}

/// Locally known chain metadata
#[derive(Debug, Clone, PartialEq)]
pub struct ChainInfo {
    pub chain_id: String,
    pub chain_name: String,
    pub bech32_prefix: Option<String>,
    pub evm: Option<EvmInfo>,
    pub currencies: Vec<Currency>,
    pub show_in_list: bool,
}

impl ChainInfo {
    /// A listed Cosmos chain
    pub fn cosmos(chain_id: &str, bech32_prefix: &str, currencies: Vec<Currency>) -> Self {
        Self {
            chain_id: chain_id.to_string(),
            chain_name: chain_id.to_string(),
            bech32_prefix: Some(bech32_prefix.to_string()),
            evm: None,
            currencies,
            show_in_list: true,
        }
    }

    pub fn chain_identifier(&self) -> String {
        chain_identifier(&self.chain_id)
    }

    pub fn find_currency(&self, denom: &str) -> Option<&Currency> {
        self.currencies
            .iter()
            .find(|c| c.coin_minimal_denom == denom)
    }

    /// Known currency for `denom`, or a raw placeholder
    pub fn force_find_currency(&self, denom: &str) -> Currency {
        self.find_currency(denom)
            .cloned()
            .unwrap_or_else(|| Currency::raw(denom))
    }

    pub fn is_evm_only(&self) -> bool {
        self.chain_id.starts_with(EVM_CHAIN_PREFIX) && self.evm.is_some()
    }
}

impl From<&ChainConfig> for ChainInfo {
    fn from(config: &ChainConfig) -> Self {
        Self {
            chain_id: config.chain_id.clone(),
            chain_name: config.name.clone(),
            bech32_prefix: config.bech32_prefix.clone(),
            evm: config.evm.as_ref().map(|evm| EvmInfo {
                chain_id: evm.chain_id,
                rpc_urls: evm.rpc_urls.clone(),
            }),
            currencies: config.currencies.iter().map(Currency::from).collect(),
            show_in_list: config.show_in_list,
        }
    }
}

/// Registry of locally known chains, indexed by chain identifier
pub struct ChainRegistry {
    chains: DashMap<String, Arc<ChainInfo>>,
}

impl ChainRegistry {
    pub fn new(chains: Vec<ChainInfo>) -> Self {
        let registry = Self {
            chains: DashMap::new(),
        };
        for chain in chains {
            registry.add_chain(chain);
        }
        registry
    }

    /// Build the registry from configured chains
    pub fn from_settings(settings: &Settings) -> Self {
        let registry = Self::new(settings.chains.values().map(ChainInfo::from).collect());
        info!("Chain registry loaded with {} chains", registry.len());
        registry
    }

    pub fn add_chain(&self, chain: ChainInfo) {
        debug!("Registering chain {}", chain.chain_id);
        self.chains
            .insert(chain.chain_identifier(), Arc::new(chain));
    }

    pub fn has_chain(&self, chain_id: &str) -> bool {
        self.chains.contains_key(&chain_identifier(chain_id))
    }

    pub fn get_chain(&self, chain_id: &str) -> SwapResult<Arc<ChainInfo>> {
        self.chains
            .get(&chain_identifier(chain_id))
            .map(|c| c.clone())
            .ok_or_else(|| SwapError::ChainNotFound {
                chain_id: chain_id.to_string(),
            })
    }

    /// Whether the chain is shown to users
    pub fn is_in_list_ui(&self, chain_id: &str) -> bool {
        self.get_chain(chain_id)
            .map(|c| c.show_in_list)
            .unwrap_or(false)
    }

    /// Known currency for `denom` on the chain, or a raw placeholder
    pub fn force_find_currency(&self, chain_id: &str, denom: &str) -> Currency {
        match self.get_chain(chain_id) {
            Ok(chain) => chain.force_find_currency(denom),
            Err(_) => Currency::raw(denom),
        }
    }

    pub fn chain_ids(&self) -> Vec<String> {
        self.chains.iter().map(|c| c.chain_id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}
