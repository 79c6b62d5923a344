//! Swap-usage allow-list

use crate::chain::chain_identifier;
use crate::config::Settings;

use std::collections::{HashMap, HashSet};

/// Decides which denoms may be used for swaps on a chain
#[cfg_attr(test, mockall::automock)]
pub trait SwapUsage: Send + Sync {
    fn is_swappable(&self, chain_id: &str, denom: &str) -> bool;
}

/// Allow-list read from the `swappable_denoms` of each configured chain
#[derive(Debug, Default, Clone)]
pub struct ConfiguredSwapUsage {
    /// Keyed by chain identifier
    allowed: HashMap<String, HashSet<String>>,
}

impl ConfiguredSwapUsage {
    pub fn from_settings(settings: &Settings) -> Self {
        let allowed = settings
            .chains
            .values()
            .map(|chain| {
                (
                    chain_identifier(&chain.chain_id),
                    chain.swappable_denoms.iter().cloned().collect(),
                )
            })
            .collect();

        Self { allowed }
    }

    pub fn allow(&mut self, chain_id: &str, denom: &str) {
        self.allowed
            .entry(chain_identifier(chain_id))
            .or_default()
            .insert(denom.to_string());
    }
}

impl SwapUsage for ConfiguredSwapUsage {
    fn is_swappable(&self, chain_id: &str, denom: &str) -> bool {
        self.allowed
            .get(&chain_identifier(chain_id))
            .map(|denoms| denoms.contains(denom))
            .unwrap_or(false)
    }
}
