//! Chain identifier normalization between local ids and route service ids
//!
//! EVM chains are `eip155:<n>` locally and bare `<n>` at the route service.
//! Cosmos chain ids pass through unchanged.

use super::ChainRegistry;

use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;

/// Prefix of canonical EVM chain ids
pub const EVM_CHAIN_PREFIX: &str = "eip155:";

lazy_static! {
    static ref REVISION_PATTERN: Regex = Regex::new(r"^(.+)-([\d]+)$").expect("valid revision pattern");
}

/// Version-less identity of a chain id (`cosmoshub-4` -> `cosmoshub`)
pub fn chain_identifier(chain_id: &str) -> String {
    match REVISION_PATTERN.captures(chain_id) {
        Some(caps) => caps[1].to_string(),
        None => chain_id.to_string(),
    }
}

/// Maps chain ids across the route service boundary
#[derive(Clone)]
pub struct ChainIdNormalizer {
    registry: Arc<ChainRegistry>,
}

impl ChainIdNormalizer {
    pub fn new(registry: Arc<ChainRegistry>) -> Self {
        Self { registry }
    }

    /// True when the id is `eip155:`-prefixed and the chain has an EVM layer configured
    pub fn is_evm_only(&self, canonical_id: &str) -> bool {
        canonical_id.starts_with(EVM_CHAIN_PREFIX)
            && self
                .registry
                .get_chain(canonical_id)
                .map(|chain| chain.evm.is_some())
                .unwrap_or(false)
    }

    /// Route service representation of a canonical chain id
    pub fn to_service_id(&self, canonical_id: &str) -> String {
        if self.is_evm_only(canonical_id) {
            canonical_id
                .trim_start_matches(EVM_CHAIN_PREFIX)
                .to_string()
        } else {
            canonical_id.to_string()
        }
    }

    /// Canonical representation of a route service chain id
    pub fn to_canonical_id(service_id: &str, is_evm: bool) -> String {
        if is_evm && !service_id.starts_with(EVM_CHAIN_PREFIX) {
            format!("{}{}", EVM_CHAIN_PREFIX, service_id)
        } else {
            service_id.to_string()
        }
    }

    /// The route service reports EVM chains as plain integers
    pub fn is_numeric_service_id(service_id: &str) -> bool {
        !service_id.is_empty() && service_id.chars().all(|c| c.is_ascii_digit())
    }

    /// Canonical id for an id that may be in either representation
    pub fn canonicalize(&self, chain_id: &str) -> String {
        Self::to_canonical_id(chain_id, Self::is_numeric_service_id(chain_id))
    }

    /// Whether the chain signs with an EVM key, for ids in either representation
    pub fn uses_evm_address(&self, chain_id: &str) -> bool {
        Self::is_numeric_service_id(chain_id) || self.is_evm_only(chain_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{ChainInfo, EvmInfo};

    fn normalizer() -> ChainIdNormalizer {
        let registry = ChainRegistry::new(vec![
            ChainInfo::cosmos("osmosis-1", "osmo", vec![]),
            ChainInfo {
                evm: Some(EvmInfo {
                    chain_id: 1,
                    rpc_urls: vec![],
                }),
                ..ChainInfo::cosmos("eip155:1", "", vec![])
            },
            // eip155 id without an EVM layer
            ChainInfo::cosmos("eip155:5", "", vec![]),
        ]);
        ChainIdNormalizer::new(Arc::new(registry))
    }

    #[test]
    fn test_round_trip() {
        let normalizer = normalizer();
        for id in ["osmosis-1", "eip155:1", "eip155:5", "unknown-7"] {
            let service_id = normalizer.to_service_id(id);
            let back = ChainIdNormalizer::to_canonical_id(&service_id, normalizer.is_evm_only(id));
            assert_eq!(back, id);
        }
    }

    #[test]
    fn test_evm_ids_are_stripped() {
        let normalizer = normalizer();
        assert_eq!(normalizer.to_service_id("eip155:1"), "1");
        assert_eq!(normalizer.to_service_id("eip155:5"), "eip155:5");
        assert_eq!(normalizer.to_service_id("osmosis-1"), "osmosis-1");
        assert!(normalizer.is_evm_only("eip155:1"));
        assert!(!normalizer.is_evm_only("eip155:5"));
    }

    #[test]
    fn test_canonicalize_numeric_ids() {
        let normalizer = normalizer();
        assert_eq!(normalizer.canonicalize("1"), "eip155:1");
        assert_eq!(normalizer.canonicalize("osmosis-1"), "osmosis-1");
        assert!(normalizer.uses_evm_address("1"));
        assert!(normalizer.uses_evm_address("eip155:1"));
        assert!(!normalizer.uses_evm_address("osmosis-1"));
    }

    #[test]
    fn test_chain_identifier() {
        assert_eq!(chain_identifier("cosmoshub-4"), "cosmoshub");
        assert_eq!(chain_identifier("osmosis-1"), "osmosis");
        assert_eq!(chain_identifier("eip155:1"), "eip155:1");
        assert_eq!(chain_identifier("juno"), "juno");
    }
}
