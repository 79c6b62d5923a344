//! Configuration management for the swap route engine
//!
//! Loads configuration from TOML files with environment variable substitution.

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

/// Maximum affiliate fee, in basis points
pub const MAX_FEE_BPS: u32 = 10_000;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub route_service: RouteServiceConfig,
    pub swap: SwapSettings,
    #[serde(default)]
    pub engine: EngineConfig,
    pub metrics: MetricsConfig,
    pub chains: HashMap<String, ChainConfig>,
    /// Optional pair to quote once at startup
    pub quote: Option<QuoteConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteServiceConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SwapSettings {
    pub affiliate_fee_bps: u32,
    pub affiliate_fee_receiver: String,
    pub default_slippage_tolerance_percent: f64,
    pub swap_venues: Vec<SwapVenueConfig>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SwapVenueConfig {
    pub name: String,
    pub chain_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    pub chains_refresh_interval_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chains_refresh_interval_secs: 600,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub chain_id: String,
    pub name: String,
    pub bech32_prefix: Option<String>,
    pub evm: Option<EvmConfig>,
    #[serde(default)]
    pub currencies: Vec<CurrencyConfig>,
    #[serde(default = "default_true")]
    pub show_in_list: bool,
    /// Denoms the swap-usage allow-list accepts on this chain
    #[serde(default)]
    pub swappable_denoms: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvmConfig {
    pub chain_id: u64,
    #[serde(default)]
    pub rpc_urls: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrencyConfig {
    pub coin_minimal_denom: String,
    pub coin_denom: String,
    pub coin_decimals: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuoteConfig {
    pub source_chain_id: String,
    pub source_denom: String,
    pub amount: String,
    pub dest_chain_id: String,
    pub dest_denom: String,
}

fn default_true() -> bool {
    true
}

impl Settings {
    /// Load settings from the configured file
    pub fn load() -> Result<Self> {
        let config_path = env::var("SWAP_ENGINE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));

        Self::load_from(&config_path)
    }

    /// Load settings from a specific path
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        Self::from_toml(&config_str)
    }

    /// Parse settings from TOML text after substituting environment variables
    pub fn from_toml(config_str: &str) -> Result<Self> {
        let config_str = substitute_env_vars(config_str);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.chains.is_empty() {
            anyhow::bail!("At least one chain must be configured");
        }

        if self.swap.swap_venues.is_empty() {
            anyhow::bail!("At least one swap venue must be configured");
        }

        if self.swap.affiliate_fee_bps > MAX_FEE_BPS {
            anyhow::bail!(
                "Affiliate fee of {} bps exceeds {} bps",
                self.swap.affiliate_fee_bps,
                MAX_FEE_BPS
            );
        }

        if self.route_service.base_url.is_empty() {
            anyhow::bail!("Route service base URL is empty");
        }

        for (name, chain) in &self.chains {
            if chain.chain_id.starts_with("eip155:") && chain.evm.is_none() {
                tracing::warn!(
                    "Chain {} uses an eip155 id without an EVM section - it will be treated as non-EVM",
                    name
                );
            }
            if chain.evm.is_none() && chain.bech32_prefix.is_none() {
                anyhow::bail!("Chain {} has neither a bech32 prefix nor an EVM section", name);
            }
        }

        for venue in &self.swap.swap_venues {
            if !self.chains.values().any(|c| c.chain_id == venue.chain_id) {
                tracing::warn!(
                    "Swap venue {} is on unconfigured chain {}",
                    venue.name,
                    venue.chain_id
                );
            }
        }

        Ok(())
    }

    /// Get chain config by chain ID
    pub fn get_chain_by_id(&self, chain_id: &str) -> Option<&ChainConfig> {
        self.chains.values().find(|c| c.chain_id == chain_id)
    }
}

lazy_static! {
    static ref ENV_VAR_PATTERN: Regex =
        Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("valid env var pattern");
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    ENV_VAR_PATTERN
        .replace_all(input, |caps: &regex::Captures| {
            env::var(&caps[1]).unwrap_or_default()
        })
        .into_owned()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    pub(crate) const SAMPLE_CONFIG: &str = r#"
[route_service]
base_url = "https://route.example.com"

[swap]
affiliate_fee_bps = 75
affiliate_fee_receiver = "osmo1feereceiver"
default_slippage_tolerance_percent = 1.0
swap_venues = [{ name = "osmosis-poolmanager", chain_id = "osmosis-1" }]

[metrics]
enabled = false
port = 9090

[chains.osmosis]
chain_id = "osmosis-1"
name = "Osmosis"
bech32_prefix = "osmo"
swappable_denoms = ["uosmo", "uion"]
currencies = [
  { coin_minimal_denom = "uosmo", coin_denom = "OSMO", coin_decimals = 6 },
  { coin_minimal_denom = "uion", coin_denom = "ION", coin_decimals = 6 },
  { coin_minimal_denom = "uusdc", coin_denom = "USDC", coin_decimals = 6 },
]

[chains.cosmoshub]
chain_id = "cosmoshub-4"
name = "Cosmos Hub"
bech32_prefix = "cosmos"
swappable_denoms = ["uatom"]
currencies = [
  { coin_minimal_denom = "uatom", coin_denom = "ATOM", coin_decimals = 6 },
]

[chains.ethereum]
chain_id = "eip155:1"
name = "Ethereum"
currencies = [
  { coin_minimal_denom = "ethereum-native", coin_denom = "ETH", coin_decimals = 18 },
  { coin_minimal_denom = "erc20:0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48", coin_denom = "USDC", coin_decimals = 6 },
]

[chains.ethereum.evm]
chain_id = 1
rpc_urls = []
"#;

    #[test]
    fn test_env_var_substitution() {
        env::set_var("SWAP_TEST_VAR", "test_value");
        let input = "url = \"https://api.example.com/${SWAP_TEST_VAR}/endpoint\"";
        let result = substitute_env_vars(input);
        assert_eq!(result, "url = \"https://api.example.com/test_value/endpoint\"");
    }

    #[test]
    fn test_missing_env_var_becomes_empty() {
        let result = substitute_env_vars("key = \"${SWAP_TEST_UNSET_VAR}\"");
        assert_eq!(result, "key = \"\"");
    }

    #[test]
    fn test_load_sample_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE_CONFIG.as_bytes()).unwrap();

        let settings = Settings::load_from(file.path()).unwrap();
        assert_eq!(settings.chains.len(), 3);
        assert_eq!(settings.swap.affiliate_fee_bps, 75);
        assert_eq!(settings.engine.chains_refresh_interval_secs, 600);
        assert!(settings.quote.is_none());

        let eth = settings.get_chain_by_id("eip155:1").unwrap();
        assert_eq!(eth.evm.as_ref().unwrap().chain_id, 1);
        assert!(eth.show_in_list);
    }

    #[test]
    fn test_rejects_excessive_fee() {
        let config = SAMPLE_CONFIG.replace("affiliate_fee_bps = 75", "affiliate_fee_bps = 20000");
        assert!(Settings::from_toml(&config).is_err());
    }

    #[test]
    fn test_rejects_missing_swap_venues() {
        let config = SAMPLE_CONFIG.replace(
            r#"swap_venues = [{ name = "osmosis-poolmanager", chain_id = "osmosis-1" }]"#,
            "swap_venues = []",
        );
        assert!(Settings::from_toml(&config).is_err());
    }
}
