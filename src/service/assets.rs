//! Per-chain assets available through the route service

use super::client::RouteServiceClient;
use super::schema::validate_assets_response;
use super::swap_usage::SwapUsage;
use super::types::{AssetRecord, AssetsResponse};
use crate::chain::currency::IBC_DENOM_PREFIX;
use crate::chain::{ChainIdNormalizer, ChainInfo, ChainRegistry, DenomHelper, EVM_CHAIN_PREFIX};
use crate::query::{ObservableQuery, QueryMap};

use std::sync::Arc;

/// An asset that may be offered for a swap on its chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwappableAsset {
    /// Denom as reported by the route service, or `erc20:<contract>` in the swap-usage view
    pub denom: String,
    pub chain_id: String,
    pub origin_denom: String,
    pub origin_chain_id: String,
}

impl From<&AssetRecord> for SwappableAsset {
    fn from(asset: &AssetRecord) -> Self {
        Self {
            denom: asset.denom.clone(),
            chain_id: asset.chain_id.clone(),
            origin_denom: asset.origin_denom.clone(),
            origin_chain_id: asset.origin_chain_id.clone(),
        }
    }
}

/// Local denom of an asset: EVM tokens are keyed by their contract
fn local_denom(asset: &AssetRecord) -> String {
    match asset.token_contract.as_deref() {
        Some(contract) if asset.is_evm && !contract.is_empty() => DenomHelper::erc20_denom(contract),
        _ => asset.denom.clone(),
    }
}

/// Assets of one chain
pub struct AssetsQuery {
    chain_id: String,
    path: String,
    query: Arc<ObservableQuery<AssetsResponse>>,
    client: Arc<dyn RouteServiceClient>,
    registry: Arc<ChainRegistry>,
    swap_usage: Arc<dyn SwapUsage>,
}

impl AssetsQuery {
    pub fn new(
        chain_id: &str,
        client: Arc<dyn RouteServiceClient>,
        registry: Arc<ChainRegistry>,
        swap_usage: Arc<dyn SwapUsage>,
    ) -> Self {
        let path = format!(
            "/v2/fungible/assets?chain_id={}&native_only=false&include_evm_assets=true",
            chain_id.trim_start_matches(EVM_CHAIN_PREFIX)
        );
        let key = format!("{}{}", client.base_url(), path);

        Self {
            chain_id: chain_id.to_string(),
            path,
            query: Arc::new(ObservableQuery::new("assets", key)),
            client,
            registry,
            swap_usage,
        }
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    pub fn query(&self) -> &Arc<ObservableQuery<AssetsResponse>> {
        &self.query
    }

    pub async fn fetch(&self) {
        let client = self.client.clone();
        let path = self.path.clone();

        self.query
            .fetch_with(move || async move {
                let value = client.get(&path).await?;
                validate_assets_response(&value)
            })
            .await
    }

    pub async fn ensure_fetched(&self) {
        let snapshot = self.query.snapshot();
        if snapshot.response.is_none() || snapshot.is_fetching {
            self.fetch().await;
        }
    }

    /// The fetched assets of this chain, if the chain is known and listed
    fn chain_assets(&self) -> Option<(Arc<ChainInfo>, Vec<AssetRecord>)> {
        let response = self.query.response()?;
        let map = response.chain_to_assets_map.as_ref()?;

        let chain_info = self.registry.get_chain(&self.chain_id).ok()?;
        if !self.registry.is_in_list_ui(&chain_info.chain_id) {
            return None;
        }

        let service_id = chain_info.chain_id.trim_start_matches(EVM_CHAIN_PREFIX);
        let assets = map.get(service_id)?.assets.clone();
        Some((chain_info, assets))
    }

    fn is_known(&self, chain_info: &ChainInfo, asset: &AssetRecord) -> bool {
        if !self.registry.has_chain(&canonical(&asset.chain_id))
            || !self.registry.has_chain(&canonical(&asset.origin_chain_id))
        {
            return false;
        }

        asset.denom.starts_with(IBC_DENOM_PREFIX)
            || chain_info.find_currency(&local_denom(asset)).is_some()
    }

    /// Assets whose chains are known and whose currency resolves locally
    pub fn assets(&self) -> Vec<SwappableAsset> {
        let Some((chain_info, assets)) = self.chain_assets() else {
            return Vec::new();
        };

        assets
            .iter()
            .filter(|asset| self.is_known(&chain_info, asset))
            .map(SwappableAsset::from)
            .collect()
    }

    /// Whether a known asset of this chain has the given local denom
    pub fn contains_denom(&self, denom: &str) -> bool {
        let Some((chain_info, assets)) = self.chain_assets() else {
            return false;
        };

        assets
            .iter()
            .filter(|asset| self.is_known(&chain_info, asset))
            .any(|asset| asset.denom == denom || local_denom(asset) == denom)
    }

    /// As [`assets`](Self::assets), restricted to the swap-usage allow-list
    /// on non-EVM chains, with EVM tokens reported by their local denom
    pub fn assets_only_swap_usages(&self) -> Vec<SwappableAsset> {
        let Some((chain_info, assets)) = self.chain_assets() else {
            return Vec::new();
        };
        let is_evm_chain = self.chain_id.starts_with(EVM_CHAIN_PREFIX);

        assets
            .iter()
            .filter(|asset| {
                is_evm_chain || self.swap_usage.is_swappable(&self.chain_id, &asset.denom)
            })
            .filter(|asset| self.is_known(&chain_info, asset))
            .map(|asset| {
                let denom = if asset.denom.starts_with(IBC_DENOM_PREFIX) {
                    asset.denom.clone()
                } else {
                    local_denom(asset)
                };
                SwappableAsset {
                    denom,
                    ..SwappableAsset::from(asset)
                }
            })
            .collect()
    }
}

/// Asset chain ids come back in route service form
fn canonical(chain_id: &str) -> String {
    ChainIdNormalizer::to_canonical_id(chain_id, ChainIdNormalizer::is_numeric_service_id(chain_id))
}

/// Assets queries keyed by chain id
pub type AssetsStore = QueryMap<String, AssetsQuery>;

pub fn assets_store(
    client: Arc<dyn RouteServiceClient>,
    registry: Arc<ChainRegistry>,
    swap_usage: Arc<dyn SwapUsage>,
) -> AssetsStore {
    QueryMap::new("assets", move |chain_id: &String| {
        AssetsQuery::new(chain_id, client.clone(), registry.clone(), swap_usage.clone())
    })
}
