//! All route service resources behind one handle

use super::assets::{assets_store, AssetsQuery, AssetsStore};
use super::chains::ChainsQuery;
use super::client::RouteServiceClient;
use super::msgs_direct::{msgs_direct_store, MsgsDirectParams, MsgsDirectQuery, MsgsDirectStore};
use super::route::{route_store, RouteParams, RouteQuery, RouteStore};
use super::swap_usage::SwapUsage;
use super::types::SwapVenue;
use crate::chain::{ChainIdNormalizer, ChainRegistry};
use crate::config::Settings;

use std::sync::Arc;

/// Chains, assets, route and msgs_direct resources sharing one client
pub struct SwapQueries {
    chains: ChainsQuery,
    assets: AssetsStore,
    routes: RouteStore,
    msgs_direct: MsgsDirectStore,
    swap_venues: Vec<SwapVenue>,
    registry: Arc<ChainRegistry>,
    normalizer: ChainIdNormalizer,
}

impl SwapQueries {
    pub fn new(
        settings: &Settings,
        client: Arc<dyn RouteServiceClient>,
        registry: Arc<ChainRegistry>,
        swap_usage: Arc<dyn SwapUsage>,
    ) -> Self {
        let normalizer = ChainIdNormalizer::new(registry.clone());

        Self {
            chains: ChainsQuery::new(client.clone(), registry.clone()),
            assets: assets_store(client.clone(), registry.clone(), swap_usage),
            routes: route_store(client.clone(), normalizer.clone(), registry.clone()),
            msgs_direct: msgs_direct_store(client, normalizer.clone(), registry.clone()),
            swap_venues: settings.swap.swap_venues.iter().map(SwapVenue::from).collect(),
            registry,
            normalizer,
        }
    }

    pub fn chains(&self) -> &ChainsQuery {
        &self.chains
    }

    pub fn assets(&self, chain_id: &str) -> Arc<AssetsQuery> {
        self.assets.get(&chain_id.to_string())
    }

    pub fn route(&self, params: &RouteParams) -> Arc<RouteQuery> {
        self.routes.get(params)
    }

    pub fn msgs_direct(&self, params: &MsgsDirectParams) -> Arc<MsgsDirectQuery> {
        self.msgs_direct.get(params)
    }

    /// All configured venues; the first one is hinted to the route service
    /// Forget the msgs_direct resource for `params`; current holders keep their instance
    pub fn evict_msgs_direct(&self, params: &MsgsDirectParams) {
        self.msgs_direct.remove(params);
    }

    pub fn swap_venues(&self) -> &[SwapVenue] {
        &self.swap_venues
    }

    pub fn primary_swap_venue(&self) -> Option<&SwapVenue> {
        self.swap_venues.first()
    }

    pub fn registry(&self) -> &Arc<ChainRegistry> {
        &self.registry
    }

    pub fn normalizer(&self) -> &ChainIdNormalizer {
        &self.normalizer
    }

    /// Whether `denom` may be swapped from `chain_id`
    pub fn is_swappable_currency(&self, chain_id: &str, denom: &str) -> bool {
        self.assets(chain_id)
            .assets_only_swap_usages()
            .iter()
            .any(|asset| asset.denom == denom)
    }

    /// Whether `denom` on `chain_id` can be received as a swap output
    pub fn is_swap_destination(&self, chain_id: &str, denom: &str) -> bool {
        self.assets(chain_id).contains_denom(denom)
    }
}
