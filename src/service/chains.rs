//! Chains supported by the route service

use super::client::RouteServiceClient;
use super::schema::validate_chains_response;
use super::types::ChainsResponse;
use crate::chain::{chain_identifier, ChainIdNormalizer, ChainInfo, ChainRegistry};
use crate::query::ObservableQuery;

use std::sync::Arc;

pub const CHAINS_PATH: &str = "/v1/info/chains?include_evm=true";

/// A route service chain that is also known locally
#[derive(Debug, Clone)]
pub struct SupportedChain {
    pub chain_info: Arc<ChainInfo>,
    pub pfm_enabled: bool,
    pub supports_memo: bool,
}

/// Cached chain list of the route service
pub struct ChainsQuery {
    query: Arc<ObservableQuery<ChainsResponse>>,
    client: Arc<dyn RouteServiceClient>,
    registry: Arc<ChainRegistry>,
}

impl ChainsQuery {
    pub fn new(client: Arc<dyn RouteServiceClient>, registry: Arc<ChainRegistry>) -> Self {
        let key = format!("{}{}", client.base_url(), CHAINS_PATH);
        Self {
            query: Arc::new(ObservableQuery::new("chains", key)),
            client,
            registry,
        }
    }

    pub fn query(&self) -> &Arc<ObservableQuery<ChainsResponse>> {
        &self.query
    }

    /// Fetch (or join the in-flight fetch of) the chain list
    pub async fn fetch(&self) {
        let client = self.client.clone();

        self.query
            .fetch_with(move || async move {
                let value = client.get(CHAINS_PATH).await?;
                let mut response = validate_chains_response(&value)?;

                for chain in &mut response.chains {
                    let is_evm = ChainIdNormalizer::is_numeric_service_id(&chain.chain_id);
                    chain.chain_id = ChainIdNormalizer::to_canonical_id(&chain.chain_id, is_evm);
                }

                Ok(response)
            })
            .await
    }

    /// Fetch only if nothing has been fetched yet
    pub async fn ensure_fetched(&self) {
        let snapshot = self.query.snapshot();
        if snapshot.response.is_none() || snapshot.is_fetching {
            self.fetch().await;
        }
    }

    /// Chains known locally and shown in the UI list
    pub fn chains(&self) -> Vec<SupportedChain> {
        let Some(response) = self.query.response() else {
            return Vec::new();
        };

        response
            .chains
            .iter()
            .filter(|chain| self.registry.has_chain(&chain.chain_id))
            .filter(|chain| self.registry.is_in_list_ui(&chain.chain_id))
            .filter_map(|chain| {
                let chain_info = self.registry.get_chain(&chain.chain_id).ok()?;
                Some(SupportedChain {
                    chain_info,
                    pfm_enabled: chain.pfm_enabled,
                    supports_memo: chain.supports_memo.unwrap_or(false),
                })
            })
            .collect()
    }

    fn find(&self, chain_id: &str) -> Option<SupportedChain> {
        let identifier = chain_identifier(chain_id);
        self.chains()
            .into_iter()
            .find(|chain| chain.chain_info.chain_identifier() == identifier)
    }

    /// Whether packet forwarding is available; false for unknown chains
    pub fn is_pfm_enabled(&self, chain_id: &str) -> bool {
        self.find(chain_id).map(|c| c.pfm_enabled).unwrap_or(false)
    }

    /// Whether transfers may carry a memo; false for unknown chains
    pub fn is_supports_memo(&self, chain_id: &str) -> bool {
        self.find(chain_id).map(|c| c.supports_memo).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::client::MockRouteServiceClient;
    use crate::service::test_support::registry;
    use serde_json::json;

    fn client_returning(body: serde_json::Value) -> MockRouteServiceClient {
        let mut client = MockRouteServiceClient::new();
        client
            .expect_base_url()
            .return_const("https://route.example.com".to_string());
        client
            .expect_get()
            .withf(|path| path == CHAINS_PATH)
            .times(1)
            .returning(move |_| Ok(body.clone()));
        client
    }

    #[tokio::test]
    async fn test_chains_filtered_and_normalized() {
        let client = client_returning(json!({
            "chains": [
                { "chain_id": "osmosis-1", "pfm_enabled": true, "supports_memo": true },
                { "chain_id": "cosmoshub-4", "pfm_enabled": false },
                { "chain_id": "1", "pfm_enabled": false, "supports_memo": true },
                { "chain_id": "juno-1", "pfm_enabled": true, "supports_memo": true }
            ]
        }));
        let chains = ChainsQuery::new(Arc::new(client), registry());

        assert!(chains.chains().is_empty());
        chains.fetch().await;

        let ids: Vec<_> = chains
            .chains()
            .iter()
            .map(|c| c.chain_info.chain_id.clone())
            .collect();
        assert_eq!(ids, vec!["osmosis-1", "cosmoshub-4", "eip155:1"]);

        assert!(chains.is_pfm_enabled("osmosis-1"));
        // Compared by identifier, so a new revision still matches
        assert!(chains.is_pfm_enabled("osmosis-2"));
        assert!(!chains.is_pfm_enabled("cosmoshub-4"));
        assert!(!chains.is_supports_memo("cosmoshub-4"));
        assert!(chains.is_supports_memo("eip155:1"));
        // Not known locally
        assert!(!chains.is_pfm_enabled("juno-1"));
    }

    #[tokio::test]
    async fn test_invalid_response_surfaces_as_error() {
        let client = client_returning(json!({ "chains": [{ "pfm_enabled": true }] }));
        let chains = ChainsQuery::new(Arc::new(client), registry());

        chains.fetch().await;

        assert!(chains.query().error().is_some());
        assert!(chains.chains().is_empty());
        assert!(!chains.is_pfm_enabled("osmosis-1"));
    }
}
