//! Route quotes from the route service

use super::client::RouteServiceClient;
use super::schema::validate_route_response;
use super::types::{RouteResponse, SwapVenue};
use crate::chain::{ChainIdNormalizer, ChainRegistry, CoinPretty, DenomHelper};
use crate::error::{SwapError, SwapResult};
use crate::query::{ObservableQuery, QueryKey, QueryMap};

use ethers::types::U256;
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

pub const ROUTE_PATH: &str = "/v2/fungible/route";

lazy_static! {
    /// `<integer amount><optional whitespace><denom>`, e.g. `1500uusdc`
    static ref FEE_PATTERN: Regex =
        Regex::new(r"^([0-9]+)(\s)*([a-zA-Z][a-zA-Z0-9/-]*)$").expect("valid fee pattern");
}

/// Parse an estimated affiliate fee into its base-unit amount and denom
pub fn parse_fee(fee: &str) -> SwapResult<(U256, String)> {
    let caps = FEE_PATTERN
        .captures(fee)
        .ok_or_else(|| SwapError::InvalidFeeFormat(fee.to_string()))?;

    let amount = U256::from_dec_str(&caps[1])
        .map_err(|_| SwapError::InvalidFeeFormat(fee.to_string()))?;
    Ok((amount, caps[3].to_string()))
}

/// Routing flags sent with a request, chosen by whether an EVM-only chain is involved
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub(crate) enum RoutingOptions {
    Evm {
        #[serde(skip_serializing_if = "Option::is_none")]
        allow_unsafe: Option<bool>,
        #[serde(skip_serializing_if = "Option::is_none")]
        allow_multi_tx: Option<bool>,
        #[serde(skip_serializing_if = "Option::is_none")]
        experimental_features: Option<Vec<&'static str>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        smart_relay: Option<bool>,
        smart_swap_options: SmartSwapOptions,
    },
    Venue {
        swap_venue: SwapVenue,
    },
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SmartSwapOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split_routes: Option<bool>,
    pub evm_swaps: bool,
}

/// Denom as the route service expects it
pub(crate) fn service_denom(denom: &str) -> String {
    DenomHelper::new(denom).service_denom().to_string()
}

/// Quoted output in the destination currency; zero before a response
pub(crate) fn out_amount(
    registry: &ChainRegistry,
    dest_chain_id: &str,
    dest_denom: &str,
    route: Option<&RouteResponse>,
) -> CoinPretty {
    let currency = registry.force_find_currency(dest_chain_id, dest_denom);
    match route {
        Some(route) => CoinPretty::new(currency, route.amount_out),
        None => CoinPretty::zero(currency),
    }
}

/// Affiliate fee of every swap hop; a single zero coin before a response
pub(crate) fn swap_fee(
    registry: &ChainRegistry,
    dest_chain_id: &str,
    dest_denom: &str,
    route: Option<&RouteResponse>,
) -> SwapResult<Vec<CoinPretty>> {
    let Some(route) = route else {
        return Ok(vec![out_amount(registry, dest_chain_id, dest_denom, None)]);
    };

    route
        .swaps()
        .map(|swap| {
            let (amount, denom) = parse_fee(&swap.estimated_affiliate_fee)?;
            let venue_chain_id = swap
                .venue()
                .map(|venue| {
                    ChainIdNormalizer::to_canonical_id(
                        &venue.chain_id,
                        ChainIdNormalizer::is_numeric_service_id(&venue.chain_id),
                    )
                })
                .unwrap_or_else(|| dest_chain_id.to_string());

            Ok(CoinPretty::new(
                registry.force_find_currency(&venue_chain_id, &denom),
                amount,
            ))
        })
        .collect()
}

/// Price impact as a ratio, when the route reports one
pub(crate) fn swap_price_impact(route: Option<&RouteResponse>) -> Option<Decimal> {
    route?
        .swap_price_impact_percent
        .and_then(|percent| percent.checked_div(Decimal::ONE_HUNDRED))
}

/// Everything that affects a route quote
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteParams {
    pub source_chain_id: String,
    pub source_amount: String,
    pub source_denom: String,
    pub dest_chain_id: String,
    pub dest_denom: String,
    pub affiliate_fee_bps: u32,
    pub swap_venue: SwapVenue,
}

impl RouteParams {
    pub fn new(
        source_chain_id: &str,
        amount: &CoinPretty,
        dest_chain_id: &str,
        dest_denom: &str,
        affiliate_fee_bps: u32,
        swap_venue: SwapVenue,
    ) -> Self {
        let coin = amount.to_coin();
        Self {
            source_chain_id: source_chain_id.to_string(),
            source_amount: coin.amount,
            source_denom: coin.denom,
            dest_chain_id: dest_chain_id.to_string(),
            dest_denom: dest_denom.to_string(),
            affiliate_fee_bps,
            swap_venue,
        }
    }
}

#[derive(Serialize)]
struct RouteRequest {
    amount_in: String,
    source_asset_denom: String,
    source_asset_chain_id: String,
    dest_asset_denom: String,
    dest_asset_chain_id: String,
    cumulative_affiliate_fee_bps: String,
    #[serde(flatten)]
    routing: RoutingOptions,
}

/// Route quote for one parameter set
pub struct RouteQuery {
    params: RouteParams,
    query: Arc<ObservableQuery<RouteResponse>>,
    client: Arc<dyn RouteServiceClient>,
    normalizer: ChainIdNormalizer,
    registry: Arc<ChainRegistry>,
}

impl RouteQuery {
    pub fn new(
        params: RouteParams,
        client: Arc<dyn RouteServiceClient>,
        normalizer: ChainIdNormalizer,
        registry: Arc<ChainRegistry>,
    ) -> Self {
        let key = format!("{}{}-{}", client.base_url(), ROUTE_PATH, params.cache_key());
        Self {
            params,
            query: Arc::new(ObservableQuery::new("route", key)),
            client,
            normalizer,
            registry,
        }
    }

    pub fn params(&self) -> &RouteParams {
        &self.params
    }

    pub fn query(&self) -> &Arc<ObservableQuery<RouteResponse>> {
        &self.query
    }

    /// Empty and zero amounts are never quoted
    pub fn can_fetch(&self) -> bool {
        !self.params.source_amount.is_empty() && self.params.source_amount != "0"
    }

    pub(crate) fn request_body(&self) -> SwapResult<Value> {
        let p = &self.params;
        let source_evm = self.normalizer.is_evm_only(&p.source_chain_id);
        let dest_evm = self.normalizer.is_evm_only(&p.dest_chain_id);

        let routing = if source_evm || dest_evm {
            RoutingOptions::Evm {
                allow_unsafe: Some(true),
                allow_multi_tx: Some(true),
                experimental_features: Some(vec!["hyperlane"]),
                smart_relay: Some(true),
                smart_swap_options: SmartSwapOptions {
                    split_routes: Some(true),
                    evm_swaps: true,
                },
            }
        } else {
            RoutingOptions::Venue {
                swap_venue: p.swap_venue.clone(),
            }
        };

        let request = RouteRequest {
            amount_in: p.source_amount.clone(),
            source_asset_denom: service_denom(&p.source_denom),
            source_asset_chain_id: self.normalizer.to_service_id(&p.source_chain_id),
            dest_asset_denom: service_denom(&p.dest_denom),
            dest_asset_chain_id: self.normalizer.to_service_id(&p.dest_chain_id),
            cumulative_affiliate_fee_bps: p.affiliate_fee_bps.to_string(),
            routing,
        };

        serde_json::to_value(&request).map_err(|e| SwapError::Internal(e.to_string()))
    }

    pub async fn fetch(&self) {
        if !self.can_fetch() {
            debug!("Skipping route fetch for {}", self.query.key());
            crate::metrics::record_fetch_skipped("route");
            return;
        }

        let client = self.client.clone();
        let body = self.request_body();

        self.query
            .fetch_with(move || async move {
                let value = client.post(ROUTE_PATH, body?).await?;
                validate_route_response(&value)
            })
            .await
    }

    pub fn out_amount(&self) -> CoinPretty {
        out_amount(
            &self.registry,
            &self.params.dest_chain_id,
            &self.params.dest_denom,
            self.query.response().as_deref(),
        )
    }

    pub fn swap_fee(&self) -> SwapResult<Vec<CoinPretty>> {
        swap_fee(
            &self.registry,
            &self.params.dest_chain_id,
            &self.params.dest_denom,
            self.query.response().as_deref(),
        )
    }

    pub fn swap_price_impact(&self) -> Option<Decimal> {
        swap_price_impact(self.query.response().as_deref())
    }
}

/// Route queries keyed by their parameters
pub type RouteStore = QueryMap<RouteParams, RouteQuery>;

pub fn route_store(
    client: Arc<dyn RouteServiceClient>,
    normalizer: ChainIdNormalizer,
    registry: Arc<ChainRegistry>,
) -> RouteStore {
    QueryMap::new("route", move |params: &RouteParams| {
        RouteQuery::new(
            params.clone(),
            client.clone(),
            normalizer.clone(),
            registry.clone(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::client::MockRouteServiceClient;
    use crate::service::schema::tests::route_json;
    use crate::service::test_support::{normalizer, registry, venue};
    use serde_json::json;

    fn params(
        source_chain: &str,
        amount: u64,
        source_denom: &str,
        dest_chain: &str,
        dest_denom: &str,
    ) -> RouteParams {
        let currency = registry().force_find_currency(source_chain, source_denom);
        RouteParams::new(
            source_chain,
            &CoinPretty::new(currency, U256::from(amount)),
            dest_chain,
            dest_denom,
            75,
            venue(),
        )
    }

    fn base_client() -> MockRouteServiceClient {
        let mut client = MockRouteServiceClient::new();
        client
            .expect_base_url()
            .return_const("https://route.example.com".to_string());
        client
    }

    fn query_with(client: MockRouteServiceClient, params: RouteParams) -> RouteQuery {
        RouteQuery::new(params, Arc::new(client), normalizer(), registry())
    }

    #[test]
    fn test_parse_fee() {
        assert_eq!(
            parse_fee("1500uusdc").unwrap(),
            (U256::from(1500u64), "uusdc".to_string())
        );
        assert_eq!(
            parse_fee("25 ibc/ABC-1").unwrap(),
            (U256::from(25u64), "ibc/ABC-1".to_string())
        );
        assert!(matches!(
            parse_fee("abcusdc"),
            Err(SwapError::InvalidFeeFormat(_))
        ));
        assert!(parse_fee("1500").is_err());
        assert!(parse_fee("1.5uusdc").is_err());
    }

    #[tokio::test]
    async fn test_zero_amount_never_fetches() {
        let mut client = base_client();
        client.expect_post().never();

        let query = query_with(client, params("osmosis-1", 0, "uosmo", "cosmoshub-4", "uatom"));
        assert!(!query.can_fetch());

        query.fetch().await;

        assert!(query.query().response().is_none());
        assert!(!query.query().is_fetching());
        let out = query.out_amount();
        assert!(out.is_zero());
        assert_eq!(out.currency().coin_denom, "ATOM");

        let fee = query.swap_fee().unwrap();
        assert_eq!(fee.len(), 1);
        assert!(fee[0].is_zero());
        assert!(query.swap_price_impact().is_none());
    }

    #[tokio::test]
    async fn test_quote_derivations() {
        let mut client = base_client();
        client
            .expect_post()
            .withf(|path, _| path == ROUTE_PATH)
            .times(1)
            .returning(|_, _| Ok(route_json("1000000", 1)));

        let query = query_with(client, params("osmosis-1", 1_000_000, "uosmo", "cosmoshub-4", "uatom"));
        query.fetch().await;

        let out = query.out_amount();
        assert_eq!(out.to_decimal_string(), "1");
        assert_eq!(out.to_decimal(), Some(Decimal::ONE));

        let fee = query.swap_fee().unwrap();
        assert_eq!(fee.len(), 1);
        assert_eq!(fee[0].amount(), U256::from(1500u64));
        assert_eq!(fee[0].currency().coin_minimal_denom, "uatom");

        assert_eq!(query.swap_price_impact(), Some(Decimal::new(12, 4)));
    }

    #[tokio::test]
    async fn test_malformed_fee_is_fatal() {
        let mut route = route_json("1000000", 1);
        route["operations"][0]["swap"]["estimated_affiliate_fee"] = json!("abcusdc");

        let mut client = base_client();
        client.expect_post().returning(move |_, _| Ok(route.clone()));

        let query = query_with(client, params("osmosis-1", 1_000_000, "uosmo", "cosmoshub-4", "uatom"));
        query.fetch().await;

        assert!(query.query().error().is_none());
        assert!(matches!(query.swap_fee(), Err(SwapError::InvalidFeeFormat(_))));
    }

    #[test]
    fn test_request_body_cosmos_uses_venue() {
        let query = query_with(
            base_client(),
            params("osmosis-1", 1_000_000, "uosmo", "cosmoshub-4", "uatom"),
        );
        let body = query.request_body().unwrap();

        assert_eq!(body["amount_in"], "1000000");
        assert_eq!(body["source_asset_chain_id"], "osmosis-1");
        assert_eq!(body["cumulative_affiliate_fee_bps"], "75");
        assert_eq!(body["swap_venue"]["name"], "osmosis-poolmanager");
        assert_eq!(body["swap_venue"]["chain_id"], "osmosis-1");
        assert!(body.get("allow_unsafe").is_none());
        assert!(body.get("smart_swap_options").is_none());
    }

    #[test]
    fn test_request_body_evm_flags() {
        let usdc = "erc20:0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";
        let query = query_with(
            base_client(),
            params("eip155:1", 1_000_000, usdc, "osmosis-1", "uosmo"),
        );
        let body = query.request_body().unwrap();

        assert_eq!(body["source_asset_chain_id"], "1");
        assert_eq!(
            body["source_asset_denom"],
            "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"
        );
        assert_eq!(body["allow_unsafe"], true);
        assert_eq!(body["allow_multi_tx"], true);
        assert_eq!(body["smart_relay"], true);
        assert_eq!(body["experimental_features"], json!(["hyperlane"]));
        assert_eq!(body["smart_swap_options"]["split_routes"], true);
        assert_eq!(body["smart_swap_options"]["evm_swaps"], true);
        assert!(body.get("swap_venue").is_none());
    }

    #[test]
    fn test_store_reuses_queries_per_params() {
        let store = route_store(Arc::new(base_client()), normalizer(), registry());
        let p = params("osmosis-1", 1_000_000, "uosmo", "cosmoshub-4", "uatom");

        let a = store.get(&p);
        let b = store.get(&p.clone());
        assert!(Arc::ptr_eq(&a, &b));

        let other = RouteParams {
            affiliate_fee_bps: 0,
            ..p
        };
        assert!(!Arc::ptr_eq(&a, &store.get(&other)));
        assert_ne!(a.query().key(), store.get(&other).query().key());
    }
}
