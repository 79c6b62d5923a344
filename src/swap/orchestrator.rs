//! Swap configuration driving the msgs_direct resource

use super::amount::{AmountConfig, LoadingState, UiProperties};
use crate::chain::{chain_identifier, CoinPretty, Currency};
use crate::config::SwapSettings;
use crate::error::{SwapConfigError, SwapError, SwapResult};
use crate::service::{MsgsDirectParams, MsgsDirectQuery, SwapQueries, SwapType};
use crate::tx::{build_swap_transaction, AccountManager, GasSimulator, SwapTransaction, TxContext};

use ethers::types::U256;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Where a swap configuration stands, derived on every read
#[derive(Debug, Clone, PartialEq)]
pub enum SwapState {
    /// No resource yet, or no executable message
    NotReady,
    /// The resource is fetching
    Loading,
    /// A validation or business rule rejected the configuration
    Error(SwapConfigError),
    /// A single executable message passes every check
    Ready,
}

/// Reject when the quote fell by 1% or more since `prior` was shown
pub fn check_price_drift(prior: U256, current: U256) -> SwapResult<()> {
    if current >= prior || prior.is_zero() {
        return Ok(());
    }

    let drop = prior - current;
    if drop.saturating_mul(U256::from(100u64)) >= prior {
        warn!("Quoted output dropped from {} to {}", prior, current);
        crate::metrics::record_price_drift_rejection();
        return Err(SwapError::PriceChanged {
            prior: prior.to_string(),
            current: current.to_string(),
        });
    }

    Ok(())
}

/// Source amount plus destination, fee and slippage of a swap
pub struct SwapAmountConfig {
    queries: Arc<SwapQueries>,
    accounts: Arc<dyn AccountManager>,
    simulator: Arc<dyn GasSimulator>,
    amount: AmountConfig,
    out_chain_id: String,
    out_currency: Currency,
    swap_fee_bps: u32,
    slippage_tolerance_percent: f64,
    affiliate_fee_receiver: String,
    /// Resource of the last fetch, aborted when the selection moves on
    selected: Mutex<Option<Arc<MsgsDirectQuery>>>,
}

impl SwapAmountConfig {
    pub fn new(
        queries: Arc<SwapQueries>,
        accounts: Arc<dyn AccountManager>,
        simulator: Arc<dyn GasSimulator>,
        settings: &SwapSettings,
        chain_id: &str,
        out_chain_id: &str,
        out_currency: Currency,
    ) -> Self {
        Self {
            queries,
            accounts,
            simulator,
            amount: AmountConfig::new(chain_id),
            out_chain_id: out_chain_id.to_string(),
            out_currency,
            swap_fee_bps: settings.affiliate_fee_bps,
            slippage_tolerance_percent: settings.default_slippage_tolerance_percent,
            affiliate_fee_receiver: settings.affiliate_fee_receiver.clone(),
            selected: Mutex::new(None),
        }
    }

    pub fn chain_id(&self) -> &str {
        self.amount.chain_id()
    }

    pub fn currency(&self) -> Option<&Currency> {
        self.amount.currency()
    }

    pub fn value(&self) -> &str {
        self.amount.value()
    }

    pub fn out_chain_id(&self) -> &str {
        &self.out_chain_id
    }

    pub fn out_currency(&self) -> &Currency {
        &self.out_currency
    }

    pub fn swap_fee_bps(&self) -> u32 {
        self.swap_fee_bps
    }

    pub fn slippage_tolerance_percent(&self) -> f64 {
        self.slippage_tolerance_percent
    }

    pub fn set_chain(&mut self, chain_id: &str) {
        self.amount.set_chain(chain_id);
    }

    pub fn set_currency(&mut self, currency: Currency) {
        self.amount.set_currency(currency);
    }

    pub fn set_value(&mut self, value: &str) {
        self.amount.set_value(value);
    }

    pub fn set_out_chain_id(&mut self, chain_id: &str) {
        self.out_chain_id = chain_id.to_string();
    }

    pub fn set_out_currency(&mut self, currency: Currency) {
        self.out_currency = currency;
    }

    pub fn set_swap_fee_bps(&mut self, bps: u32) {
        self.swap_fee_bps = bps;
    }

    pub fn set_slippage_tolerance_percent(&mut self, percent: f64) {
        self.slippage_tolerance_percent = percent;
    }

    /// Address of the wallet on a chain, in the chain's address family
    fn address_for(&self, chain_id: &str) -> String {
        let normalizer = self.queries.normalizer();
        let canonical = normalizer.canonicalize(chain_id);

        if normalizer.uses_evm_address(chain_id) {
            self.accounts.ethereum_hex_address(&canonical)
        } else {
            self.accounts.bech32_address(&canonical)
        }
    }

    /// Wallet address for the source, every swap venue and the destination,
    /// keyed by route service chain id
    pub fn chain_ids_to_addresses(&self) -> BTreeMap<String, String> {
        let normalizer = self.queries.normalizer();
        let mut addresses = BTreeMap::new();

        let source = self.amount.chain_id();
        addresses.insert(normalizer.to_service_id(source), self.address_for(source));

        for venue in self.queries.swap_venues() {
            addresses.insert(venue.chain_id.clone(), self.address_for(&venue.chain_id));
        }

        addresses.insert(
            normalizer.to_service_id(&self.out_chain_id),
            self.address_for(&self.out_chain_id),
        );

        addresses
    }

    /// The msgs_direct resource for the current configuration; `None` while
    /// no amount is entered
    pub fn resolve_resource(&self) -> Option<Arc<MsgsDirectQuery>> {
        if self.amount.value().is_empty() {
            return None;
        }
        let amount = self.amount.amount().ok()?;
        let swap_venue = self.queries.primary_swap_venue()?.clone();
        let coin = amount.to_coin();

        let params = MsgsDirectParams {
            amount_in_denom: coin.denom,
            amount_in_amount: coin.amount,
            source_asset_chain_id: self.amount.chain_id().to_string(),
            dest_asset_denom: self.out_currency.coin_minimal_denom.clone(),
            dest_asset_chain_id: self.out_chain_id.clone(),
            chain_ids_to_addresses: self.chain_ids_to_addresses(),
            slippage_tolerance_percent: self.slippage_tolerance_percent,
            affiliate_fee_bps: self.swap_fee_bps,
            affiliate_fee_receiver: self.affiliate_fee_receiver.clone(),
            swap_venue,
        };

        Some(self.queries.msgs_direct(&params))
    }

    /// Remember `resource` as selected and abort the previous selection
    fn select(&self, resource: &Arc<MsgsDirectQuery>) {
        let previous = match self.selected.lock() {
            Ok(mut selected) => selected.replace(resource.clone()),
            Err(poisoned) => poisoned.into_inner().replace(resource.clone()),
        };

        if let Some(previous) = previous {
            if !Arc::ptr_eq(&previous, resource) && previous.abort() {
                debug!("Abandoned msgs_direct fetch for {}", previous.query().key());
                // An aborted quote that never settled has nothing worth caching
                if previous.response().is_none() && previous.error().is_none() {
                    self.queries.evict_msgs_direct(previous.params());
                }
            }
        }
    }

    /// Fetch the current resource along with the chain and asset lists it is checked against
    pub async fn fetch(&self) {
        let Some(resource) = self.resolve_resource() else {
            debug!("Swap amount not set, nothing to fetch");
            return;
        };
        self.select(&resource);

        let chains = self.queries.chains();
        let source_assets = self.queries.assets(self.amount.chain_id());
        let dest_assets = self.queries.assets(&self.out_chain_id);

        futures::join!(
            chains.ensure_fetched(),
            source_assets.ensure_fetched(),
            dest_assets.ensure_fetched(),
            resource.fetch()
        );
    }

    pub fn is_fetching(&self) -> bool {
        self.resolve_resource()
            .map(|resource| resource.is_fetching())
            .unwrap_or(false)
    }

    pub fn ui_properties(&self) -> UiProperties {
        let base = self.amount.ui_properties();
        if !base.is_ok() {
            return base;
        }

        let Some(resource) = self.resolve_resource() else {
            return UiProperties::error(SwapConfigError::NotInitialized);
        };

        if resource.is_fetching() {
            return UiProperties::loading(LoadingState::LoadingBlock);
        }

        if let Some(e) = resource.error() {
            return UiProperties::error(SwapConfigError::RouteService(e.to_string()));
        }

        let source_assets = self.queries.assets(self.amount.chain_id());
        let dest_assets = self.queries.assets(&self.out_chain_id);
        for assets in [&source_assets, &dest_assets] {
            if assets.query().response().is_none() {
                if let Some(e) = assets.query().error() {
                    return UiProperties::error(SwapConfigError::RouteService(e.to_string()));
                }
            }
        }

        // Nothing is decided until the quote and both asset lists have arrived
        if resource.response().is_none()
            || source_assets.query().response().is_none()
            || dest_assets.query().response().is_none()
        {
            return UiProperties::loading(LoadingState::LoadingBlock);
        }

        let source_denom = self
            .amount
            .currency()
            .map(|c| c.coin_minimal_denom.as_str())
            .unwrap_or_default();

        if source_denom == self.out_currency.coin_minimal_denom
            && chain_identifier(self.amount.chain_id()) == chain_identifier(&self.out_chain_id)
        {
            return UiProperties::error(SwapConfigError::SameCurrency);
        }

        if !self
            .queries
            .is_swappable_currency(self.amount.chain_id(), source_denom)
        {
            return UiProperties::error(SwapConfigError::UnsupportedSourceCurrency);
        }

        if !self
            .queries
            .is_swap_destination(&self.out_chain_id, &self.out_currency.coin_minimal_denom)
        {
            return UiProperties::error(SwapConfigError::UnsupportedDestinationCurrency);
        }

        let txs_required = resource.txs_required();
        if txs_required != Some(1) {
            return UiProperties::error(SwapConfigError::MultiTxRoute { txs_required });
        }

        UiProperties::ok()
    }

    pub fn state(&self) -> SwapState {
        let Some(resource) = self.resolve_resource() else {
            return SwapState::NotReady;
        };

        let ui = self.ui_properties();
        if let Some(error) = ui.error {
            return SwapState::Error(error);
        }
        if ui.loading_state.is_some() {
            return if self.is_pending(&resource) {
                SwapState::Loading
            } else {
                SwapState::NotReady
            };
        }

        match resource.msg() {
            Some(_) => SwapState::Ready,
            None => SwapState::NotReady,
        }
    }

    /// Whether the quote or an asset list it is checked against is being fetched
    fn is_pending(&self, resource: &MsgsDirectQuery) -> bool {
        resource.is_fetching()
            || self.queries.assets(self.amount.chain_id()).query().is_fetching()
            || self.queries.assets(&self.out_chain_id).query().is_fetching()
    }

    pub fn swap_type(&self) -> SwapType {
        self.resolve_resource()
            .map(|resource| resource.route_type())
            .unwrap_or(SwapType::NotReady)
    }

    pub fn out_amount(&self) -> CoinPretty {
        match self.resolve_resource() {
            Some(resource) => resource.out_amount(),
            None => CoinPretty::zero(self.out_currency.clone()),
        }
    }

    pub fn swap_fee(&self) -> SwapResult<Vec<CoinPretty>> {
        match self.resolve_resource() {
            Some(resource) => resource.swap_fee(),
            None => Ok(vec![CoinPretty::zero(self.out_currency.clone())]),
        }
    }

    pub fn swap_price_impact(&self) -> Option<Decimal> {
        self.resolve_resource()?.swap_price_impact()
    }

    /// Chains whose accounts must be ready, canonical and without repeats
    fn hop_chains(&self, route_chain_ids: &[String]) -> Vec<String> {
        let normalizer = self.queries.normalizer();
        let mut chains = vec![self.amount.chain_id().to_string()];

        let venue_chains = self.queries.swap_venues().iter().map(|v| &v.chain_id);
        for chain_id in venue_chains.chain(route_chain_ids.iter()) {
            let canonical = normalizer.canonicalize(chain_id);
            if !chains.contains(&canonical) {
                chains.push(canonical);
            }
        }

        chains
    }

    /// The signable transaction, or `None` while the configuration is not ready
    pub fn tx_if_ready(&self) -> SwapResult<Option<SwapTransaction>> {
        let Ok(amount) = self.amount.amount() else {
            return Ok(None);
        };
        if amount.is_zero() {
            return Ok(None);
        }
        let Some(resource) = self.resolve_resource() else {
            return Ok(None);
        };
        let Some(response) = resource.response() else {
            return Ok(None);
        };
        let Some(msg) = resource.msg() else {
            return Ok(None);
        };

        for chain_id in self.hop_chains(&response.route.chain_ids) {
            self.accounts.ensure_account_ready(&chain_id)?;
        }

        let source_chain_id = self.amount.chain_id();
        let tx = build_swap_transaction(
            &msg,
            TxContext {
                source_chain_id,
                amount: &amount,
                bech32_sender: self.accounts.bech32_address(source_chain_id),
                evm_sender: self.accounts.ethereum_hex_address(source_chain_id),
                simulator: self.simulator.clone(),
            },
        )?;

        crate::metrics::record_tx_built(tx.kind());
        info!(
            "Built {} transaction for {} {} -> {}",
            tx.kind(),
            amount,
            source_chain_id,
            self.out_chain_id
        );
        Ok(Some(tx))
    }

    /// Build the transaction, rejecting it when the quote dropped by 1% or
    /// more below `prior_out_amount`
    pub fn build_transaction(&self, prior_out_amount: Option<U256>) -> SwapResult<SwapTransaction> {
        let resource = self.resolve_resource().ok_or(SwapError::NotInitialized)?;
        let response = resource.response().ok_or(SwapError::NotFetched)?;

        if let Some(e) = resource.error() {
            return Err(SwapError::Fetch(e));
        }

        if let Some(prior) = prior_out_amount {
            check_price_drift(prior, response.route.amount_out)?;
        }

        self.tx_if_ready()?.ok_or(SwapError::TxNotReady)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::test_support::{registry, route_json, settings, transfer_msg};
    use crate::service::{
        ConfiguredSwapUsage, MockRouteServiceClient, RouteServiceClient, CHAINS_PATH,
        MSGS_DIRECT_PATH,
    };
    use crate::tx::{MockAccountManager, MockGasSimulator};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn assets_body(chain: &str, denoms: &[&str]) -> Value {
        let assets: Vec<_> = denoms
            .iter()
            .map(|denom| {
                json!({
                    "denom": denom,
                    "chain_id": chain,
                    "origin_denom": denom,
                    "origin_chain_id": chain,
                    "is_evm": false
                })
            })
            .collect();
        json!({ "chain_to_assets_map": { chain: { "assets": assets } } })
    }

    fn client(amount_out: &'static str, txs_required: u64, posts: Arc<AtomicUsize>) -> MockRouteServiceClient {
        let mut client = MockRouteServiceClient::new();
        client
            .expect_base_url()
            .return_const("https://route.example.com".to_string());
        client.expect_get().returning(|path| {
            if path == CHAINS_PATH {
                Ok(json!({ "chains": [] }))
            } else if path.contains("chain_id=osmosis-1") {
                Ok(assets_body("osmosis-1", &["uosmo", "uusdc"]))
            } else {
                Ok(assets_body("cosmoshub-4", &["uatom"]))
            }
        });
        client
            .expect_post()
            .withf(|path, _| path == MSGS_DIRECT_PATH)
            .returning(move |_, _| {
                posts.fetch_add(1, Ordering::SeqCst);
                Ok(json!({
                    "msgs": [transfer_msg(&["osmosis-1", "cosmoshub-4"])],
                    "route": route_json(amount_out, txs_required)
                }))
            });
        client
    }

    fn accounts(ready_calls: Arc<AtomicUsize>) -> MockAccountManager {
        let mut accounts = MockAccountManager::new();
        accounts
            .expect_bech32_address()
            .returning(|chain_id| match chain_identifier(chain_id).as_str() {
                "osmosis" => "osmo1sender".to_string(),
                "cosmoshub" => "cosmos1receiver".to_string(),
                _ => String::new(),
            });
        accounts
            .expect_ethereum_hex_address()
            .returning(|_| "0x00000000000000000000000000000000000000aa".to_string());
        accounts.expect_ensure_account_ready().returning(move |_| {
            ready_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        accounts
    }

    struct Fixture {
        config: SwapAmountConfig,
        posts: Arc<AtomicUsize>,
        ready_calls: Arc<AtomicUsize>,
    }

    fn fixture(amount_out: &'static str, txs_required: u64) -> Fixture {
        let settings = settings();
        let posts = Arc::new(AtomicUsize::new(0));
        let ready_calls = Arc::new(AtomicUsize::new(0));

        let queries = Arc::new(SwapQueries::new(
            &settings,
            Arc::new(client(amount_out, txs_required, posts.clone())),
            registry(),
            Arc::new(ConfiguredSwapUsage::from_settings(&settings)),
        ));
        let mut simulator = MockGasSimulator::new();
        simulator.expect_simulate_gas().never();

        let mut config = SwapAmountConfig::new(
            queries,
            Arc::new(accounts(ready_calls.clone())),
            Arc::new(simulator),
            &settings.swap,
            "osmosis-1",
            "cosmoshub-4",
            Currency::new("uatom", "ATOM", 6),
        );
        config.set_currency(Currency::new("uosmo", "OSMO", 6));

        Fixture {
            config,
            posts,
            ready_calls,
        }
    }

    #[test]
    fn test_price_drift_guard() {
        let prior = U256::from(1_000_000u64);
        assert!(matches!(
            check_price_drift(prior, U256::from(980_000u64)),
            Err(SwapError::PriceChanged { .. })
        ));
        // Exactly 1% is rejected
        assert!(check_price_drift(prior, U256::from(990_000u64)).is_err());
        assert!(check_price_drift(prior, U256::from(995_000u64)).is_ok());
        assert!(check_price_drift(prior, U256::from(1_200_000u64)).is_ok());
    }

    #[test]
    fn test_no_amount_is_not_ready() {
        let f = fixture("1000000", 1);

        assert!(f.config.resolve_resource().is_none());
        assert_eq!(f.config.state(), SwapState::NotReady);
        assert_eq!(f.config.swap_type(), SwapType::NotReady);
        assert_eq!(f.config.ui_properties().error, Some(SwapConfigError::EmptyAmount));
        assert!(matches!(
            f.config.build_transaction(None),
            Err(SwapError::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn test_zero_amount_issues_no_request() {
        let mut f = fixture("1000000", 1);
        f.config.set_value("0");

        f.config.fetch().await;

        assert_eq!(f.posts.load(Ordering::SeqCst), 0);
        let out = f.config.out_amount();
        assert!(out.is_zero());
        assert_eq!(out.currency().coin_denom, "ATOM");
        assert_eq!(f.config.ui_properties().error, Some(SwapConfigError::ZeroAmount));
        assert!(f.config.tx_if_ready().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ready_swap_builds_ibc_transfer() {
        let mut f = fixture("1000000", 1);
        f.config.set_value("1");

        assert!(matches!(
            f.config.build_transaction(None),
            Err(SwapError::NotFetched)
        ));

        f.config.fetch().await;

        assert_eq!(f.posts.load(Ordering::SeqCst), 1);
        assert!(f.config.ui_properties().is_ok());
        assert_eq!(f.config.state(), SwapState::Ready);
        assert_eq!(f.config.swap_type(), SwapType::Swap);
        assert_eq!(f.config.out_amount().to_decimal_string(), "1");
        assert_eq!(f.config.swap_price_impact(), Some(Decimal::new(12, 4)));
        assert_eq!(f.config.swap_fee().unwrap()[0].amount(), U256::from(1500u64));

        let tx = f.config.build_transaction(Some(U256::from(1_000_000u64))).unwrap();
        match tx {
            SwapTransaction::IbcTransfer(tx) => {
                assert_eq!(tx.chain_id, "osmosis-1");
                assert_eq!(tx.sender, "osmo1sender");
                assert_eq!(tx.amount, "1");
                assert_eq!(tx.currency.coin_minimal_denom, "uosmo");
                assert_eq!(tx.counterparty_chain_id, "cosmoshub-4");
                assert_eq!(tx.receiver, "cosmos1receiver");
                assert_eq!(tx.tx_type.as_str(), "ibc-swap");
            }
            other => panic!("unexpected tx {:?}", other),
        }
        // osmosis-1 (source and venue) and cosmoshub-4 (route)
        assert_eq!(f.ready_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_address_map() {
        let mut f = fixture("1000000", 1);
        f.config.set_value("1");

        let addresses = f.config.chain_ids_to_addresses();
        assert_eq!(addresses.len(), 2);
        assert_eq!(addresses["osmosis-1"], "osmo1sender");
        assert_eq!(addresses["cosmoshub-4"], "cosmos1receiver");

        f.config.set_chain("eip155:1");
        let addresses = f.config.chain_ids_to_addresses();
        assert_eq!(addresses["1"], "0x00000000000000000000000000000000000000aa");
        assert!(!addresses.contains_key("eip155:1"));
    }

    #[tokio::test]
    async fn test_multi_tx_route_is_rejected() {
        let mut f = fixture("1000000", 2);
        f.config.set_value("1");
        f.config.fetch().await;

        assert_eq!(
            f.config.ui_properties().error,
            Some(SwapConfigError::MultiTxRoute {
                txs_required: Some(2)
            })
        );
        assert!(matches!(f.config.state(), SwapState::Error(_)));
    }

    #[tokio::test]
    async fn test_same_currency_is_rejected() {
        let mut f = fixture("1000000", 1);
        f.config.set_value("1");
        f.config.set_out_chain_id("osmosis-1");
        f.config.set_out_currency(Currency::new("uosmo", "OSMO", 6));
        f.config.fetch().await;

        assert_eq!(f.config.ui_properties().error, Some(SwapConfigError::SameCurrency));
    }

    #[tokio::test]
    async fn test_unsupported_currencies() {
        let mut f = fixture("1000000", 1);
        f.config.set_value("1");
        f.config.set_currency(Currency::new("uusdc", "USDC", 6));
        f.config.fetch().await;
        assert_eq!(
            f.config.ui_properties().error,
            Some(SwapConfigError::UnsupportedSourceCurrency)
        );

        f.config.set_currency(Currency::new("uosmo", "OSMO", 6));
        f.config.set_out_currency(Currency::new("uusdc", "USDC", 6));
        f.config.fetch().await;
        assert_eq!(
            f.config.ui_properties().error,
            Some(SwapConfigError::UnsupportedDestinationCurrency)
        );
    }

    #[tokio::test]
    async fn test_price_drift_rejects_build() {
        let mut f = fixture("980000", 1);
        f.config.set_value("1");
        f.config.fetch().await;

        let prior = Some(U256::from(1_000_000u64));
        assert!(matches!(
            f.config.build_transaction(prior),
            Err(SwapError::PriceChanged { .. })
        ));
        // Rejected before any account is touched
        assert_eq!(f.ready_calls.load(Ordering::SeqCst), 0);

        let mut f = fixture("995000", 1);
        f.config.set_value("1");
        f.config.fetch().await;
        assert!(f.config.build_transaction(prior).is_ok());
    }

    #[tokio::test]
    async fn test_changing_amount_selects_new_resource() {
        let mut f = fixture("1000000", 1);
        f.config.set_value("1");
        let first = f.config.resolve_resource().unwrap();
        f.config.fetch().await;

        f.config.set_value("2");
        let second = f.config.resolve_resource().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(second.response().is_none());

        f.config.fetch().await;
        assert_eq!(f.posts.load(Ordering::SeqCst), 2);
        // The earlier quote stays cached under its own key
        assert!(first.response().is_some());

        f.config.set_value("1");
        assert!(Arc::ptr_eq(&first, &f.config.resolve_resource().unwrap()));
    }

    #[tokio::test]
    async fn test_unfetched_quote_is_not_ready() {
        let mut f = fixture("1000000", 1);
        f.config.set_value("1");

        let ui = f.config.ui_properties();
        assert!(ui.error.is_none());
        assert_eq!(ui.loading_state, Some(LoadingState::LoadingBlock));
        assert_eq!(f.config.state(), SwapState::NotReady);
        assert!(f.config.tx_if_ready().unwrap().is_none());
        assert_eq!(f.posts.load(Ordering::SeqCst), 0);

        f.config.fetch().await;
        assert_eq!(f.config.state(), SwapState::Ready);

        // Asset lists are cached, the quote for the new amount is not
        f.config.set_value("2");
        assert!(f.config.ui_properties().error.is_none());
        assert_eq!(f.config.state(), SwapState::NotReady);
    }

    /// Route service whose first msgs_direct request waits for `release`
    struct HeldClient {
        release: Mutex<Option<oneshot::Receiver<()>>>,
        posts: AtomicUsize,
    }

    #[async_trait]
    impl RouteServiceClient for HeldClient {
        fn base_url(&self) -> String {
            "https://route.example.com".to_string()
        }

        async fn get(&self, path: &str) -> SwapResult<Value> {
            if path == CHAINS_PATH {
                Ok(json!({ "chains": [] }))
            } else if path.contains("chain_id=osmosis-1") {
                Ok(assets_body("osmosis-1", &["uosmo"]))
            } else {
                Ok(assets_body("cosmoshub-4", &["uatom"]))
            }
        }

        async fn post(&self, _path: &str, _body: Value) -> SwapResult<Value> {
            self.posts.fetch_add(1, Ordering::SeqCst);
            let release = self.release.lock().unwrap().take();
            if let Some(release) = release {
                let _ = release.await;
            }
            Ok(json!({
                "msgs": [transfer_msg(&["osmosis-1", "cosmoshub-4"])],
                "route": route_json("1000000", 1)
            }))
        }
    }

    #[tokio::test]
    async fn test_new_amount_aborts_pending_quote() {
        let settings = settings();
        let (release, held) = oneshot::channel();
        let client = Arc::new(HeldClient {
            release: Mutex::new(Some(held)),
            posts: AtomicUsize::new(0),
        });
        let queries = Arc::new(SwapQueries::new(
            &settings,
            client.clone(),
            registry(),
            Arc::new(ConfiguredSwapUsage::from_settings(&settings)),
        ));
        let mut config = SwapAmountConfig::new(
            queries,
            Arc::new(accounts(Arc::new(AtomicUsize::new(0)))),
            Arc::new(MockGasSimulator::new()),
            &settings.swap,
            "osmosis-1",
            "cosmoshub-4",
            Currency::new("uatom", "ATOM", 6),
        );
        config.set_currency(Currency::new("uosmo", "OSMO", 6));
        config.set_value("1");

        let first = config.resolve_resource().unwrap();
        let timed_out = tokio::time::timeout(Duration::from_millis(50), config.fetch()).await;
        assert!(timed_out.is_err());
        assert!(first.is_fetching());
        assert_eq!(config.state(), SwapState::Loading);

        // Keep the first request driven while the selection moves on
        let driver = tokio::spawn({
            let first = first.clone();
            async move { first.fetch().await }
        });

        config.set_value("2");
        let second = config.resolve_resource().unwrap();
        config.fetch().await;

        let _ = release.send(());
        driver.await.unwrap();

        assert!(!first.is_fetching());
        assert!(first.response().is_none());
        assert!(first.error().is_none());
        assert!(second.response().is_some());
        assert_eq!(client.posts.load(Ordering::SeqCst), 2);
        assert_eq!(config.state(), SwapState::Ready);

        // The abandoned quote was evicted, going back builds a fresh one
        config.set_value("1");
        let again = config.resolve_resource().unwrap();
        assert!(!Arc::ptr_eq(&first, &again));
        assert!(again.response().is_none());
    }

    #[tokio::test]
    async fn test_resource_error_is_reported() {
        let settings = settings();
        let mut client = MockRouteServiceClient::new();
        client
            .expect_base_url()
            .return_const("https://route.example.com".to_string());
        client
            .expect_get()
            .returning(|_| Ok(json!({ "chains": [], "chain_to_assets_map": {} })));
        client.expect_post().returning(|path, _| {
            Err(SwapError::RouteService {
                path: path.to_string(),
                status: 400,
                message: "no route found".to_string(),
            })
        });

        let queries = Arc::new(SwapQueries::new(
            &settings,
            Arc::new(client),
            registry(),
            Arc::new(ConfiguredSwapUsage::from_settings(&settings)),
        ));
        let mut config = SwapAmountConfig::new(
            queries,
            Arc::new(accounts(Arc::new(AtomicUsize::new(0)))),
            Arc::new(MockGasSimulator::new()),
            &settings.swap,
            "osmosis-1",
            "cosmoshub-4",
            Currency::new("uatom", "ATOM", 6),
        );
        config.set_currency(Currency::new("uosmo", "OSMO", 6));
        config.set_value("1");
        config.fetch().await;

        match config.ui_properties().error {
            Some(SwapConfigError::RouteService(message)) => {
                assert!(message.contains("no route found"))
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(matches!(
            config.build_transaction(None),
            Err(SwapError::NotFetched)
        ));
    }
}
