//! Executable messages for a quoted swap

use super::client::RouteServiceClient;
use super::route::{self, service_denom, RoutingOptions, SmartSwapOptions};
use super::schema::validate_msgs_direct_response;
use super::types::{DirectMsg, MsgsDirectResponse, SwapVenue};
use crate::chain::{ChainIdNormalizer, ChainRegistry, CoinPretty};
use crate::error::{SwapError, SwapResult};
use crate::query::{ObservableQuery, QueryKey, QueryMap};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

pub const MSGS_DIRECT_PATH: &str = "/v2/fungible/msgs_direct";

pub const MSG_TRANSFER_TYPE_URL: &str = "/ibc.applications.transfer.v1.MsgTransfer";
pub const MSG_EXECUTE_CONTRACT_TYPE_URL: &str = "/cosmwasm.wasm.v1.MsgExecuteContract";

/// The single message needed to execute a swap
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutableMessage {
    NativeTransfer {
        receiver: String,
        source_port: String,
        source_channel: String,
        counterparty_chain_id: String,
        /// Nanoseconds since the epoch
        timeout_timestamp: Option<u64>,
        memo: String,
        token: CoinPretty,
    },
    ContractExecution {
        contract: String,
        funds: Vec<CoinPretty>,
        payload: Value,
    },
    EvmTransaction {
        /// Bare numeric EVM chain id
        chain_id: String,
        to: String,
        /// Decimal wei
        value: String,
        /// Hex calldata
        data: String,
    },
}

/// What executing the route does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SwapType {
    Swap,
    Transfer,
    NotReady,
}

#[derive(Debug, Deserialize)]
struct CoinBody {
    denom: String,
    amount: String,
}

#[derive(Debug, Deserialize)]
struct MsgTransferBody {
    receiver: String,
    source_port: String,
    source_channel: String,
    token: CoinBody,
    #[serde(default)]
    timeout_timestamp: Option<Value>,
    #[serde(default)]
    memo: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MsgExecuteContractBody {
    contract: String,
    #[serde(default)]
    funds: Vec<CoinBody>,
    msg: Value,
}

/// Cosmos encodes u64 as a string; accept both
fn timeout_nanos(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Everything that affects the messages for a swap
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MsgsDirectParams {
    pub amount_in_denom: String,
    pub amount_in_amount: String,
    pub source_asset_chain_id: String,
    pub dest_asset_denom: String,
    pub dest_asset_chain_id: String,
    /// Sorted, so the cache key does not depend on insertion order
    pub chain_ids_to_addresses: BTreeMap<String, String>,
    pub slippage_tolerance_percent: f64,
    pub affiliate_fee_bps: u32,
    pub affiliate_fee_receiver: String,
    pub swap_venue: SwapVenue,
}

#[derive(Serialize)]
struct Affiliate {
    basis_points_fee: String,
    address: String,
}

#[derive(Serialize)]
struct MsgsDirectRequest {
    source_asset_denom: String,
    source_asset_chain_id: String,
    dest_asset_denom: String,
    dest_asset_chain_id: String,
    amount_in: String,
    chain_ids_to_addresses: BTreeMap<String, String>,
    slippage_tolerance_percent: String,
    affiliates: Vec<Affiliate>,
    #[serde(flatten)]
    routing: RoutingOptions,
}

/// Direct messages for one parameter set
pub struct MsgsDirectQuery {
    params: MsgsDirectParams,
    query: Arc<ObservableQuery<MsgsDirectResponse>>,
    client: Arc<dyn RouteServiceClient>,
    normalizer: ChainIdNormalizer,
    registry: Arc<ChainRegistry>,
}

impl MsgsDirectQuery {
    pub fn new(
        params: MsgsDirectParams,
        client: Arc<dyn RouteServiceClient>,
        normalizer: ChainIdNormalizer,
        registry: Arc<ChainRegistry>,
    ) -> Self {
        let key = format!(
            "{}{}-{}",
            client.base_url(),
            MSGS_DIRECT_PATH,
            params.cache_key()
        );
        Self {
            params,
            query: Arc::new(ObservableQuery::new("msgs_direct", key)),
            client,
            normalizer,
            registry,
        }
    }

    pub fn params(&self) -> &MsgsDirectParams {
        &self.params
    }

    pub fn query(&self) -> &Arc<ObservableQuery<MsgsDirectResponse>> {
        &self.query
    }

    pub fn response(&self) -> Option<Arc<MsgsDirectResponse>> {
        self.query.response()
    }

    pub fn error(&self) -> Option<Arc<SwapError>> {
        self.query.error()
    }

    pub fn is_fetching(&self) -> bool {
        self.query.is_fetching()
    }

    pub fn can_fetch(&self) -> bool {
        !self.params.amount_in_amount.is_empty() && self.params.amount_in_amount != "0"
    }

    pub(crate) fn request_body(&self) -> SwapResult<Value> {
        let p = &self.params;
        let source_evm = self.normalizer.is_evm_only(&p.source_asset_chain_id);
        let dest_evm = self.normalizer.is_evm_only(&p.dest_asset_chain_id);

        let routing = if source_evm || dest_evm {
            RoutingOptions::Evm {
                allow_unsafe: None,
                allow_multi_tx: None,
                experimental_features: None,
                smart_relay: None,
                smart_swap_options: SmartSwapOptions {
                    split_routes: None,
                    evm_swaps: true,
                },
            }
        } else {
            RoutingOptions::Venue {
                swap_venue: p.swap_venue.clone(),
            }
        };

        let affiliates = if p.affiliate_fee_bps > 0 {
            vec![Affiliate {
                basis_points_fee: p.affiliate_fee_bps.to_string(),
                address: p.affiliate_fee_receiver.clone(),
            }]
        } else {
            Vec::new()
        };

        let request = MsgsDirectRequest {
            source_asset_denom: service_denom(&p.amount_in_denom),
            source_asset_chain_id: self.normalizer.to_service_id(&p.source_asset_chain_id),
            dest_asset_denom: service_denom(&p.dest_asset_denom),
            dest_asset_chain_id: self.normalizer.to_service_id(&p.dest_asset_chain_id),
            amount_in: p.amount_in_amount.clone(),
            chain_ids_to_addresses: p.chain_ids_to_addresses.clone(),
            slippage_tolerance_percent: p.slippage_tolerance_percent.to_string(),
            affiliates,
            routing,
        };

        serde_json::to_value(&request).map_err(|e| SwapError::Internal(e.to_string()))
    }

    pub async fn fetch(&self) {
        if !self.can_fetch() {
            debug!("Skipping msgs_direct fetch for {}", self.query.key());
            crate::metrics::record_fetch_skipped("msgs_direct");
            return;
        }

        let client = self.client.clone();
        let body = self.request_body();

        self.query
            .fetch_with(move || async move {
                let value = client.post(MSGS_DIRECT_PATH, body?).await?;
                validate_msgs_direct_response(&value)
            })
            .await
    }

    /// Cancel the in-flight fetch; its result will not be stored
    pub fn abort(&self) -> bool {
        self.query.abort()
    }

    /// The executable message, when exactly one computable message was returned
    pub fn msg(&self) -> Option<ExecutableMessage> {
        let response = self.query.response()?;
        match response.msgs.as_slice() {
            [msg] => self.to_executable(msg),
            _ => None,
        }
    }

    /// As [`msg`](Self::msg), with the reason when no message is available
    pub fn msg_or_err(&self) -> SwapResult<ExecutableMessage> {
        let response = self.query.response().ok_or(SwapError::ResponseNotFetched)?;

        match response.msgs.len() {
            0 => Err(SwapError::EmptyMessages),
            1 => self.msg().ok_or(SwapError::MessageNotComputable),
            count => Err(SwapError::TooManyMessages { count }),
        }
    }

    fn to_executable(&self, msg: &DirectMsg) -> Option<ExecutableMessage> {
        match msg {
            DirectMsg::EvmTx(tx) => Some(ExecutableMessage::EvmTransaction {
                chain_id: tx.chain_id.clone(),
                to: tx.to.clone(),
                value: tx.value.clone(),
                data: tx.data.clone(),
            }),
            DirectMsg::MultiChain(msg) => match msg.msg_type_url.as_str() {
                MSG_EXECUTE_CONTRACT_TYPE_URL => {
                    let body: MsgExecuteContractBody = parse_body(&msg.msg)?;
                    let funds = body
                        .funds
                        .iter()
                        .map(|fund| {
                            CoinPretty::from_base_units(
                                self.registry.force_find_currency(&msg.chain_id, &fund.denom),
                                &fund.amount,
                            )
                        })
                        .collect::<Option<Vec<_>>>()?;

                    Some(ExecutableMessage::ContractExecution {
                        contract: body.contract,
                        funds,
                        payload: body.msg,
                    })
                }
                MSG_TRANSFER_TYPE_URL => {
                    let counterparty_chain_id = msg.path.get(1)?.clone();
                    let body: MsgTransferBody = parse_body(&msg.msg)?;
                    let token = CoinPretty::from_base_units(
                        self.registry
                            .force_find_currency(&msg.chain_id, &body.token.denom),
                        &body.token.amount,
                    )?;

                    Some(ExecutableMessage::NativeTransfer {
                        receiver: body.receiver,
                        source_port: body.source_port,
                        source_channel: body.source_channel,
                        counterparty_chain_id,
                        timeout_timestamp: timeout_nanos(body.timeout_timestamp.as_ref()),
                        memo: body.memo.unwrap_or_default(),
                        token,
                    })
                }
                other => {
                    debug!("Unsupported message type {}", other);
                    None
                }
            },
        }
    }

    pub fn out_amount(&self) -> CoinPretty {
        let response = self.query.response();
        route::out_amount(
            &self.registry,
            &self.params.dest_asset_chain_id,
            &self.params.dest_asset_denom,
            response.as_ref().map(|r| &r.route),
        )
    }

    pub fn swap_fee(&self) -> SwapResult<Vec<CoinPretty>> {
        let response = self.query.response();
        route::swap_fee(
            &self.registry,
            &self.params.dest_asset_chain_id,
            &self.params.dest_asset_denom,
            response.as_ref().map(|r| &r.route),
        )
    }

    pub fn swap_price_impact(&self) -> Option<Decimal> {
        let response = self.query.response();
        route::swap_price_impact(response.as_ref().map(|r| &r.route))
    }

    pub fn route_type(&self) -> SwapType {
        match self.query.response() {
            None => SwapType::NotReady,
            Some(response) if response.route.is_transfer_only() => SwapType::Transfer,
            Some(_) => SwapType::Swap,
        }
    }

    pub fn txs_required(&self) -> Option<u64> {
        self.query.response().map(|r| r.route.txs_required)
    }
}

fn parse_body<T: for<'de> Deserialize<'de>>(raw: &str) -> Option<T> {
    match serde_json::from_str(raw) {
        Ok(body) => Some(body),
        Err(e) => {
            warn!("Failed to parse message body: {}", e);
            None
        }
    }
}

/// Msgs-direct queries keyed by their parameters
pub type MsgsDirectStore = QueryMap<MsgsDirectParams, MsgsDirectQuery>;

pub fn msgs_direct_store(
    client: Arc<dyn RouteServiceClient>,
    normalizer: ChainIdNormalizer,
    registry: Arc<ChainRegistry>,
) -> MsgsDirectStore {
    QueryMap::new("msgs_direct", move |params: &MsgsDirectParams| {
        MsgsDirectQuery::new(
            params.clone(),
            client.clone(),
            normalizer.clone(),
            registry.clone(),
        )
    })
}
