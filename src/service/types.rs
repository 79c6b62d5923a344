//! Validated route service response types

use crate::config::SwapVenueConfig;

use ethers::types::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Exchange used for an in-route swap hop
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SwapVenue {
    pub name: String,
    pub chain_id: String,
}

impl From<&SwapVenueConfig> for SwapVenue {
    fn from(config: &SwapVenueConfig) -> Self {
        Self {
            name: config.name.clone(),
            chain_id: config.chain_id.clone(),
        }
    }
}

/// `GET /v1/info/chains`
#[derive(Debug, Clone, PartialEq)]
pub struct ChainsResponse {
    pub chains: Vec<ChainEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChainEntry {
    /// Canonical chain id once normalized by the chains resource
    pub chain_id: String,
    pub pfm_enabled: bool,
    pub supports_memo: Option<bool>,
}

/// `GET /v2/fungible/assets`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AssetsResponse {
    /// Keyed by route service chain id
    pub chain_to_assets_map: Option<BTreeMap<String, ChainAssets>>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChainAssets {
    pub assets: Vec<AssetRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetRecord {
    pub denom: String,
    pub chain_id: String,
    pub origin_denom: String,
    pub origin_chain_id: String,
    pub is_evm: bool,
    pub token_contract: Option<String>,
}

/// Route quote, returned by `/v2/fungible/route` and embedded in msgs_direct responses
#[derive(Debug, Clone, PartialEq)]
pub struct RouteResponse {
    pub source_asset_denom: String,
    pub source_asset_chain_id: String,
    pub dest_asset_denom: String,
    pub dest_asset_chain_id: String,
    pub amount_in: U256,
    pub amount_out: U256,
    pub operations: Vec<Operation>,
    pub chain_ids: Vec<String>,
    pub does_swap: Option<bool>,
    pub estimated_amount_out: Option<String>,
    pub swap_venue: Option<SwapVenue>,
    pub swap_price_impact_percent: Option<Decimal>,
    pub txs_required: u64,
}

impl RouteResponse {
    /// Swap hops in route order
    pub fn swaps(&self) -> impl Iterator<Item = &SwapOperation> {
        self.operations.iter().filter_map(|op| match op {
            Operation::Swap(swap) => Some(swap),
            _ => None,
        })
    }

    /// A route is a plain transfer only when the service says so
    pub fn is_transfer_only(&self) -> bool {
        self.does_swap == Some(false)
    }
}

/// One hop of a route
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Transfer(TransferOperation),
    Swap(SwapOperation),
    AxelarTransfer(AxelarTransferOperation),
    CctpTransfer(CctpTransferOperation),
    EvmSwap(EvmSwapOperation),
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Transfer(_) => "transfer",
            Operation::Swap(_) => "swap",
            Operation::AxelarTransfer(_) => "axelar_transfer",
            Operation::CctpTransfer(_) => "cctp_transfer",
            Operation::EvmSwap(_) => "evm_swap",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransferOperation {
    pub port: String,
    pub channel: String,
    pub chain_id: String,
    pub pfm_enabled: Option<bool>,
    pub dest_denom: String,
    pub supports_memo: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwapOperation {
    pub swap_in: Option<SwapLeg>,
    pub swap_out: Option<SwapLeg>,
    pub estimated_affiliate_fee: String,
}

impl SwapOperation {
    /// Venue executing this hop
    pub fn venue(&self) -> Option<&SwapVenue> {
        self.swap_in
            .as_ref()
            .or(self.swap_out.as_ref())
            .map(|leg| &leg.swap_venue)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwapLeg {
    pub swap_venue: SwapVenue,
    pub swap_operations: Vec<PoolSwap>,
    pub swap_amount_in: Option<String>,
    pub swap_amount_out: Option<String>,
    pub price_impact_percent: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PoolSwap {
    pub pool: String,
    pub denom_in: String,
    pub denom_out: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AxelarTransferOperation {
    pub asset: Option<String>,
    pub bridge_id: Option<String>,
    pub denom_in: Option<String>,
    pub denom_out: Option<String>,
    pub from_chain_id: Option<String>,
    pub to_chain_id: Option<String>,
    pub fee_amount: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CctpTransferOperation {
    pub bridge_id: String,
    pub denom_in: String,
    pub denom_out: String,
    pub from_chain_id: String,
    pub to_chain_id: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EvmSwapOperation {
    pub amount_in: Option<String>,
    pub amount_out: Option<String>,
    pub denom_in: Option<String>,
    pub denom_out: Option<String>,
    pub from_chain_id: Option<String>,
}

/// `POST /v2/fungible/msgs_direct`
#[derive(Debug, Clone, PartialEq)]
pub struct MsgsDirectResponse {
    pub msgs: Vec<DirectMsg>,
    pub route: RouteResponse,
}

/// A message as returned by the route service
#[derive(Debug, Clone, PartialEq)]
pub enum DirectMsg {
    MultiChain(MultiChainMsg),
    EvmTx(EvmTx),
}

/// Cosmos message with its JSON-encoded body
#[derive(Debug, Clone, PartialEq)]
pub struct MultiChainMsg {
    pub chain_id: String,
    /// Chains the packet travels through, source first
    pub path: Vec<String>,
    pub msg: String,
    pub msg_type_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvmTx {
    /// Bare numeric EVM chain id
    pub chain_id: String,
    pub data: String,
    pub required_erc20_approvals: Vec<String>,
    pub signer_address: String,
    pub to: String,
    /// Decimal wei
    pub value: String,
}
