//! Response validation for the route service.
//!
//! Each validator walks the raw JSON, rejecting missing required fields and
//! wrong primitive types with the offending path. Unknown fields are ignored
//! and `null` optional fields are treated as absent.

use super::types::*;
use crate::error::{SwapError, SwapResult};

use ethers::types::U256;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::warn;

pub fn validate_chains_response(value: &Value) -> SwapResult<ChainsResponse> {
    report("chains", parse_chains(value))
}

pub fn validate_assets_response(value: &Value) -> SwapResult<AssetsResponse> {
    report("assets", parse_assets(value))
}

pub fn validate_route_response(value: &Value) -> SwapResult<RouteResponse> {
    report("route", ObjectView::root(value, "route").and_then(|v| parse_route(&v)))
}

pub fn validate_msgs_direct_response(value: &Value) -> SwapResult<MsgsDirectResponse> {
    report("msgs_direct", parse_msgs_direct(value))
}

fn report<T>(resource: &str, result: SwapResult<T>) -> SwapResult<T> {
    if let Err(e) = &result {
        warn!("Failed to validate {} response: {}", resource, e);
        crate::metrics::record_schema_validation_failure(resource);
    }
    result
}

fn invalid(path: String, expected: &str) -> SwapError {
    SwapError::SchemaValidation {
        path,
        expected: expected.to_string(),
    }
}

/// Typed field access on a JSON object, tracking the path for errors
struct ObjectView<'a> {
    path: String,
    map: &'a Map<String, Value>,
}

impl<'a> ObjectView<'a> {
    fn root(value: &'a Value, path: &str) -> SwapResult<Self> {
        match value {
            Value::Object(map) => Ok(Self {
                path: path.to_string(),
                map,
            }),
            _ => Err(invalid(path.to_string(), "object")),
        }
    }

    fn field_path(&self, field: &str) -> String {
        if self.path.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", self.path, field)
        }
    }

    /// Field value, with `null` treated as absent
    fn get(&self, field: &str) -> Option<&'a Value> {
        self.map.get(field).filter(|v| !v.is_null())
    }

    fn has(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    fn optional_str(&self, field: &str) -> SwapResult<Option<String>> {
        match self.get(field) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(invalid(self.field_path(field), "string")),
        }
    }

    fn required_str(&self, field: &str) -> SwapResult<String> {
        self.optional_str(field)?
            .ok_or_else(|| invalid(self.field_path(field), "string"))
    }

    fn optional_bool(&self, field: &str) -> SwapResult<Option<bool>> {
        match self.get(field) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(_) => Err(invalid(self.field_path(field), "boolean")),
        }
    }

    fn required_bool(&self, field: &str) -> SwapResult<bool> {
        self.optional_bool(field)?
            .ok_or_else(|| invalid(self.field_path(field), "boolean"))
    }

    /// Non-negative integral number; `1.0` is accepted, `1.5` is not
    fn required_u64(&self, field: &str) -> SwapResult<u64> {
        let value = self
            .get(field)
            .ok_or_else(|| invalid(self.field_path(field), "integer"))?;

        if let Some(n) = value.as_u64() {
            return Ok(n);
        }
        match value.as_f64() {
            Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => Ok(f as u64),
            _ => Err(invalid(self.field_path(field), "integer")),
        }
    }

    /// Base-unit amount encoded as a decimal integer string
    fn required_amount(&self, field: &str) -> SwapResult<U256> {
        let raw = self.required_str(field)?;
        U256::from_dec_str(&raw).map_err(|_| invalid(self.field_path(field), "integer string"))
    }

    fn optional_decimal(&self, field: &str) -> SwapResult<Option<Decimal>> {
        match self.optional_str(field)? {
            None => Ok(None),
            Some(raw) => Decimal::from_str(&raw)
                .map(Some)
                .map_err(|_| invalid(self.field_path(field), "decimal string")),
        }
    }

    fn optional_object(&self, field: &str) -> SwapResult<Option<ObjectView<'a>>> {
        match self.get(field) {
            None => Ok(None),
            Some(value) => ObjectView::root(value, &self.field_path(field)).map(Some),
        }
    }

    fn required_object(&self, field: &str) -> SwapResult<ObjectView<'a>> {
        self.optional_object(field)?
            .ok_or_else(|| invalid(self.field_path(field), "object"))
    }

    fn optional_array(&self, field: &str) -> SwapResult<Option<&'a Vec<Value>>> {
        match self.get(field) {
            None => Ok(None),
            Some(Value::Array(items)) => Ok(Some(items)),
            Some(_) => Err(invalid(self.field_path(field), "array")),
        }
    }

    fn required_array(&self, field: &str) -> SwapResult<&'a Vec<Value>> {
        self.optional_array(field)?
            .ok_or_else(|| invalid(self.field_path(field), "array"))
    }

    /// Objects of an array, each with its indexed path
    fn objects(&self, field: &str, items: &'a [Value]) -> SwapResult<Vec<ObjectView<'a>>> {
        items
            .iter()
            .enumerate()
            .map(|(i, item)| ObjectView::root(item, &format!("{}[{}]", self.field_path(field), i)))
            .collect()
    }

    fn strings(&self, field: &str, items: &[Value]) -> SwapResult<Vec<String>> {
        items
            .iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::String(s) => Ok(s.clone()),
                _ => Err(invalid(
                    format!("{}[{}]", self.field_path(field), i),
                    "string",
                )),
            })
            .collect()
    }

    fn required_strings(&self, field: &str) -> SwapResult<Vec<String>> {
        let items = self.required_array(field)?;
        self.strings(field, items)
    }

    fn optional_strings(&self, field: &str) -> SwapResult<Vec<String>> {
        match self.optional_array(field)? {
            Some(items) => self.strings(field, items),
            None => Ok(Vec::new()),
        }
    }
}

fn parse_chains(value: &Value) -> SwapResult<ChainsResponse> {
    let root = ObjectView::root(value, "")?;
    let items = root.required_array("chains")?;

    let chains = root
        .objects("chains", items)?
        .iter()
        .map(|chain| {
            Ok(ChainEntry {
                chain_id: chain.required_str("chain_id")?,
                pfm_enabled: chain.optional_bool("pfm_enabled")?.unwrap_or(false),
                supports_memo: chain.optional_bool("supports_memo")?,
            })
        })
        .collect::<SwapResult<Vec<_>>>()?;

    Ok(ChainsResponse { chains })
}

fn parse_assets(value: &Value) -> SwapResult<AssetsResponse> {
    let root = ObjectView::root(value, "")?;
    let Some(map) = root.optional_object("chain_to_assets_map")? else {
        return Ok(AssetsResponse::default());
    };

    let mut chain_to_assets_map = BTreeMap::new();
    for chain_id in map.map.keys() {
        let Some(entry) = map.optional_object(chain_id)? else {
            continue;
        };

        let assets = match entry.optional_array("assets")? {
            Some(items) => entry
                .objects("assets", items)?
                .iter()
                .map(parse_asset)
                .collect::<SwapResult<Vec<_>>>()?,
            None => Vec::new(),
        };
        chain_to_assets_map.insert(chain_id.clone(), ChainAssets { assets });
    }

    Ok(AssetsResponse {
        chain_to_assets_map: Some(chain_to_assets_map),
    })
}

fn parse_asset(asset: &ObjectView<'_>) -> SwapResult<AssetRecord> {
    Ok(AssetRecord {
        denom: asset.required_str("denom")?,
        chain_id: asset.required_str("chain_id")?,
        origin_denom: asset.required_str("origin_denom")?,
        origin_chain_id: asset.required_str("origin_chain_id")?,
        is_evm: asset.required_bool("is_evm")?,
        token_contract: asset.optional_str("token_contract")?,
    })
}

fn parse_route(route: &ObjectView<'_>) -> SwapResult<RouteResponse> {
    let operations = route.required_array("operations")?;
    let operations = route
        .objects("operations", operations)?
        .iter()
        .map(parse_operation)
        .collect::<SwapResult<Vec<_>>>()?;

    Ok(RouteResponse {
        source_asset_denom: route.required_str("source_asset_denom")?,
        source_asset_chain_id: route.required_str("source_asset_chain_id")?,
        dest_asset_denom: route.required_str("dest_asset_denom")?,
        dest_asset_chain_id: route.required_str("dest_asset_chain_id")?,
        amount_in: route.required_amount("amount_in")?,
        amount_out: route.required_amount("amount_out")?,
        operations,
        chain_ids: route.required_strings("chain_ids")?,
        does_swap: route.optional_bool("does_swap")?,
        estimated_amount_out: route.optional_str("estimated_amount_out")?,
        swap_venue: route.optional_object("swap_venue")?.map(|v| parse_venue(&v)).transpose()?,
        swap_price_impact_percent: route.optional_decimal("swap_price_impact_percent")?,
        txs_required: route.required_u64("txs_required")?,
    })
}

const OPERATION_VARIANTS: &str =
    "one of transfer, swap, axelar_transfer, cctp_transfer, evm_swap";

fn parse_operation(op: &ObjectView<'_>) -> SwapResult<Operation> {
    if let Some(transfer) = op.optional_object("transfer")? {
        return Ok(Operation::Transfer(TransferOperation {
            port: transfer.required_str("port")?,
            channel: transfer.required_str("channel")?,
            chain_id: transfer.required_str("chain_id")?,
            pfm_enabled: transfer.optional_bool("pfm_enabled")?,
            dest_denom: transfer.required_str("dest_denom")?,
            supports_memo: transfer.optional_bool("supports_memo")?,
        }));
    }

    if let Some(swap) = op.optional_object("swap")? {
        let swap_in = swap
            .optional_object("swap_in")?
            .map(|leg| parse_swap_leg(&leg, true))
            .transpose()?;
        let swap_out = swap
            .optional_object("swap_out")?
            .map(|leg| parse_swap_leg(&leg, false))
            .transpose()?;
        if swap_in.is_none() && swap_out.is_none() {
            return Err(invalid(swap.field_path("swap_in"), "object"));
        }

        return Ok(Operation::Swap(SwapOperation {
            swap_in,
            swap_out,
            estimated_affiliate_fee: swap.required_str("estimated_affiliate_fee")?,
        }));
    }

    if let Some(axelar) = op.optional_object("axelar_transfer")? {
        return Ok(Operation::AxelarTransfer(AxelarTransferOperation {
            asset: axelar.optional_str("asset")?,
            bridge_id: axelar.optional_str("bridge_id")?,
            denom_in: axelar.optional_str("denom_in")?,
            denom_out: axelar.optional_str("denom_out")?,
            from_chain_id: axelar.optional_str("from_chain_id")?,
            to_chain_id: axelar.optional_str("to_chain_id")?,
            fee_amount: axelar.optional_str("fee_amount")?,
        }));
    }

    if let Some(cctp) = op.optional_object("cctp_transfer")? {
        return Ok(Operation::CctpTransfer(CctpTransferOperation {
            bridge_id: cctp.required_str("bridge_id")?,
            denom_in: cctp.required_str("denom_in")?,
            denom_out: cctp.required_str("denom_out")?,
            from_chain_id: cctp.required_str("from_chain_id")?,
            to_chain_id: cctp.required_str("to_chain_id")?,
        }));
    }

    if let Some(evm_swap) = op.optional_object("evm_swap")? {
        return Ok(Operation::EvmSwap(EvmSwapOperation {
            amount_in: evm_swap.optional_str("amount_in")?,
            amount_out: evm_swap.optional_str("amount_out")?,
            denom_in: evm_swap.optional_str("denom_in")?,
            denom_out: evm_swap.optional_str("denom_out")?,
            from_chain_id: evm_swap.optional_str("from_chain_id")?,
        }));
    }

    Err(invalid(op.path.clone(), OPERATION_VARIANTS))
}

fn parse_swap_leg(leg: &ObjectView<'_>, is_swap_in: bool) -> SwapResult<SwapLeg> {
    let venue = leg.required_object("swap_venue")?;
    let pools = leg.required_array("swap_operations")?;
    let swap_operations = leg
        .objects("swap_operations", pools)?
        .iter()
        .map(|pool| {
            Ok(PoolSwap {
                pool: pool.required_str("pool")?,
                denom_in: pool.required_str("denom_in")?,
                denom_out: pool.required_str("denom_out")?,
            })
        })
        .collect::<SwapResult<Vec<_>>>()?;

    let swap_amount_in = if is_swap_in {
        Some(leg.required_str("swap_amount_in")?)
    } else {
        leg.optional_str("swap_amount_in")?
    };

    Ok(SwapLeg {
        swap_venue: parse_venue(&venue)?,
        swap_operations,
        swap_amount_in,
        swap_amount_out: leg.optional_str("swap_amount_out")?,
        price_impact_percent: leg.optional_str("price_impact_percent")?,
    })
}

fn parse_venue(venue: &ObjectView<'_>) -> SwapResult<SwapVenue> {
    Ok(SwapVenue {
        name: venue.required_str("name")?,
        chain_id: venue.required_str("chain_id")?,
    })
}

fn parse_msgs_direct(value: &Value) -> SwapResult<MsgsDirectResponse> {
    let root = ObjectView::root(value, "")?;
    let items = root.required_array("msgs")?;
    let msgs = root
        .objects("msgs", items)?
        .iter()
        .map(parse_direct_msg)
        .collect::<SwapResult<Vec<_>>>()?;

    let route = parse_route(&root.required_object("route")?)?;

    Ok(MsgsDirectResponse { msgs, route })
}

fn parse_direct_msg(msg: &ObjectView<'_>) -> SwapResult<DirectMsg> {
    if let Some(evm_tx) = msg.optional_object("evm_tx")? {
        return Ok(DirectMsg::EvmTx(EvmTx {
            chain_id: evm_tx.required_str("chain_id")?,
            data: evm_tx.required_str("data")?,
            required_erc20_approvals: evm_tx.optional_strings("required_erc20_approvals")?,
            signer_address: evm_tx.required_str("signer_address")?,
            to: evm_tx.required_str("to")?,
            value: evm_tx.required_str("value")?,
        }));
    }

    // Wrapped in `multi_chain_msg`, or the same fields at the top level
    let cosmos = match msg.optional_object("multi_chain_msg")? {
        Some(inner) => inner,
        None if msg.has("msg_type_url") || msg.has("chain_id") => ObjectView {
            path: msg.path.clone(),
            map: msg.map,
        },
        None => return Err(invalid(msg.path.clone(), "one of multi_chain_msg, evm_tx")),
    };

    Ok(DirectMsg::MultiChain(MultiChainMsg {
        chain_id: cosmos.required_str("chain_id")?,
        path: cosmos.required_strings("path")?,
        msg: cosmos.required_str("msg")?,
        msg_type_url: cosmos.required_str("msg_type_url")?,
    }))
}
