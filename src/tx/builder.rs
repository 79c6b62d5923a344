//! Transaction artifacts produced from a route service message

use super::gas::{GasEstimator, GasSimulation, GasSimulator};
use crate::chain::{Coin, CoinPretty, Currency};
use crate::error::{SwapError, SwapResult};
use crate::service::ExecutableMessage;

use ethers::types::U256;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Display classification attached to built transactions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TxType {
    IbcSwap,
}

impl TxType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxType::IbcSwap => "ibc-swap",
        }
    }
}

/// IBC transfer, optionally carrying a forwarding/wasm memo
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IbcTransferTx {
    pub chain_id: String,
    pub sender: String,
    pub source_port: String,
    pub source_channel: String,
    pub counterparty_chain_id: String,
    /// Decimal amount of `currency`
    pub amount: String,
    pub currency: Currency,
    pub receiver: String,
    pub memo: String,
    pub timeout_timestamp: Option<u64>,
    pub tx_type: TxType,
}

/// CosmWasm contract execution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecuteContractTx {
    pub chain_id: String,
    pub sender: String,
    pub contract: String,
    pub msg: serde_json::Value,
    pub funds: Vec<Coin>,
    pub tx_type: TxType,
}

/// Unsigned EVM call as handed to the wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvmTxRequest {
    pub chain_id: u64,
    pub to: String,
    /// `0x`-prefixed hex wei
    pub value: String,
    /// `0x`-prefixed calldata
    pub data: String,
}

/// EVM call with the ability to simulate its gas
#[derive(Clone)]
pub struct EvmSwapTx {
    pub request: EvmTxRequest,
    pub sender: String,
    pub tx_type: TxType,
    simulator: Arc<dyn GasSimulator>,
}

impl EvmSwapTx {
    /// Estimate gas for the call from the sender's address
    pub async fn simulate(&self) -> SwapResult<GasSimulation> {
        GasEstimator::new()
            .estimate(self.simulator.as_ref(), &self.sender, &self.request)
            .await
    }
}

impl fmt::Debug for EvmSwapTx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvmSwapTx")
            .field("request", &self.request)
            .field("sender", &self.sender)
            .field("tx_type", &self.tx_type)
            .finish()
    }
}

/// A signable swap transaction on the source chain
#[derive(Debug, Clone)]
pub enum SwapTransaction {
    IbcTransfer(IbcTransferTx),
    ExecuteContract(ExecuteContractTx),
    Evm(EvmSwapTx),
}

impl SwapTransaction {
    pub fn tx_type(&self) -> TxType {
        match self {
            SwapTransaction::IbcTransfer(tx) => tx.tx_type,
            SwapTransaction::ExecuteContract(tx) => tx.tx_type,
            SwapTransaction::Evm(tx) => tx.tx_type,
        }
    }

    /// Label used for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            SwapTransaction::IbcTransfer(_) => "ibc_transfer",
            SwapTransaction::ExecuteContract(_) => "execute_contract",
            SwapTransaction::Evm(_) => "evm",
        }
    }
}

/// Source-side context needed to turn a message into a transaction
pub struct TxContext<'a> {
    pub source_chain_id: &'a str,
    pub amount: &'a CoinPretty,
    pub bech32_sender: String,
    pub evm_sender: String,
    pub simulator: Arc<dyn GasSimulator>,
}

/// Build the transaction matching the message variant
pub fn build_swap_transaction(
    msg: &ExecutableMessage,
    ctx: TxContext<'_>,
) -> SwapResult<SwapTransaction> {
    match msg {
        ExecutableMessage::NativeTransfer {
            receiver,
            source_port,
            source_channel,
            counterparty_chain_id,
            timeout_timestamp,
            memo,
            ..
        } => Ok(SwapTransaction::IbcTransfer(IbcTransferTx {
            chain_id: ctx.source_chain_id.to_string(),
            sender: ctx.bech32_sender,
            source_port: source_port.clone(),
            source_channel: source_channel.clone(),
            counterparty_chain_id: counterparty_chain_id.clone(),
            amount: ctx.amount.to_decimal_string(),
            currency: ctx.amount.currency().clone(),
            receiver: receiver.clone(),
            memo: memo.clone(),
            timeout_timestamp: *timeout_timestamp,
            tx_type: TxType::IbcSwap,
        })),
        ExecutableMessage::ContractExecution {
            contract,
            funds,
            payload,
        } => Ok(SwapTransaction::ExecuteContract(ExecuteContractTx {
            chain_id: ctx.source_chain_id.to_string(),
            sender: ctx.bech32_sender,
            contract: contract.clone(),
            msg: payload.clone(),
            funds: funds.iter().map(CoinPretty::to_coin).collect(),
            tx_type: TxType::IbcSwap,
        })),
        ExecutableMessage::EvmTransaction {
            chain_id,
            to,
            value,
            data,
        } => {
            let request = EvmTxRequest {
                chain_id: chain_id.parse::<u64>().map_err(|_| {
                    SwapError::Internal(format!("Invalid EVM chain id in message: {}", chain_id))
                })?,
                to: to.clone(),
                value: to_hex_quantity(value)?,
                data: to_hex_data(data),
            };

            Ok(SwapTransaction::Evm(EvmSwapTx {
                request,
                sender: ctx.evm_sender,
                tx_type: TxType::IbcSwap,
                simulator: ctx.simulator,
            }))
        }
    }
}

/// Decimal wei string to a `0x` hex quantity
fn to_hex_quantity(value: &str) -> SwapResult<String> {
    let value = U256::from_dec_str(value)
        .map_err(|_| SwapError::Internal(format!("Invalid EVM value: {}", value)))?;
    Ok(format!("0x{:x}", value))
}

fn to_hex_data(data: &str) -> String {
    if data.starts_with("0x") {
        data.to_string()
    } else {
        format!("0x{}", data)
    }
}
