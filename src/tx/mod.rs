//! Swap transaction building with account readiness and gas simulation

mod account;
mod builder;
mod gas;

pub use account::AccountManager;
pub use builder::{
    build_swap_transaction, EvmSwapTx, EvmTxRequest, ExecuteContractTx, IbcTransferTx,
    SwapTransaction, TxContext, TxType,
};
pub use gas::{GasEstimator, GasSimulation, GasSimulator};

#[cfg(test)]
pub use account::MockAccountManager;
#[cfg(test)]
pub use gas::MockGasSimulator;
