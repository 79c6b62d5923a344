//! Swap configuration and readiness
//!
//! This module provides:
//! - `AmountConfig`: the source chain, currency and amount entered by the user
//! - `SwapAmountConfig`: destination, fee and slippage on top of the amount,
//!   resolving the msgs_direct resource and deriving readiness and transactions

mod amount;
mod orchestrator;

pub use amount::{AmountConfig, LoadingState, UiProperties};
pub use orchestrator::{check_price_drift, SwapAmountConfig, SwapState};
