//! Swap route engine
//!
//! Cross-chain swap routing over a remote route service: validated, cached
//! chain/asset/route/msgs_direct resources and a swap configuration that
//! derives readiness and signable transactions from them.

pub mod chain;
pub mod config;
pub mod error;
pub mod metrics;
pub mod query;
pub mod service;
pub mod swap;
pub mod tx;

pub use error::{SwapConfigError, SwapError, SwapResult};
