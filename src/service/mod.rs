//! Route service resources
//!
//! This module provides:
//! - An HTTP client for the route service
//! - Response validation into typed structures
//! - Cached chains, assets, route quote and msgs_direct resources

mod assets;
mod chains;
mod client;
mod msgs_direct;
mod queries;
mod route;
mod schema;
mod swap_usage;
pub mod types;

pub use assets::{assets_store, AssetsQuery, AssetsStore, SwappableAsset};
pub use chains::{ChainsQuery, SupportedChain, CHAINS_PATH};
pub use client::{HttpRouteServiceClient, RouteServiceClient};
pub use msgs_direct::{
    msgs_direct_store, ExecutableMessage, MsgsDirectParams, MsgsDirectQuery, MsgsDirectStore,
    SwapType, MSGS_DIRECT_PATH,
};
pub use queries::SwapQueries;
pub use route::{parse_fee, route_store, RouteParams, RouteQuery, RouteStore, ROUTE_PATH};
pub use schema::{
    validate_assets_response, validate_chains_response, validate_msgs_direct_response,
    validate_route_response,
};
pub use swap_usage::{ConfiguredSwapUsage, SwapUsage};
pub use types::SwapVenue;

#[cfg(test)]
pub use client::MockRouteServiceClient;
