//! Keyed asynchronous queries
//!
//! This module provides:
//! - `ObservableQuery`: a cached, refreshable response slot for one cache key
//!   with in-flight de-duplication and abort
//! - `QueryMap`: lazily constructed query instances keyed by serialized parameters

mod cell;
mod store;

pub use cell::{ObservableQuery, QuerySnapshot};
pub use store::{QueryKey, QueryMap};
