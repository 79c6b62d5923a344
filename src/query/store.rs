//! Lazily constructed query instances keyed by their parameters

use dashmap::DashMap;
use serde::Serialize;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::debug;

/// Canonical, byte-stable string form of a set of query parameters.
///
/// Parameter structs serialize their fields in declaration order and keep
/// maps in sorted containers, so logically identical parameters always
/// produce the same key.
pub trait QueryKey {
    fn cache_key(&self) -> String;
}

impl<T: Serialize + Debug> QueryKey for T {
    fn cache_key(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self))
    }
}

type Constructor<P, Q> = Box<dyn Fn(&P) -> Q + Send + Sync>;

/// Map from cache key to an independently lived query instance.
///
/// Entries are kept until [`remove`](Self::remove) is called; owners evict
/// instances they know are no longer useful.
pub struct QueryMap<P, Q> {
    /// Store name used in logs and metrics
    name: &'static str,
    entries: DashMap<String, Arc<Q>>,
    create: Constructor<P, Q>,
}

impl<P: QueryKey, Q> QueryMap<P, Q> {
    /// Create a store; `create` builds the query for parameters seen for the first time
    pub fn new(name: &'static str, create: impl Fn(&P) -> Q + Send + Sync + 'static) -> Self {
        Self {
            name,
            entries: DashMap::new(),
            create: Box::new(create),
        }
    }

    /// Get the query for `params`, constructing it on first use
    pub fn get(&self, params: &P) -> Arc<Q> {
        let key = params.cache_key();

        if let Some(existing) = self.entries.get(&key) {
            return existing.value().clone();
        }

        let query = self
            .entries
            .entry(key)
            .or_insert_with(|| {
                debug!("Creating {} query", self.name);
                Arc::new((self.create)(params))
            })
            .value()
            .clone();

        crate::metrics::record_cached_queries(self.name, self.entries.len());
        query
    }

    /// Drop the query for `params`; in-flight holders keep their instance
    pub fn remove(&self, params: &P) -> Option<Arc<Q>> {
        let removed = self.entries.remove(&params.cache_key()).map(|(_, q)| q);
        crate::metrics::record_cached_queries(self.name, self.entries.len());
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
