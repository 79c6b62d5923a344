//! Single cached query slot

use crate::error::{SwapError, SwapResult};

use futures::future::{AbortHandle, Abortable, BoxFuture, FutureExt, Shared};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;
use tracing::{debug, warn};

/// Point-in-time view of a query
#[derive(Debug)]
pub struct QuerySnapshot<T> {
    pub response: Option<Arc<T>>,
    pub error: Option<Arc<SwapError>>,
    pub is_fetching: bool,
    pub fetched_at: Option<Instant>,
}

impl<T> Clone for QuerySnapshot<T> {
    fn clone(&self) -> Self {
        Self {
            response: self.response.clone(),
            error: self.error.clone(),
            is_fetching: self.is_fetching,
            fetched_at: self.fetched_at,
        }
    }
}

impl<T> Default for QuerySnapshot<T> {
    fn default() -> Self {
        Self {
            response: None,
            error: None,
            is_fetching: false,
            fetched_at: None,
        }
    }
}

/// The fetch currently running for a query
struct InFlight {
    future: Shared<BoxFuture<'static, ()>>,
    abort: AbortHandle,
    generation: u64,
}

/// Cached response slot for one cache key.
///
/// Concurrent fetches share one in-flight request. A fetch only writes the
/// slot if it is still the current generation when it settles, so aborted or
/// superseded fetches are dropped.
pub struct ObservableQuery<T> {
    /// Label used for metrics
    kind: &'static str,
    /// Full cache key
    key: String,
    /// Latest settled state
    state: RwLock<QuerySnapshot<T>>,
    /// Fetch in progress, if any
    in_flight: Mutex<Option<InFlight>>,
    /// Incremented for every new fetch and every abort
    generation: AtomicU64,
}

impl<T: Send + Sync + 'static> ObservableQuery<T> {
    /// Create an empty query for a cache key
    pub fn new(kind: &'static str, key: String) -> Self {
        Self {
            kind,
            key,
            state: RwLock::new(QuerySnapshot::default()),
            in_flight: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Current state of the query
    pub fn snapshot(&self) -> QuerySnapshot<T> {
        match self.state.read() {
            Ok(state) => state.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn response(&self) -> Option<Arc<T>> {
        self.snapshot().response
    }

    pub fn error(&self) -> Option<Arc<SwapError>> {
        self.snapshot().error
    }

    pub fn is_fetching(&self) -> bool {
        self.snapshot().is_fetching
    }

    /// Run `fetcher` unless a fetch is already in flight, then wait for the
    /// in-flight fetch to settle.
    ///
    /// `fetcher` is only invoked when a new request is started.
    pub async fn fetch_with<F, Fut>(self: &Arc<Self>, fetcher: F)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = SwapResult<T>> + Send + 'static,
    {
        let shared = {
            let mut in_flight = self.lock_in_flight();

            match in_flight.as_ref() {
                Some(existing) => {
                    debug!("Joining in-flight fetch for {}", self.key);
                    crate::metrics::record_fetch_deduplicated(self.kind);
                    existing.future.clone()
                }
                None => {
                    let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
                    self.update_state(|state| state.is_fetching = true);

                    let (abort, registration) = AbortHandle::new_pair();
                    let request = Abortable::new(fetcher(), registration);
                    let this = Arc::clone(self);

                    let future = async move {
                        match request.await {
                            Ok(result) => this.settle(generation, result),
                            Err(_) => debug!("Fetch for {} resolved after abort", this.key),
                        }
                    }
                    .boxed()
                    .shared();

                    *in_flight = Some(InFlight {
                        future: future.clone(),
                        abort,
                        generation,
                    });
                    future
                }
            }
        };

        shared.await;
    }

    /// Cancel the in-flight fetch, if any. The cached response is kept.
    pub fn abort(&self) -> bool {
        let taken = self.lock_in_flight().take();

        match taken {
            Some(in_flight) => {
                self.generation.fetch_add(1, Ordering::SeqCst);
                in_flight.abort.abort();
                self.update_state(|state| state.is_fetching = false);
                warn!(
                    "Aborted fetch generation {} for {}",
                    in_flight.generation, self.key
                );
                crate::metrics::record_fetch_aborted(self.kind);
                true
            }
            None => false,
        }
    }

    /// Store the outcome of a fetch if it is still current
    fn settle(&self, generation: u64, result: SwapResult<T>) {
        let mut in_flight = self.lock_in_flight();

        let is_current = in_flight
            .as_ref()
            .map(|f| f.generation == generation)
            .unwrap_or(false);
        if !is_current {
            debug!(
                "Discarding stale fetch generation {} for {}",
                generation, self.key
            );
            return;
        }
        *in_flight = None;

        self.update_state(|state| {
            state.is_fetching = false;
            match result {
                Ok(response) => {
                    state.response = Some(Arc::new(response));
                    state.error = None;
                    state.fetched_at = Some(Instant::now());
                }
                Err(e) => {
                    warn!("Fetch failed for {}: {}", self.key, e);
                    state.error = Some(Arc::new(e));
                }
            }
        });
    }

    fn update_state(&self, f: impl FnOnce(&mut QuerySnapshot<T>)) {
        match self.state.write() {
            Ok(mut state) => f(&mut state),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    fn lock_in_flight(&self) -> std::sync::MutexGuard<'_, Option<InFlight>> {
        match self.in_flight.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
