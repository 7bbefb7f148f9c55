//! Request coalescing on top of [`TaggedCache`].
//!
//! Guarantees at most one producer invocation in flight per key. Every caller
//! that asks for a key while its producer is running receives the same value,
//! or the same error, without starting another invocation.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use evocache_core::{SetOptions, TaggedCache};
use futures::future::{BoxFuture, FutureExt, Shared};
use metrics::counter;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, warn};

type SharedResult<T, E> = Shared<BoxFuture<'static, Result<T, E>>>;

/// Options for [`RequestCoalescer::run`].
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    set: SetOptions,
    force_refresh: bool,
    bypass_in_flight: bool,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// TTL for the memoized result.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.set = self.set.ttl(ttl);
        self
    }

    /// Tags for the memoized result.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.set = self.set.tag(tag);
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set = self.set.tags(tags);
        self
    }

    /// Skips the cache lookup. Still joins a producer already in flight.
    pub fn force_refresh(mut self, force: bool) -> Self {
        self.force_refresh = force;
        self
    }

    /// Starts a fresh producer even if one is in flight for the key.
    ///
    /// Later callers join the fresh one. The replaced producer still answers
    /// the callers joined on it, but its result is not cached. Implies
    /// `force_refresh`.
    pub fn bypass_in_flight(mut self, bypass: bool) -> Self {
        self.bypass_in_flight = bypass;
        self
    }

    pub fn is_force_refresh(&self) -> bool {
        self.force_refresh || self.bypass_in_flight
    }

    pub fn is_bypass_in_flight(&self) -> bool {
        self.bypass_in_flight
    }
}

/// A registered in-flight producer.
struct Pending {
    generation: u64,
    /// A `SharedResult<T, E>` for the caller's `T` and `E`.
    future: Box<dyn Any + Send + Sync>,
}

#[derive(Default)]
struct PendingMap {
    entries: HashMap<String, Pending>,
    /// Generations replaced by a newer producer; their results are not cached.
    superseded: HashSet<u64>,
}

struct CoalescerInner {
    cache: TaggedCache,
    namespace: String,
    pending: Mutex<PendingMap>,
    next_generation: AtomicU64,
}

/// Removes a pending registration when its producer settles, panics or is
/// aborted. Only removes the registration it was created for.
struct PendingGuard {
    inner: Arc<CoalescerInner>,
    key: String,
    generation: u64,
}

impl PendingGuard {
    /// Caches `value` unless a newer producer replaced this one.
    fn memoize<T>(&self, value: T, options: SetOptions)
    where
        T: Send + Sync + 'static,
    {
        let mut pending = self.inner.pending.lock();
        if pending.superseded.remove(&self.generation) {
            debug!(
                namespace = %self.inner.namespace,
                key = %self.key,
                generation = self.generation,
                "Superseded producer settled, result not cached"
            );
            return;
        }
        self.inner
            .cache
            .set(&self.inner.namespace, &self.key, value, options);
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        let mut pending = self.inner.pending.lock();
        pending.superseded.remove(&self.generation);
        if pending
            .entries
            .get(&self.key)
            .is_some_and(|p| p.generation == self.generation)
        {
            pending.entries.remove(&self.key);
        }
    }
}

/// Deduplicates concurrent fetches per key and memoizes their results in a
/// [`TaggedCache`] namespace.
///
/// Clones share the same pending map.
///
/// # Examples
///
/// ```
/// use evocache_core::TaggedCache;
/// use evocache_runtime::{RequestCoalescer, RunOptions};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let coalescer = RequestCoalescer::new(TaggedCache::default(), "feed");
///
/// let posts = coalescer
///     .run(
///         "page-1",
///         || async { Ok::<_, String>(vec!["post-1".to_string()]) },
///         RunOptions::new().tag("posts"),
///     )
///     .await
///     .unwrap();
///
/// assert_eq!(posts.len(), 1);
/// assert!(coalescer.cache().has("feed", "page-1"));
/// # }
/// ```
#[derive(Clone)]
pub struct RequestCoalescer {
    inner: Arc<CoalescerInner>,
}

impl RequestCoalescer {
    /// Creates a coalescer storing results in `namespace` of `cache`.
    pub fn new(cache: TaggedCache, namespace: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(CoalescerInner {
                cache,
                namespace: namespace.into(),
                pending: Mutex::new(PendingMap::default()),
                next_generation: AtomicU64::new(0),
            }),
        }
    }

    /// Returns the value for `key`, invoking `producer` only when needed.
    ///
    /// 1. A live cache entry is returned unless `force_refresh` is set.
    /// 2. Otherwise a producer already in flight for `key` is joined.
    /// 3. Otherwise `producer` is started and registered before this call
    ///    returns. On success its value is cached with the given TTL and tags;
    ///    errors are returned verbatim and never cached.
    ///
    /// The lookup and registration happen synchronously, under the pending
    /// map lock, before the returned future is first polled. The producer runs
    /// on a spawned task, so it completes even if every caller stops waiting.
    /// If it panics, every caller joined on it panics too.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime. The registration is
    /// removed first, so the coalescer stays usable.
    pub fn run<T, E, F, Fut>(
        &self,
        key: &str,
        producer: F,
        options: RunOptions,
    ) -> BoxFuture<'static, Result<T, E>>
    where
        T: Clone + Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let inner = &self.inner;
        let mut pending = inner.pending.lock();

        if !options.is_force_refresh() {
            if let Some(value) = inner.cache.get::<T>(&inner.namespace, key) {
                debug!(namespace = %inner.namespace, key = %key, "Serving from cache");
                return futures::future::ready(Ok(value)).boxed();
            }
        }

        if !options.is_bypass_in_flight() {
            if let Some(existing) = pending.entries.get(key) {
                match existing.future.downcast_ref::<SharedResult<T, E>>() {
                    Some(shared) => {
                        debug!(namespace = %inner.namespace, key = %key, "Joining in-flight producer");
                        counter!("evocache_coalesced_total").increment(1);
                        return shared.clone().boxed();
                    },
                    None => warn!(
                        namespace = %inner.namespace,
                        key = %key,
                        "In-flight producer has a different result type, starting a new one"
                    ),
                }
            }
        }

        let generation = inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let (result_tx, result_rx) = oneshot::channel::<Result<T, E>>();
        let owned_key = key.to_string();
        let shared: SharedResult<T, E> = async move {
            match result_rx.await {
                Ok(result) => result,
                Err(_) => panic!("producer for key `{}` did not complete", owned_key),
            }
        }
        .boxed()
        .shared();

        debug!(namespace = %inner.namespace, key = %key, generation, "Starting producer");
        counter!("evocache_producer_runs_total").increment(1);
        let replaced = pending.entries.insert(
            key.to_string(),
            Pending {
                generation,
                future: Box::new(shared.clone()),
            },
        );
        if let Some(replaced) = replaced {
            pending.superseded.insert(replaced.generation);
        }
        // The guard locks the map when dropped, possibly inside `spawn`.
        drop(pending);

        let guard = PendingGuard {
            inner: Arc::clone(inner),
            key: key.to_string(),
            generation,
        };
        let set_options = options.set;

        tokio::spawn(async move {
            // Invoked here so a panic while building the future is cleaned up too.
            let result = producer().await;
            match &result {
                Ok(value) => guard.memoize(value.clone(), set_options),
                Err(_) => debug!(
                    namespace = %guard.inner.namespace,
                    key = %guard.key,
                    "Producer failed, nothing cached"
                ),
            }
            // The cached value becomes visible before the registration goes away.
            drop(guard);
            let _ = result_tx.send(result);
        });

        shared.boxed()
    }

    /// Number of producers currently registered as in flight.
    pub fn in_flight(&self) -> usize {
        self.inner.pending.lock().entries.len()
    }

    /// Returns true if a producer for `key` is registered as in flight.
    pub fn is_pending(&self, key: &str) -> bool {
        self.inner.pending.lock().entries.contains_key(key)
    }

    /// Drops every pending registration without cancelling the producers.
    ///
    /// Callers already joined still receive their results; new callers start
    /// fresh producers. Returns the number of registrations dropped.
    pub fn forget_pending(&self) -> usize {
        let mut pending = self.inner.pending.lock();
        let count = pending.entries.len();
        pending.entries.clear();
        debug!(namespace = %self.inner.namespace, count = count, "Pending registrations dropped");
        count
    }

    pub fn cache(&self) -> &TaggedCache {
        &self.inner.cache
    }

    pub fn namespace(&self) -> &str {
        &self.inner.namespace
    }
}

impl std::fmt::Debug for RequestCoalescer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestCoalescer")
            .field("namespace", &self.inner.namespace)
            .field("in_flight", &self.in_flight())
            .finish()
    }
}
