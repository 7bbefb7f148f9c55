//! Function memoization built on [`RequestCoalescer::run`].

use std::fmt::Debug;
use std::future::Future;

use futures::future::BoxFuture;
use serde::Serialize;

use crate::coalescer::{RequestCoalescer, RunOptions};

/// Default key function: the JSON rendering of the arguments.
///
/// Falls back to the `Debug` rendering if the arguments cannot be serialized.
pub fn json_key<A>(args: &A) -> String
where
    A: Serialize + Debug,
{
    serde_json::to_string(args).unwrap_or_else(|_| format!("{:?}", args))
}

/// An async function whose results are coalesced and cached per argument key.
///
/// # Examples
///
/// ```
/// use evocache_core::TaggedCache;
/// use evocache_runtime::{RequestCoalescer, RunOptions, memoize};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let coalescer = RequestCoalescer::new(TaggedCache::default(), "usernames");
/// let resolve = memoize(coalescer, |owner: String| async move {
///     Ok::<_, String>(format!("{}.dash", owner))
/// })
/// .with_options(RunOptions::new().tag("dpns"));
///
/// assert_eq!(resolve.call("alice".to_string()).await.unwrap(), "alice.dash");
/// # }
/// ```
pub struct Memoized<F, K> {
    coalescer: RequestCoalescer,
    f: F,
    key_fn: K,
    options: RunOptions,
}

/// Memoizes `f`, keying results by [`json_key`] of its argument.
pub fn memoize<A, F, Fut>(coalescer: RequestCoalescer, f: F) -> Memoized<F, fn(&A) -> String>
where
    A: Serialize + Debug,
    F: Fn(A) -> Fut,
{
    memoize_with_key(coalescer, json_key::<A> as fn(&A) -> String, f)
}

/// Memoizes `f`, keying results with `key_fn`.
pub fn memoize_with_key<F, K>(coalescer: RequestCoalescer, key_fn: K, f: F) -> Memoized<F, K> {
    Memoized {
        coalescer,
        f,
        key_fn,
        options: RunOptions::default(),
    }
}

impl<F, K> Memoized<F, K> {
    /// Options applied to every call (TTL, tags, refresh policy).
    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Calls the function, or returns the cached / in-flight result for the
    /// same key.
    pub fn call<A, T, E, Fut>(&self, args: A) -> BoxFuture<'static, Result<T, E>>
    where
        K: Fn(&A) -> String,
        F: Fn(A) -> Fut + Clone + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        A: Send + 'static,
        T: Clone + Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
    {
        let key = (self.key_fn)(&args);
        let f = self.f.clone();
        self.coalescer
            .run(&key, move || f(args), self.options.clone())
    }

    pub fn coalescer(&self) -> &RequestCoalescer {
        &self.coalescer
    }
}
