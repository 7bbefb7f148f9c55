#![allow(dead_code)]
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use evocache_core::TaggedCache;
use evocache_runtime::RequestCoalescer;
use futures::future::BoxFuture;

/// Future returned by the test producers.
pub type Produced = BoxFuture<'static, Result<String, TestError>>;

/// Error returned by test producers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TestError {
    #[error("upstream failed: {0}")]
    Upstream(String),
}

/// Installs a test subscriber honoring RUST_LOG; safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn coalescer(namespace: &str) -> RequestCoalescer {
    RequestCoalescer::new(TaggedCache::new(Duration::from_secs(300)), namespace)
}

/// Counts producer invocations.
#[derive(Clone, Default)]
pub struct CallCounter(Arc<AtomicU32>);

impl CallCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }

    /// A producer that bumps the counter, waits `delay` and returns
    /// `value-<n>` where n is the invocation number.
    pub fn producer(
        &self,
        delay: Duration,
    ) -> impl FnOnce() -> Produced + Send + 'static + use<> {
        let counter = Arc::clone(&self.0);
        move || {
            Box::pin(async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                tokio::time::sleep(delay).await;
                Ok(format!("value-{}", n))
            })
        }
    }

    /// A producer that bumps the counter, waits `delay` and fails.
    pub fn failing_producer(
        &self,
        delay: Duration,
    ) -> impl FnOnce() -> Produced + Send + 'static + use<> {
        let counter = Arc::clone(&self.0);
        move || {
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(delay).await;
                Err(TestError::Upstream("boom".to_string()))
            })
        }
    }
}
