//! Recurring expiry sweep task.

use std::sync::Arc;
use std::time::Duration;

use evocache_core::{CacheSettings, TaggedCache};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info};

use super::SweepState;

/// Configuration for the expiry sweeper.
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// Interval between sweeps.
    pub interval: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
        }
    }
}

impl From<&CacheSettings> for SweeperConfig {
    fn from(settings: &CacheSettings) -> Self {
        Self {
            interval: settings.sweep_interval(),
        }
    }
}

/// Handle for controlling a running sweeper.
///
/// Dropping the handle stops the sweeper.
pub struct SweeperHandle {
    /// Sender to signal shutdown.
    shutdown_tx: watch::Sender<bool>,
    /// The spawned task, taken when joined.
    task: Mutex<Option<JoinHandle<()>>>,
    state: Arc<SweepState>,
}

impl SweeperHandle {
    /// Signals the sweeper to stop. Calling it again is a no-op.
    pub fn stop(&self) {
        if !self.shutdown_tx.send_replace(true) {
            debug!("Expiry sweeper stop requested");
        }
    }

    /// Stops the sweeper and waits for its task to finish.
    pub async fn stop_and_wait(&self) {
        self.stop();
        let task = self.task.lock().take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }

    /// Returns true while the sweep task is alive.
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Sweep counters shared with the task.
    pub fn state(&self) -> &SweepState {
        &self.state
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Periodically purges expired entries from a [`TaggedCache`].
pub struct ExpirySweeper {
    cache: TaggedCache,
    state: Arc<SweepState>,
    config: SweeperConfig,
}

impl ExpirySweeper {
    /// Creates a new sweeper.
    pub fn new(cache: TaggedCache, config: SweeperConfig) -> Self {
        Self {
            cache,
            state: Arc::new(SweepState::new()),
            config,
        }
    }

    /// Creates a sweeper with default configuration.
    pub fn with_defaults(cache: TaggedCache) -> Self {
        Self::new(cache, SweeperConfig::default())
    }

    /// Starts the background sweep task.
    ///
    /// Consumes the sweeper, so a given sweeper can only be started once.
    /// Must be called from within a tokio runtime.
    pub fn start(self) -> SweeperHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let state = Arc::clone(&self.state);

        let task = tokio::spawn(self.run(shutdown_rx));

        SweeperHandle {
            shutdown_tx,
            task: Mutex::new(Some(task)),
            state,
        }
    }

    /// Runs the sweep loop. The first sweep happens one interval after start.
    async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        let period = self.config.interval;
        let mut interval_timer = interval_at(Instant::now() + period, period);
        interval_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Starting expiry sweeper with interval {:?}", period);

        loop {
            tokio::select! {
                _ = interval_timer.tick() => {
                    self.sweep_once();
                }
                result = shutdown_rx.changed() => {
                    if result.is_err() || *shutdown_rx.borrow() {
                        info!("Expiry sweeper shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Performs a single sweep and returns the number of removed entries.
    pub fn sweep_once(&self) -> usize {
        let removed = self.cache.sweep_expired();
        self.state.record_sweep(removed);

        if removed > 0 {
            info!(count = removed, "Cache sweep removed expired entries");
        } else {
            debug!("Cache sweep found nothing to remove");
        }
        removed
    }

    pub fn state(&self) -> &SweepState {
        &self.state
    }
}
