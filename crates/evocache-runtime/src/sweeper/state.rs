//! Sweep bookkeeping.

use tokio::time::Instant;

use parking_lot::RwLock;

/// Tracks what the expiry sweeper has done so far.
#[derive(Debug)]
pub struct SweepState {
    /// Number of completed sweeps.
    sweeps: RwLock<u64>,
    /// Entries removed across all sweeps.
    total_removed: RwLock<u64>,
    /// Entries removed by the most recent sweep.
    last_removed: RwLock<usize>,
    /// When the most recent sweep finished.
    last_sweep: RwLock<Option<Instant>>,
}

impl SweepState {
    /// Creates a new SweepState.
    pub fn new() -> Self {
        Self {
            sweeps: RwLock::new(0),
            total_removed: RwLock::new(0),
            last_removed: RwLock::new(0),
            last_sweep: RwLock::new(None),
        }
    }

    /// Records a finished sweep.
    pub fn record_sweep(&self, removed: usize) {
        let mut sweeps = self.sweeps.write();
        let mut total_removed = self.total_removed.write();
        let mut last_removed = self.last_removed.write();
        let mut last_sweep = self.last_sweep.write();

        *sweeps += 1;
        *total_removed += removed as u64;
        *last_removed = removed;
        *last_sweep = Some(Instant::now());
    }

    pub fn sweeps(&self) -> u64 {
        *self.sweeps.read()
    }

    pub fn total_removed(&self) -> u64 {
        *self.total_removed.read()
    }

    pub fn last_removed(&self) -> usize {
        *self.last_removed.read()
    }

    pub fn last_sweep(&self) -> Option<Instant> {
        *self.last_sweep.read()
    }
}

impl Default for SweepState {
    fn default() -> Self {
        Self::new()
    }
}
