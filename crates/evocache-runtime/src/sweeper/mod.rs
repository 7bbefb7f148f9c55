//! Background expiry sweeping.
//!
//! Reads already drop expired entries lazily; the sweeper only bounds memory
//! held by entries nobody reads again.

mod scheduler;
mod state;

pub use scheduler::{ExpirySweeper, SweeperConfig, SweeperHandle};
pub use state::SweepState;
