//! Utility functions module
//!
//! Signal handling and the wall clock used by the timer manager.

pub mod clock;
pub mod signals;

// Re-export main items
pub use clock::{Clock, SystemClock};
pub use signals::shutdown_signal;
