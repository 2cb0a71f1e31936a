//! Check-in logic module
//!
//! Timer lifecycle, chat command dispatch, and the expiry sweep.

pub mod expiry_sweeper;
pub mod inbound;
pub mod timer_manager;

// Re-export main items
pub use expiry_sweeper::run_expiry_sweep;
pub use inbound::{handle_message, Command};
pub use timer_manager::TimerManager;
