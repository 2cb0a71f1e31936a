//! State management module
//!
//! Application state shared by handlers and the timer record kept per user.

pub mod app_state;
pub mod timer_record;

// Re-export main types
pub use app_state::{AppState, Backends, Settings};
pub use timer_record::{Resolution, TimerRecord, TimerStatus};
