//! Safe Showing - a WhatsApp check-in bot
//!
//! An agent starts a countdown before a showing, confirms they are safe to
//! cancel it, or asks for help. A timer that lapses without a check-in alerts
//! a fixed contact.

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod state;
pub mod tasks;
pub mod utils;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use api::create_router;
pub use config::Config;
pub use error::{BotError, Result};
pub use state::AppState;
pub use utils::signals::shutdown_signal;
