//! Error types shared across the bot

use thiserror::Error;

/// Errors that can occur while handling a check-in
#[derive(Error, Debug)]
pub enum BotError {
    #[error("store error: {0}")]
    Store(String),

    #[error("messenger error: {0}")]
    Messenger(String),

    #[error("scheduler error: {0}")]
    Scheduler(String),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("timer record for '{user}' is corrupt: {reason}")]
    CorruptRecord { user: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T, E = BotError> = std::result::Result<T, E>;
