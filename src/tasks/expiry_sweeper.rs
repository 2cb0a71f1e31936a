//! Expiry sweep run when a delayed callback arrives

use tracing::{error, info};

use super::TimerManager;

/// Expire every lapsed timer. Errors are logged and never returned; the caller
/// acknowledges the callback regardless.
pub async fn run_expiry_sweep(timers: &TimerManager) -> usize {
    info!("Expiry callback received, sweeping timers");
    match timers.expire_timers_now().await {
        Ok(expired) => expired,
        Err(e) => {
            error!("Expiry sweep failed: {}", e);
            0
        }
    }
}
