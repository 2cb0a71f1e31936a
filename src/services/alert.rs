//! Alerts to the configured emergency contact

use std::sync::Arc;

use tracing::warn;

use super::messenger::Messenger;
use crate::error::Result;

/// Reason sent when the user asks for help directly
pub const REASON_MANUAL: &str = "manual";
/// Reason sent when a timer lapses without a check-in
pub const REASON_MISSED_CHECK_IN: &str = "missed check in";

/// Sends alerts about a user to a single fixed contact
#[derive(Clone)]
pub struct Alerter {
    messenger: Arc<dyn Messenger>,
    contact: String,
    location_link: String,
}

impl Alerter {
    pub fn new(messenger: Arc<dyn Messenger>, contact: String, location_link: String) -> Self {
        Self {
            messenger,
            contact,
            location_link,
        }
    }

    pub fn message(&self, reason: &str) -> String {
        format!(
            "Alert from your agent. Reason: {}. Last known location: {}",
            reason, self.location_link
        )
    }

    /// Notify the contact that `user` needs attention
    pub async fn alert_contact(&self, user: &str, reason: &str) -> Result<()> {
        warn!("Alerting contact about {} (reason: {})", user, reason);
        self.messenger.send_text(&self.contact, &self.message(reason)).await
    }
}
