//! Outbound chat delivery over the WhatsApp Cloud API

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Result;

/// Sends plain text messages to a chat recipient
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_text(&self, to: &str, body: &str) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct TextBody<'a> {
    body: &'a str,
}

#[derive(Debug, Serialize)]
struct SendTextRequest<'a> {
    messaging_product: &'static str,
    to: &'a str,
    text: TextBody<'a>,
}

/// WhatsApp Business messenger using the Graph API
#[derive(Debug, Clone)]
pub struct WhatsAppMessenger {
    graph_api_base: String,
    phone_number_id: String,
    access_token: String,
    client: reqwest::Client,
}

impl WhatsAppMessenger {
    pub fn new(graph_api_base: &str, phone_number_id: &str, access_token: &str) -> Self {
        Self {
            graph_api_base: graph_api_base.trim_end_matches('/').to_string(),
            phone_number_id: phone_number_id.to_string(),
            access_token: access_token.to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn messages_url(&self) -> String {
        format!("{}/{}/messages", self.graph_api_base, self.phone_number_id)
    }
}

#[async_trait]
impl Messenger for WhatsAppMessenger {
    async fn send_text(&self, to: &str, body: &str) -> Result<()> {
        let request = SendTextRequest {
            messaging_product: "whatsapp",
            to,
            text: TextBody { body },
        };

        let response = self.client
            .post(self.messages_url())
            .bearer_auth(&self.access_token)
            .json(&request)
            .send()
            .await?;

        // rejected sends (e.g. recipient not opted in) are logged, not raised
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!("WhatsApp API rejected message to {}: {} {}", to, status, error_text);
            return Ok(());
        }

        debug!("WhatsApp message sent to {}", to);
        Ok(())
    }
}
