//! WhatsApp Cloud API webhook envelope

use serde::Deserialize;

/// Body Meta POSTs for message notifications
#[derive(Debug, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub entry: Vec<Entry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub changes: Vec<Change>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Change {
    #[serde(default)]
    pub value: ChangeValue,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub messages: Vec<InboundMessage>,
}

#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    pub from: String,
    #[serde(default)]
    pub text: Option<TextContent>,
}

#[derive(Debug, Deserialize)]
pub struct TextContent {
    #[serde(default)]
    pub body: String,
}

impl WebhookPayload {
    /// Sender and text of the first message. Non-text messages yield empty text.
    /// `None` for status updates and other notifications without messages.
    pub fn first_message(&self) -> Option<(&str, &str)> {
        let message = self
            .entry
            .first()?
            .changes
            .first()?
            .value
            .messages
            .first()?;
        let text = message.text.as_ref().map(|t| t.body.as_str()).unwrap_or("");
        Some((message.from.as_str(), text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_text_message() {
        let payload: WebhookPayload = serde_json::from_str(
            r#"{"object":"whatsapp_business_account","entry":[{"id":"1","changes":[{"field":"messages",
                "value":{"messaging_product":"whatsapp","messages":[
                    {"from":"1555","id":"wamid.1","type":"text","text":{"body":"Start showing 15"}},
                    {"from":"1666","id":"wamid.2","type":"text","text":{"body":"help"}}
                ]}}]}]}"#,
        )
        .unwrap();
        assert_eq!(payload.first_message(), Some(("1555", "Start showing 15")));
    }

    #[test]
    fn test_status_update_has_no_message() {
        let payload: WebhookPayload = serde_json::from_str(
            r#"{"entry":[{"changes":[{"value":{"statuses":[{"id":"wamid.1","status":"read"}]}}]}]}"#,
        )
        .unwrap();
        assert_eq!(payload.first_message(), None);
        assert_eq!(WebhookPayload::default().first_message(), None);
    }

    #[test]
    fn test_non_text_message_has_empty_text() {
        let payload: WebhookPayload = serde_json::from_str(
            r#"{"entry":[{"changes":[{"value":{"messages":[{"from":"1555","type":"image","image":{}}]}}]}]}"#,
        )
        .unwrap();
        assert_eq!(payload.first_message(), Some(("1555", "")));
    }
}
