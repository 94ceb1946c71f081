use serde::Deserialize;

// ============================================================================
// WhatsApp Cloud API webhook types
// ============================================================================

/// Query string Meta sends when verifying the webhook subscription
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookVerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// Notification body posted to the webhook
#[derive(Debug, Clone, Deserialize)]
pub struct WhatsAppWebhook {
    #[serde(default)]
    pub entry: Vec<WhatsAppEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WhatsAppEntry {
    #[serde(default)]
    pub changes: Vec<WhatsAppChange>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WhatsAppChange {
    pub value: WhatsAppChangeValue,
}

/// Either inbound messages or delivery statuses; statuses are ignored
#[derive(Debug, Clone, Deserialize)]
pub struct WhatsAppChangeValue {
    #[serde(default)]
    pub messages: Vec<WhatsAppMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WhatsAppMessage {
    /// Sender phone number, doubles as the user id
    pub from: String,
    #[serde(default)]
    pub text: Option<WhatsAppText>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WhatsAppText {
    pub body: String,
}

impl WhatsAppWebhook {
    /// Sender and body of the first text message in the notification
    pub fn first_text_message(&self) -> Option<(&str, &str)> {
        self.entry
            .iter()
            .flat_map(|e| &e.changes)
            .flat_map(|c| &c.value.messages)
            .find_map(|m| {
                m.text
                    .as_ref()
                    .map(|t| (m.from.as_str(), t.body.as_str()))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text_message() {
        let payload = r#"{
            "object": "whatsapp_business_account",
            "entry": [{
                "id": "1029",
                "changes": [{
                    "field": "messages",
                    "value": {
                        "messaging_product": "whatsapp",
                        "messages": [{
                            "from": "15551234567",
                            "id": "wamid.HBg",
                            "type": "text",
                            "text": { "body": "recommendations" }
                        }]
                    }
                }]
            }]
        }"#;

        let webhook: WhatsAppWebhook = serde_json::from_str(payload).unwrap();
        assert_eq!(
            webhook.first_text_message(),
            Some(("15551234567", "recommendations"))
        );
    }

    #[test]
    fn test_status_update_has_no_message() {
        let payload = r#"{
            "entry": [{
                "changes": [{
                    "value": { "statuses": [{ "id": "wamid.HBg", "status": "delivered" }] }
                }]
            }]
        }"#;

        let webhook: WhatsAppWebhook = serde_json::from_str(payload).unwrap();
        assert_eq!(webhook.first_text_message(), None);
    }

    #[test]
    fn test_non_text_message_skipped() {
        let payload = r#"{
            "entry": [{
                "changes": [{
                    "value": { "messages": [{ "from": "1555", "type": "image" }] }
                }]
            }]
        }"#;

        let webhook: WhatsAppWebhook = serde_json::from_str(payload).unwrap();
        assert_eq!(webhook.first_text_message(), None);
    }
}
