/// WhatsApp Cloud API provider
///
/// Replies go out through `POST {api_url}/{phone_number_id}/messages` with a
/// bearer token, one text message per reply.
use reqwest::Client as HttpClient;
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    services::providers::MessageSender,
};

#[derive(Clone)]
pub struct WhatsAppSender {
    http_client: HttpClient,
    api_url: String,
    phone_number_id: String,
    token: String,
}

impl WhatsAppSender {
    pub fn new(api_url: String, phone_number_id: String, token: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            phone_number_id,
            token,
        }
    }

    fn messages_url(&self) -> String {
        format!("{}/{}/messages", self.api_url, self.phone_number_id)
    }

    fn text_payload(to: &str, body: &str) -> Value {
        json!({
            "messaging_product": "whatsapp",
            "to": to,
            "type": "text",
            "text": { "body": body }
        })
    }
}

#[async_trait::async_trait]
impl MessageSender for WhatsAppSender {
    async fn send_text(&self, to: &str, body: &str) -> AppResult<()> {
        let response = self
            .http_client
            .post(self.messages_url())
            .bearer_auth(&self.token)
            .json(&Self::text_payload(to, body))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "WhatsApp API returned status {}: {}",
                status, body
            )));
        }

        tracing::debug!(to = %to, "WhatsApp reply sent");

        Ok(())
    }

    fn name(&self) -> &'static str {
        "whatsapp"
    }
}
