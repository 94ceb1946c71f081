use crate::error::AppResult;

pub mod whatsapp;

pub use whatsapp::WhatsAppSender;

/// Delivers plain-text replies to chat users on one platform
///
/// Inbound webhook parsing lives with the routes.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MessageSender: Send + Sync {
    /// Sends `body` to the user identified by `to` (a phone number for WhatsApp)
    async fn send_text(&self, to: &str, body: &str) -> AppResult<()>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}
