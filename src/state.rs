use std::sync::Arc;

use crate::{
    db::{Cache, InMemoryRatingStore, RatingStore},
    engine::EngineSettings,
    services::{chat::ChatContext, providers::MessageSender},
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RatingStore>,
    pub cache: Cache,
    pub settings: EngineSettings,
    /// Outbound chat replies; `None` when no chat platform is configured
    pub messenger: Option<Arc<dyn MessageSender>>,
    pub whatsapp_verify_token: Option<String>,
}

impl AppState {
    pub fn new(store: Arc<dyn RatingStore>, cache: Cache, settings: EngineSettings) -> Self {
        Self {
            store,
            cache,
            settings,
            messenger: None,
            whatsapp_verify_token: None,
        }
    }

    /// State over an in-memory store with caching off
    pub fn in_memory(store: InMemoryRatingStore) -> Self {
        Self::new(Arc::new(store), Cache::disabled(), EngineSettings::default())
    }

    pub fn with_messenger(mut self, messenger: Arc<dyn MessageSender>) -> Self {
        self.messenger = Some(messenger);
        self
    }

    pub fn with_whatsapp_verify_token(mut self, token: impl Into<String>) -> Self {
        self.whatsapp_verify_token = Some(token.into());
        self
    }

    pub fn chat_context(&self) -> ChatContext<'_> {
        ChatContext {
            store: self.store.as_ref(),
            cache: &self.cache,
            settings: &self.settings,
        }
    }
}
