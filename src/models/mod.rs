mod product;
mod rating;
mod recommendation;
mod user_preferences;
mod webhook;

pub use product::{PopularProduct, Product, ProductDetail, SimilarProduct};
pub use rating::{CorpusSample, DataError, HistoryEntry, Rating, RatingRecord};
pub use recommendation::{Recommendation, RecommendationResponse};
pub use user_preferences::{CategoryCount, UserPreferences};
pub use webhook::{
    WebhookVerifyQuery, WhatsAppChange, WhatsAppChangeValue, WhatsAppEntry, WhatsAppMessage,
    WhatsAppText, WhatsAppWebhook,
};
