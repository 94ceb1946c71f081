use std::fmt::Write;

use crate::{
    db::{Cache, RatingStore},
    engine::EngineSettings,
    error::AppError,
    services::{history, products, recommendations, users},
};

pub const HELP_TEXT: &str = "Welcome! Here are the available commands:
1. 'recommendations' - Get product recommendations
2. 'history' - See your rating history
3. 'product <product_id>' - See product details
4. 'rate <product_id> <rating>' - Rate a product (1-5)";

/// Length of the popular list sent to users without ratings
const POPULAR_REPLY_LIMIT: usize = 10;

/// A parsed chat message
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    Recommendations,
    History,
    Product(String),
    Rate { item_id: String, value: f64 },
    /// Anything unrecognised, or a known command with bad arguments
    Help,
}

impl ChatCommand {
    pub fn parse(text: &str) -> Self {
        let mut words = text.split_whitespace();
        let Some(command) = words.next() else {
            return ChatCommand::Help;
        };
        let args: Vec<&str> = words.collect();

        match (command.to_lowercase().as_str(), args.as_slice()) {
            ("recommendations" | "recommend", _) => ChatCommand::Recommendations,
            ("history", _) => ChatCommand::History,
            ("product", [item_id]) => ChatCommand::Product(item_id.to_string()),
            ("rate", [item_id, value]) => match value.parse::<f64>() {
                Ok(value) => ChatCommand::Rate {
                    item_id: item_id.to_string(),
                    value,
                },
                Err(_) => ChatCommand::Help,
            },
            _ => ChatCommand::Help,
        }
    }
}

/// Collaborators a chat reply may need
pub struct ChatContext<'a> {
    pub store: &'a dyn RatingStore,
    pub cache: &'a Cache,
    pub settings: &'a EngineSettings,
}

/// Runs a command for `user_id` and renders the reply
///
/// `user_id` is whatever id the platform gives the sender (a phone number on
/// WhatsApp). Failures become friendly text, never an error.
pub async fn respond(ctx: &ChatContext<'_>, user_id: &str, command: ChatCommand) -> String {
    tracing::info!(user_id = %user_id, ?command, "Handling chat command");

    match command {
        ChatCommand::Recommendations => {
            match recommendations::get_recommendations(ctx.store, ctx.settings, user_id, None).await
            {
                Ok(response) if response.recommendations.is_empty() => {
                    "No recommendations available.".to_string()
                }
                Ok(response) => {
                    let mut reply = "Here are your recommendations:".to_string();
                    for rec in &response.recommendations {
                        let _ = write!(
                            reply,
                            "\nProduct {}: {:.2} stars",
                            rec.item_id, rec.predicted_score
                        );
                    }
                    reply
                }
                Err(AppError::InsufficientData(_)) => popular_reply(ctx, user_id).await,
                Err(e) => {
                    tracing::error!(error = %e, "Chat recommendations failed");
                    "Sorry, I couldn't get recommendations at this time.".to_string()
                }
            }
        }
        ChatCommand::History => match history::get_user_history(ctx.store, user_id).await {
            Ok(entries) if !entries.is_empty() => {
                let mut reply = "Here is your rating history:".to_string();
                for entry in &entries {
                    let name = entry.product_title.as_deref().unwrap_or(&entry.item_id);
                    let _ = write!(reply, "\n{}: {} stars", name, entry.rating);
                }
                reply
            }
            Ok(_) | Err(AppError::NotFound(_)) => "No history available.".to_string(),
            Err(e) => {
                tracing::error!(error = %e, "Chat history failed");
                "Sorry, I couldn't get your history at this time.".to_string()
            }
        },
        ChatCommand::Product(item_id) => {
            match products::get_product(ctx.store, ctx.cache, ctx.settings, &item_id).await {
                Ok(detail) => format!(
                    "{} ({})\n{}\nAverage rating: {:.2} from {} ratings",
                    detail.title,
                    detail.category,
                    detail.description,
                    detail.average_rating,
                    detail.total_ratings
                ),
                Err(AppError::NotFound(_)) => format!("Product {} not found.", item_id),
                Err(e) => {
                    tracing::error!(error = %e, "Chat product lookup failed");
                    "Sorry, I couldn't look up that product right now.".to_string()
                }
            }
        }
        ChatCommand::Rate { item_id, value } => {
            match users::add_rating(ctx.store, ctx.cache, user_id, &item_id, value).await {
                Ok(rating) => format!("Thanks! You rated {} {} stars.", rating.item_id, rating.value),
                Err(AppError::Data(_)) => "Ratings must be whole numbers from 1 to 5.".to_string(),
                Err(e) => {
                    tracing::error!(error = %e, "Chat rating failed");
                    "Sorry, I couldn't save your rating right now.".to_string()
                }
            }
        }
        ChatCommand::Help => HELP_TEXT.to_string(),
    }
}

/// Users without ratings get the best-rated products instead
async fn popular_reply(ctx: &ChatContext<'_>, user_id: &str) -> String {
    tracing::info!(user_id = %user_id, "No ratings yet, answering with popular products");

    match products::get_popular_products(ctx.store, ctx.cache, ctx.settings, POPULAR_REPLY_LIMIT)
        .await
    {
        Ok(popular) if popular.is_empty() => "No recommendations available.".to_string(),
        Ok(popular) => {
            let mut reply = "Here are some popular products:".to_string();
            for item in &popular {
                let _ = write!(
                    reply,
                    "\nProduct {}: {:.2} stars",
                    item.item_id, item.average_rating
                );
            }
            reply
        }
        Err(e) => {
            tracing::error!(error = %e, "Chat popular fallback failed");
            "Sorry, I couldn't get recommendations at this time.".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryRatingStore;
    use crate::models::{Product, Rating, RatingRecord};

    fn rating(user: &str, item: &str, stars: f64) -> Rating {
        Rating::try_from(RatingRecord::new(user, item, stars, Some(10))).unwrap()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(ChatCommand::parse("Recommendations"), ChatCommand::Recommendations);
        assert_eq!(ChatCommand::parse("  history please "), ChatCommand::History);
        assert_eq!(
            ChatCommand::parse("product B00X"),
            ChatCommand::Product("B00X".to_string())
        );
        assert_eq!(
            ChatCommand::parse("rate B00X 4"),
            ChatCommand::Rate {
                item_id: "B00X".to_string(),
                value: 4.0
            }
        );
    }

    #[test]
    fn test_parse_falls_back_to_help() {
        assert_eq!(ChatCommand::parse(""), ChatCommand::Help);
        assert_eq!(ChatCommand::parse("hello there"), ChatCommand::Help);
        assert_eq!(ChatCommand::parse("product"), ChatCommand::Help);
        assert_eq!(ChatCommand::parse("rate B00X five"), ChatCommand::Help);
    }

    async fn store() -> InMemoryRatingStore {
        let store = InMemoryRatingStore::with_records(vec![
            RatingRecord::new("1555", "i1", 5.0, Some(1)),
            RatingRecord::new("u2", "i1", 4.0, Some(2)),
            RatingRecord::new("u2", "i3", 5.0, Some(3)),
        ]);
        store
            .insert_product(Product {
                item_id: "i1".to_string(),
                title: "Desk Lamp".to_string(),
                category: "Home".to_string(),
                description: None,
            })
            .await;
        store
    }

    async fn reply(store: &InMemoryRatingStore, user: &str, text: &str) -> String {
        let cache = Cache::disabled();
        let settings = EngineSettings::default();
        let ctx = ChatContext {
            store,
            cache: &cache,
            settings: &settings,
        };
        respond(&ctx, user, ChatCommand::parse(text)).await
    }

    #[tokio::test]
    async fn test_recommendations_reply() {
        let store = store().await;
        let text = reply(&store, "1555", "recommendations").await;
        assert_eq!(text, "Here are your recommendations:\nProduct i3: 5.00 stars");
    }

    #[tokio::test]
    async fn test_new_user_gets_popular_products() {
        let store = store().await;
        for (user, stars) in [("u3", 5.0), ("u4", 4.0), ("u5", 5.0)] {
            store.upsert_rating(&rating(user, "i3", stars)).await.unwrap();
        }
        for user in ["u3", "u4", "u5", "u6"] {
            store.upsert_rating(&rating(user, "i1", 4.0)).await.unwrap();
        }

        // i1: 5, 4, 4, 4, 4, 4 -> 4.17; i3: 5, 5, 4, 5 -> below five ratings
        let text = reply(&store, "9999", "recommendations").await;
        assert_eq!(text, "Here are some popular products:\nProduct i1: 4.17 stars");
    }

    #[tokio::test]
    async fn test_new_user_without_popular_products() {
        let store = store().await;
        let text = reply(&store, "9999", "recommendations").await;
        assert_eq!(text, "No recommendations available.");
    }

    #[tokio::test]
    async fn test_history_reply_uses_titles() {
        let store = store().await;
        assert_eq!(
            reply(&store, "1555", "history").await,
            "Here is your rating history:\nDesk Lamp: 5 stars"
        );
        assert_eq!(reply(&store, "9999", "history").await, "No history available.");
    }

    #[tokio::test]
    async fn test_rate_then_history() {
        let store = store().await;
        assert_eq!(
            reply(&store, "9999", "rate i7 3").await,
            "Thanks! You rated i7 3 stars."
        );
        assert_eq!(
            reply(&store, "9999", "rate i7 9").await,
            "Ratings must be whole numbers from 1 to 5."
        );
        assert_eq!(
            reply(&store, "9999", "history").await,
            "Here is your rating history:\ni7: 3 stars"
        );
    }

    #[tokio::test]
    async fn test_product_reply() {
        let store = store().await;
        let text = reply(&store, "1555", "product i1").await;
        assert!(text.starts_with("Desk Lamp (Home)"));
        assert!(text.ends_with("Average rating: 4.50 from 2 ratings"));
        assert_eq!(reply(&store, "1555", "product zz").await, "Product zz not found.");
    }

    #[tokio::test]
    async fn test_help_reply() {
        let store = store().await;
        assert_eq!(reply(&store, "1555", "hi").await, HELP_TEXT);
    }
}
