use std::collections::HashMap;

use crate::{
    db::RatingStore,
    error::{AppError, AppResult},
    models::HistoryEntry,
    services::{item_ids, valid_ratings},
};

/// A user's ratings in time order, with product titles where the catalog has them
pub async fn get_user_history(store: &dyn RatingStore, user_id: &str) -> AppResult<Vec<HistoryEntry>> {
    let records = store.fetch_user_ratings(user_id).await?;

    if records.is_empty() && !store.user_exists(user_id).await? {
        return Err(AppError::NotFound(format!("User {} not found", user_id)));
    }

    let ratings = valid_ratings(records);
    let titles: HashMap<String, String> = store
        .fetch_products(&item_ids(&ratings))
        .await?
        .into_iter()
        .map(|p| (p.item_id, p.title))
        .collect();

    tracing::debug!(user_id = %user_id, entries = ratings.len(), "Loaded rating history");

    Ok(ratings
        .into_iter()
        .map(|rating| HistoryEntry {
            product_title: titles.get(&rating.item_id).cloned(),
            item_id: rating.item_id,
            rating: rating.value,
            timestamp: rating.timestamp,
        })
        .collect())
}
