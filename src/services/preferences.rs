use std::collections::HashMap;

use crate::{
    db::RatingStore,
    error::{AppError, AppResult},
    models::UserPreferences,
    services::{item_ids, valid_ratings},
};

/// Summarizes how and what a user rates
///
/// Fails with `NotFound` when the user has no valid rating to summarize.
pub async fn get_user_preferences(
    store: &dyn RatingStore,
    user_id: &str,
) -> AppResult<UserPreferences> {
    let ratings = valid_ratings(store.fetch_user_ratings(user_id).await?);

    if ratings.is_empty() {
        return Err(AppError::NotFound(format!(
            "No preferences found for user {}",
            user_id
        )));
    }

    let categories: HashMap<String, String> = store
        .fetch_products(&item_ids(&ratings))
        .await?
        .into_iter()
        .map(|p| (p.item_id, p.category))
        .collect();

    Ok(UserPreferences::summarize(user_id, &ratings, &categories))
}
