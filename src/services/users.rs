use chrono::Utc;

use crate::{
    db::{Cache, CacheKey, RatingStore},
    error::{AppError, AppResult},
    models::{Rating, RatingRecord},
};

/// Registers a user. Returns `true` when the user did not exist before.
pub async fn create_user(store: &dyn RatingStore, user_id: &str) -> AppResult<bool> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(AppError::InvalidInput("user_id must not be empty".to_string()));
    }

    let created = store.create_user(user_id).await?;
    if created {
        tracing::info!(user_id = %user_id, "User created");
    } else {
        tracing::debug!(user_id = %user_id, "User already exists");
    }

    Ok(created)
}

/// Records a rating stamped with the current time
///
/// The value goes through the same validation as stored rows, so anything
/// the matrix builder would skip is rejected here with a `DataError`. The
/// item's cached detail is dropped so its stats reflect the new rating.
pub async fn add_rating(
    store: &dyn RatingStore,
    cache: &Cache,
    user_id: &str,
    item_id: &str,
    value: f64,
) -> AppResult<Rating> {
    let record = RatingRecord::new(
        user_id.trim(),
        item_id.trim(),
        value,
        Some(Utc::now().timestamp()),
    );
    let rating = Rating::try_from(record)?;

    store.upsert_rating(&rating).await?;
    cache
        .invalidate(&CacheKey::Product(rating.item_id.clone()))
        .await;

    tracing::info!(
        user_id = %rating.user_id,
        item_id = %rating.item_id,
        value = rating.value,
        "Rating recorded"
    );

    Ok(rating)
}
