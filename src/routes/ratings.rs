use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;

use crate::{error::AppResult, models::Rating, services::users, state::AppState};

#[derive(Debug, Deserialize)]
pub struct RatingRequest {
    pub user_id: String,
    pub item_id: String,
    pub rating: f64,
}

/// Handler for `POST /ratings`
pub async fn add_rating(
    State(state): State<AppState>,
    Json(request): Json<RatingRequest>,
) -> AppResult<(StatusCode, Json<Rating>)> {
    let rating = users::add_rating(
        state.store.as_ref(),
        &state.cache,
        &request.user_id,
        &request.item_id,
        request.rating,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(rating)))
}
