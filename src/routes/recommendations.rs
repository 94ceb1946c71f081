use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    error::AppResult, models::RecommendationResponse, services::recommendations, state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    pub k: Option<usize>,
}

/// Handler for `GET /recommendations/:user_id`
pub async fn recommend(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<RecommendationQuery>,
) -> AppResult<Json<RecommendationResponse>> {
    let response =
        recommendations::get_recommendations(state.store.as_ref(), &state.settings, &user_id, query.k)
            .await?;
    Ok(Json(response))
}
