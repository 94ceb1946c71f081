use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    error::AppResult,
    models::{PopularProduct, ProductDetail, SimilarProduct},
    services::products,
    state::AppState,
};

const DEFAULT_POPULAR_LIMIT: usize = 10;

#[derive(Debug, Deserialize)]
pub struct PopularQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SimilarQuery {
    pub k: Option<usize>,
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> AppResult<Json<ProductDetail>> {
    let detail =
        products::get_product(state.store.as_ref(), &state.cache, &state.settings, &item_id)
            .await?;
    Ok(Json(detail))
}

pub async fn get_popular(
    State(state): State<AppState>,
    Query(query): Query<PopularQuery>,
) -> AppResult<Json<Vec<PopularProduct>>> {
    let popular = products::get_popular_products(
        state.store.as_ref(),
        &state.cache,
        &state.settings,
        query.limit.unwrap_or(DEFAULT_POPULAR_LIMIT),
    )
    .await?;
    Ok(Json(popular))
}

/// Handler for `GET /products/:item_id/similar`
pub async fn get_similar(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
    Query(query): Query<SimilarQuery>,
) -> AppResult<Json<Vec<SimilarProduct>>> {
    let similar =
        products::get_similar_products(state.store.as_ref(), &state.settings, &item_id, query.k)
            .await?;
    Ok(Json(similar))
}
