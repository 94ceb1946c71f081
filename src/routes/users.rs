use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    error::AppResult,
    models::{HistoryEntry, UserPreferences},
    services::{history, preferences, users},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub user_id: String,
}

/// Handler for `POST /users`; 201 for a new user, 200 if it already existed
pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let created = users::create_user(state.store.as_ref(), &request.user_id).await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        Json(json!({ "user_id": request.user_id.trim(), "created": created })),
    ))
}

pub async fn get_history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<Vec<HistoryEntry>>> {
    let entries = history::get_user_history(state.store.as_ref(), &user_id).await?;
    Ok(Json(entries))
}

pub async fn get_preferences(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<UserPreferences>> {
    let prefs = preferences::get_user_preferences(state.store.as_ref(), &user_id).await?;
    Ok(Json(prefs))
}
