use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    middleware::request_id::{make_span_with_request_id, request_id_middleware},
    state::AppState,
};

pub mod products;
pub mod ratings;
pub mod recommendations;
pub mod users;
pub mod webhook;

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .route(
            "/webhook/whatsapp",
            get(webhook::verify_whatsapp).post(webhook::receive_whatsapp),
        )
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/recommendations/:user_id", get(recommendations::recommend))
        .route("/users", post(users::create_user))
        .route("/users/:user_id/history", get(users::get_history))
        .route("/users/:user_id/preferences", get(users::get_preferences))
        .route("/products/popular", get(products::get_popular))
        .route("/products/:item_id", get(products::get_product))
        .route("/products/:item_id/similar", get(products::get_similar))
        .route("/ratings", post(ratings::add_rating))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
