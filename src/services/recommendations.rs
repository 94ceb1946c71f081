use std::time::Instant;

use crate::{
    db::RatingStore,
    engine::{self, EngineSettings},
    error::{AppError, AppResult},
    models::{Recommendation, RecommendationResponse},
};

/// Generates collaborative-filtering recommendations for a user
///
/// Loads the (possibly sampled) ratings corpus, then builds the matrix, scores
/// neighbors and ranks unrated items on the blocking pool. The whole pipeline
/// runs under `settings.timeout`.
///
/// A user without any valid rating fails with `InsufficientData`. A user with
/// ratings but no usable neighbor gets an empty list.
pub async fn get_recommendations(
    store: &dyn RatingStore,
    settings: &EngineSettings,
    user_id: &str,
    k: Option<usize>,
) -> AppResult<RecommendationResponse> {
    let k = resolve_k(k, settings)?;
    let start = Instant::now();

    tracing::info!(user_id = %user_id, k, store = store.name(), "Starting recommendation");

    let pipeline = async {
        let records = store
            .fetch_ratings_for_corpus(settings.corpus_sample)
            .await?;

        tracing::debug!(ratings = records.len(), "Corpus loaded");

        let target = user_id.to_string();
        let engine_settings = settings.clone();
        let recommendations = tokio::task::spawn_blocking(move || {
            engine::recommend_for_user(records, &target, k, &engine_settings)
        })
        .await
        .map_err(|e| AppError::Internal(format!("Recommendation task failed: {}", e)))??;

        Ok::<Vec<Recommendation>, AppError>(recommendations)
    };

    let recommendations = tokio::time::timeout(settings.timeout, pipeline)
        .await
        .map_err(|_| {
            tracing::warn!(user_id = %user_id, timeout = ?settings.timeout, "Recommendation timed out");
            AppError::Timeout(format!(
                "Recommendations for {} not ready within {:?}",
                user_id, settings.timeout
            ))
        })??;

    tracing::info!(
        user_id = %user_id,
        count = recommendations.len(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Recommendation completed"
    );

    Ok(RecommendationResponse {
        user_id: user_id.to_string(),
        k,
        recommendations,
    })
}

fn resolve_k(k: Option<usize>, settings: &EngineSettings) -> AppResult<usize> {
    match k.unwrap_or(settings.default_k) {
        0 => Err(AppError::InvalidInput("k must be at least 1".to_string())),
        k if k > EngineSettings::MAX_K => Err(AppError::InvalidInput(format!(
            "k must be at most {}",
            EngineSettings::MAX_K
        ))),
        k => Ok(k),
    }
}
