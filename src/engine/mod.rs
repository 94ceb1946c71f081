use std::time::Duration;

use crate::models::{CorpusSample, RatingRecord, Recommendation};

pub mod content;
pub mod matrix;
pub mod popularity;
pub mod ranking;
pub mod similarity;

pub use content::{ContentIndex, ContentMatch};
pub use matrix::{MatrixBuild, MatrixBuilder, UserItemMatrix};
pub use popularity::rank_popular;
pub use ranking::rank_items;
pub use similarity::{co_rated_cosine, user_similarities, SimilarityMap};

/// Errors that abort a recommendation for one user
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("user {user_id} has no ratings to compare against")]
    InsufficientData { user_id: String },
}

/// Tunables for the recommendation pipeline
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub default_k: usize,
    pub neighbor_limit: Option<usize>,
    pub min_ratings_per_user: usize,
    pub min_ratings_per_item: usize,
    pub max_users: Option<usize>,
    pub max_items: Option<usize>,
    pub corpus_sample: CorpusSample,
    pub popular_min_ratings: usize,
    pub timeout: Duration,
    /// Seconds
    pub product_cache_ttl: u64,
}

impl EngineSettings {
    /// Largest `k` a caller may ask for
    pub const MAX_K: usize = 100;

    pub fn matrix_builder(&self) -> MatrixBuilder {
        MatrixBuilder::new()
            .with_min_ratings(self.min_ratings_per_user, self.min_ratings_per_item)
            .with_max_axes(self.max_users, self.max_items)
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_k: 5,
            neighbor_limit: None,
            min_ratings_per_user: 1,
            min_ratings_per_item: 1,
            max_users: None,
            max_items: None,
            corpus_sample: CorpusSample::Full,
            popular_min_ratings: 5,
            timeout: Duration::from_secs(10),
            product_cache_ttl: 3600,
        }
    }
}

/// Runs the full user-based collaborative filtering pipeline for one user
///
/// [`MatrixBuilder`] validates raw rows and pivots them into a sparse
/// [`UserItemMatrix`], [`user_similarities`] scores the target against every
/// user it shares a rated item with, and [`rank_items`] turns those scores
/// into predictions for items the target has not rated. Synchronous and pure;
/// the caller decides where it runs.
pub fn recommend_for_user(
    records: Vec<RatingRecord>,
    user_id: &str,
    k: usize,
    settings: &EngineSettings,
) -> Result<Vec<Recommendation>, EngineError> {
    let MatrixBuild { matrix, rejected } = settings.matrix_builder().build(records);

    if !rejected.is_empty() {
        tracing::warn!(
            rejected = rejected.len(),
            "Invalid ratings excluded from the matrix"
        );
    }

    let similarities = user_similarities(&matrix, user_id)?;
    let recommendations = rank_items(&matrix, user_id, &similarities, k, settings.neighbor_limit);

    tracing::info!(
        user_id = %user_id,
        users = matrix.user_count(),
        items = matrix.item_count(),
        neighbors = similarities.len(),
        recommended = recommendations.len(),
        "Recommendations computed"
    );

    Ok(recommendations)
}
