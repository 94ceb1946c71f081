use std::collections::BTreeMap;

use super::matrix::{RatingVector, UserItemMatrix};
use super::EngineError;

/// Neighbor user id to similarity with the target
pub type SimilarityMap = BTreeMap<String, f64>;

/// Cosine similarity restricted to the items both users rated
///
/// Items rated by only one side are skipped entirely, so a missing rating never
/// acts as a zero-star rating in either the dot product or the norms.
/// Returns `None` when the users share no item or the result is not finite.
///
/// Formula: cos(A, B) = Σ a_i·b_i / (√Σ a_i² · √Σ b_i²) over co-rated i
pub fn co_rated_cosine(a: &RatingVector, b: &RatingVector) -> Option<f64> {
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    let mut shared = 0usize;

    for (item, &ra) in a {
        let Some(&rb) = b.get(item) else {
            continue;
        };
        let (ra, rb) = (ra as f64, rb as f64);
        dot += ra * rb;
        norm_a += ra * ra;
        norm_b += rb * rb;
        shared += 1;
    }

    if shared == 0 {
        return None;
    }

    let score = dot / (norm_a.sqrt() * norm_b.sqrt());
    score.is_finite().then_some(score)
}

/// Similarity of `target` against every other user sharing at least one item
///
/// Users with no co-rated item are left out rather than scored 0, so they
/// cannot dilute the weighted averages computed downstream.
pub fn user_similarities(
    matrix: &UserItemMatrix,
    target: &str,
) -> Result<SimilarityMap, EngineError> {
    let target_ratings = matrix
        .ratings_of(target)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| EngineError::InsufficientData {
            user_id: target.to_string(),
        })?;

    let similarities: SimilarityMap = matrix
        .rows()
        .filter(|(user, _)| user.as_str() != target)
        .filter_map(|(user, ratings)| {
            co_rated_cosine(target_ratings, ratings).map(|score| (user.clone(), score))
        })
        .collect();

    tracing::debug!(
        user_id = %target,
        neighbors = similarities.len(),
        "Computed user similarities"
    );

    Ok(similarities)
}
