use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::matrix::UserItemMatrix;
use crate::models::PopularProduct;

/// Best-rated items with at least `min_ratings` ratings
///
/// Ordered by average rating descending, then item id ascending. Titles are
/// left empty for the caller to fill from the catalog.
pub fn rank_popular(matrix: &UserItemMatrix, min_ratings: usize, limit: usize) -> Vec<PopularProduct> {
    let mut totals: BTreeMap<&str, (u32, usize)> = BTreeMap::new();
    for (_, ratings) in matrix.rows() {
        for (item, &stars) in ratings {
            let entry = totals.entry(item.as_str()).or_default();
            entry.0 += stars as u32;
            entry.1 += 1;
        }
    }

    let mut popular: Vec<PopularProduct> = totals
        .into_iter()
        .filter(|(_, (_, count))| *count >= min_ratings.max(1))
        .map(|(item, (sum, count))| PopularProduct {
            item_id: item.to_string(),
            title: None,
            average_rating: sum as f64 / count as f64,
            total_ratings: count,
        })
        .collect();

    popular.sort_by(|a, b| {
        b.average_rating
            .partial_cmp(&a.average_rating)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.item_id.cmp(&b.item_id))
    });
    popular.truncate(limit);
    popular
}
