use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::matrix::UserItemMatrix;
use super::similarity::SimilarityMap;
use crate::models::Recommendation;

/// Ratings at or above this count as a strong endorsement in explanations
const HIGH_RATING: u8 = 4;

#[derive(Default)]
struct Accumulator {
    weighted_sum: f64,
    weight_total: f64,
    high_ratings: usize,
}

/// Predicts scores for items the target has not rated and returns the top `k`
///
/// `predicted(i) = Σ sim(u,n)·r(n,i) / Σ |sim(u,n)|` over neighbors `n` that
/// rated `i`. Items no neighbor rated are not candidates. With
/// `neighbor_limit` set, only that many of the most similar neighbors take part.
///
/// Output is ordered by score descending, then item id ascending.
pub fn rank_items(
    matrix: &UserItemMatrix,
    target: &str,
    similarities: &SimilarityMap,
    k: usize,
    neighbor_limit: Option<usize>,
) -> Vec<Recommendation> {
    let neighbors = select_neighbors(similarities, neighbor_limit);
    let target_ratings = matrix.ratings_of(target);
    let already_rated = |item: &str| target_ratings.is_some_and(|r| r.contains_key(item));

    let mut candidates: BTreeMap<&str, Accumulator> = BTreeMap::new();
    for (neighbor, sim) in &neighbors {
        let Some(ratings) = matrix.ratings_of(neighbor) else {
            continue;
        };
        for (item, &stars) in ratings {
            if already_rated(item.as_str()) {
                continue;
            }
            let acc = candidates.entry(item.as_str()).or_default();
            acc.weighted_sum += sim * stars as f64;
            acc.weight_total += sim.abs();
            if stars >= HIGH_RATING {
                acc.high_ratings += 1;
            }
        }
    }

    let mut scored: Vec<(&str, f64, usize)> = candidates
        .into_iter()
        .filter(|(_, acc)| acc.weight_total > 0.0)
        .map(|(item, acc)| (item, acc.weighted_sum / acc.weight_total, acc.high_ratings))
        .filter(|(_, score, _)| score.is_finite())
        .collect();

    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    });
    scored.truncate(k);

    scored
        .into_iter()
        .enumerate()
        .map(|(idx, (item, score, high))| Recommendation {
            item_id: item.to_string(),
            predicted_score: score,
            rank: idx + 1,
            explanation: explain(high),
        })
        .collect()
}

/// Neighbors taking part in prediction, most similar first
fn select_neighbors(similarities: &SimilarityMap, limit: Option<usize>) -> Vec<(&str, f64)> {
    let mut neighbors: Vec<(&str, f64)> = similarities
        .iter()
        .map(|(user, &sim)| (user.as_str(), sim))
        .collect();

    if let Some(limit) = limit {
        neighbors.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        neighbors.truncate(limit);
    }

    neighbors
}

fn explain(high_ratings: usize) -> String {
    if high_ratings > 0 {
        format!(
            "Recommended because {} similar users rated this product highly",
            high_ratings
        )
    } else {
        "Recommended based on similar users' preferences".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::matrix::MatrixBuilder;
    use crate::engine::similarity::user_similarities;
    use crate::models::RatingRecord;
    use proptest::prelude::*;

    fn matrix(ratings: &[(&str, &str, f64)]) -> UserItemMatrix {
        MatrixBuilder::new()
            .build(
                ratings
                    .iter()
                    .map(|(u, i, r)| RatingRecord::new(u, i, *r, None)),
            )
            .matrix
    }

    fn recommend(m: &UserItemMatrix, target: &str, k: usize) -> Vec<Recommendation> {
        let sims = user_similarities(m, target).unwrap();
        rank_items(m, target, &sims, k, None)
    }

    #[test]
    fn test_weighted_average_over_rating_neighbors() {
        let m = matrix(&[
            ("u1", "i1", 5.0),
            ("u1", "i2", 1.0),
            ("u2", "i1", 5.0),
            ("u2", "i2", 1.0),
            ("u2", "i3", 4.0),
            ("u3", "i1", 1.0),
            ("u3", "i2", 5.0),
            ("u3", "i3", 2.0),
        ]);
        let sims = user_similarities(&m, "u1").unwrap();
        let s2 = sims["u2"];
        let s3 = sims["u3"];

        let recs = rank_items(&m, "u1", &sims, 5, None);

        assert_eq!(recs.len(), 1);
        let expected = (s2 * 4.0 + s3 * 2.0) / (s2.abs() + s3.abs());
        assert!((recs[0].predicted_score - expected).abs() < 1e-12);
    }

    #[test]
    fn test_ties_broken_by_item_id() {
        let m = matrix(&[
            ("u1", "i1", 4.0),
            ("u2", "i1", 4.0),
            ("u2", "zz", 3.0),
            ("u2", "aa", 3.0),
            ("u2", "mm", 5.0),
        ]);
        let recs = recommend(&m, "u1", 10);
        let ids: Vec<&str> = recs.iter().map(|r| r.item_id.as_str()).collect();
        assert_eq!(ids, vec!["mm", "aa", "zz"]);
        assert_eq!(recs.iter().map(|r| r.rank).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_truncates_to_k() {
        let m = matrix(&[
            ("u1", "i1", 4.0),
            ("u2", "i1", 4.0),
            ("u2", "i2", 3.0),
            ("u2", "i3", 2.0),
        ]);
        assert_eq!(recommend(&m, "u1", 1).len(), 1);
        assert_eq!(recommend(&m, "u1", 1)[0].item_id, "i2");
    }

    #[test]
    fn test_no_neighbors_is_empty_not_error() {
        let m = matrix(&[("u1", "i1", 4.0), ("u2", "i2", 3.0)]);
        assert!(recommend(&m, "u1", 5).is_empty());
    }

    #[test]
    fn test_neighbor_limit_keeps_most_similar() {
        let m = matrix(&[
            ("u1", "i1", 5.0),
            ("u1", "i2", 1.0),
            ("u2", "i1", 5.0),
            ("u2", "i2", 1.0),
            ("u2", "i3", 5.0),
            ("u3", "i1", 1.0),
            ("u3", "i2", 5.0),
            ("u3", "i3", 1.0),
        ]);
        let sims = user_similarities(&m, "u1").unwrap();
        let recs = rank_items(&m, "u1", &sims, 5, Some(1));

        // Only u2 (identical taste) contributes
        assert_eq!(recs[0].item_id, "i3");
        assert!((recs[0].predicted_score - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_explanation_counts_high_ratings() {
        let m = matrix(&[
            ("u1", "i1", 4.0),
            ("u2", "i1", 4.0),
            ("u2", "i2", 5.0),
            ("u3", "i1", 3.0),
            ("u3", "i2", 4.0),
            ("u3", "i3", 2.0),
        ]);
        let recs = recommend(&m, "u1", 5);
        let i2 = recs.iter().find(|r| r.item_id == "i2").unwrap();
        let i3 = recs.iter().find(|r| r.item_id == "i3").unwrap();
        assert_eq!(
            i2.explanation,
            "Recommended because 2 similar users rated this product highly"
        );
        assert_eq!(i3.explanation, "Recommended based on similar users' preferences");
    }

    fn corpus() -> impl Strategy<Value = Vec<(u8, u8, u8)>> {
        prop::collection::vec((0u8..6, 0u8..10, 1u8..=5), 1..60)
    }

    proptest! {
        #[test]
        fn prop_ranked_list_is_well_formed(ratings in corpus(), k in 1usize..8) {
            let m = MatrixBuilder::new()
                .build(ratings.iter().map(|(u, i, r)| {
                    RatingRecord::new(&format!("u{u}"), &format!("i{i}"), *r as f64, None)
                }))
                .matrix;
            let target = m.rows().next().map(|(u, _)| u.clone()).unwrap();
            let recs = recommend(&m, &target, k);
            let rated = m.ratings_of(&target).unwrap();

            prop_assert!(recs.len() <= k);
            for rec in &recs {
                prop_assert!(!rated.contains_key(&rec.item_id));
            }
            for pair in recs.windows(2) {
                let ordered = pair[0].predicted_score > pair[1].predicted_score
                    || (pair[0].predicted_score == pair[1].predicted_score
                        && pair[0].item_id < pair[1].item_id);
                prop_assert!(ordered);
            }
        }
    }
}
