use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::{
    error::AppResult,
    models::{CorpusSample, Product, Rating, RatingRecord},
};

/// Data-access contract for ratings and the product catalog
///
/// Implementations hand back raw [`RatingRecord`]s; validation into [`Rating`]
/// happens once, in the engine and query services. Each call acquires whatever
/// connection it needs for its own duration and releases it before returning.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RatingStore: Send + Sync {
    /// Ratings the engine works on, possibly a bounded sample of the corpus
    async fn fetch_ratings_for_corpus(&self, sample: CorpusSample)
        -> AppResult<Vec<RatingRecord>>;

    /// A user's ratings, oldest first (insertion order for equal timestamps)
    async fn fetch_user_ratings(&self, user_id: &str) -> AppResult<Vec<RatingRecord>>;

    /// Every rating an item received
    async fn fetch_item_ratings(&self, item_id: &str) -> AppResult<Vec<RatingRecord>>;

    async fn fetch_product(&self, item_id: &str) -> AppResult<Option<Product>>;

    /// Catalog entries for the given ids; unknown ids are skipped
    async fn fetch_products(&self, item_ids: &[String]) -> AppResult<Vec<Product>>;

    /// The whole product catalog, in item id order
    async fn fetch_catalog(&self) -> AppResult<Vec<Product>>;

    /// Whether the user is registered or has rated anything
    async fn user_exists(&self, user_id: &str) -> AppResult<bool>;

    /// Registers a user. Returns `false` when the user already existed.
    async fn create_user(&self, user_id: &str) -> AppResult<bool>;

    /// Records a rating, replacing an earlier one for the same (user, item)
    async fn upsert_rating(&self, rating: &Rating) -> AppResult<()>;

    /// Store name for logging
    fn name(&self) -> &'static str;
}

/// Applies a sampling strategy to ratings given in insertion order
pub fn apply_sample(mut records: Vec<RatingRecord>, sample: CorpusSample) -> Vec<RatingRecord> {
    match sample {
        CorpusSample::Full => records,
        CorpusSample::Head(n) => {
            records.truncate(n);
            records
        }
        CorpusSample::Recent(n) => {
            // Stable sort keeps the newest insertion first among equal timestamps
            records.reverse();
            records.sort_by(|a, b| match (a.rated_at, b.rated_at) {
                (Some(x), Some(y)) => y.cmp(&x),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            });
            records.truncate(n);
            records
        }
        CorpusSample::Random { size, seed } => {
            let mut rng = StdRng::seed_from_u64(seed);
            records
                .choose_multiple(&mut rng, size)
                .cloned()
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<RatingRecord> {
        vec![
            RatingRecord::new("u1", "i1", 5.0, Some(30)),
            RatingRecord::new("u1", "i2", 4.0, None),
            RatingRecord::new("u2", "i1", 3.0, Some(10)),
            RatingRecord::new("u2", "i3", 2.0, Some(30)),
            RatingRecord::new("u3", "i2", 1.0, Some(20)),
        ]
    }

    #[test]
    fn test_full_keeps_everything() {
        assert_eq!(apply_sample(records(), CorpusSample::Full), records());
    }

    #[test]
    fn test_head_keeps_insertion_prefix() {
        let sampled = apply_sample(records(), CorpusSample::Head(2));
        assert_eq!(sampled, records()[..2].to_vec());
    }

    #[test]
    fn test_recent_prefers_newest_timestamps() {
        let sampled = apply_sample(records(), CorpusSample::Recent(3));
        let items: Vec<(&str, &str)> = sampled
            .iter()
            .map(|r| (r.user_id.as_str(), r.item_id.as_str()))
            .collect();
        assert_eq!(items, vec![("u2", "i3"), ("u1", "i1"), ("u3", "i2")]);
    }

    #[test]
    fn test_random_is_reproducible_for_a_seed() {
        let sample = CorpusSample::Random { size: 3, seed: 7 };
        let first = apply_sample(records(), sample);
        let second = apply_sample(records(), sample);
        assert_eq!(first.len(), 3);
        assert_eq!(first, second);
    }

    #[test]
    fn test_sample_larger_than_corpus() {
        assert_eq!(apply_sample(records(), CorpusSample::Head(50)).len(), 5);
        let sample = CorpusSample::Random { size: 50, seed: 1 };
        assert_eq!(apply_sample(records(), sample).len(), 5);
    }
}
