use std::collections::{BTreeSet, HashMap};

use tokio::sync::RwLock;

use crate::{
    db::store::{apply_sample, RatingStore},
    error::AppResult,
    models::{CorpusSample, Product, Rating, RatingRecord},
};

/// [`RatingStore`] kept in process memory
///
/// Used by tests and for running the API without a database.
#[derive(Default)]
pub struct InMemoryRatingStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    users: BTreeSet<String>,
    products: HashMap<String, Product>,
    /// Insertion order
    ratings: Vec<RatingRecord>,
}

impl InMemoryRatingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with raw rows, valid or not
    pub fn with_records(records: Vec<RatingRecord>) -> Self {
        Self {
            inner: RwLock::new(Inner {
                ratings: records,
                ..Default::default()
            }),
        }
    }

    pub async fn insert_product(&self, product: Product) {
        let mut inner = self.inner.write().await;
        inner.products.insert(product.item_id.clone(), product);
    }
}

#[async_trait::async_trait]
impl RatingStore for InMemoryRatingStore {
    async fn fetch_ratings_for_corpus(
        &self,
        sample: CorpusSample,
    ) -> AppResult<Vec<RatingRecord>> {
        let inner = self.inner.read().await;
        Ok(apply_sample(inner.ratings.clone(), sample))
    }

    async fn fetch_user_ratings(&self, user_id: &str) -> AppResult<Vec<RatingRecord>> {
        let inner = self.inner.read().await;
        let mut records: Vec<RatingRecord> = inner
            .ratings
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        // Stable: insertion order among equal timestamps, undated last
        records.sort_by_key(|r| (r.rated_at.is_none(), r.rated_at));
        Ok(records)
    }

    async fn fetch_item_ratings(&self, item_id: &str) -> AppResult<Vec<RatingRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .ratings
            .iter()
            .filter(|r| r.item_id == item_id)
            .cloned()
            .collect())
    }

    async fn fetch_product(&self, item_id: &str) -> AppResult<Option<Product>> {
        Ok(self.inner.read().await.products.get(item_id).cloned())
    }

    async fn fetch_products(&self, item_ids: &[String]) -> AppResult<Vec<Product>> {
        let inner = self.inner.read().await;
        Ok(item_ids
            .iter()
            .filter_map(|id| inner.products.get(id))
            .cloned()
            .collect())
    }

    async fn fetch_catalog(&self) -> AppResult<Vec<Product>> {
        let inner = self.inner.read().await;
        let mut products: Vec<Product> = inner.products.values().cloned().collect();
        products.sort_by(|a, b| a.item_id.cmp(&b.item_id));
        Ok(products)
    }

    async fn user_exists(&self, user_id: &str) -> AppResult<bool> {
        let inner = self.inner.read().await;
        Ok(inner.users.contains(user_id) || inner.ratings.iter().any(|r| r.user_id == user_id))
    }

    async fn create_user(&self, user_id: &str) -> AppResult<bool> {
        Ok(self.inner.write().await.users.insert(user_id.to_string()))
    }

    async fn upsert_rating(&self, rating: &Rating) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        inner.users.insert(rating.user_id.clone());

        let record = RatingRecord::new(
            &rating.user_id,
            &rating.item_id,
            rating.value as f64,
            rating.timestamp.map(|t| t.timestamp()),
        );
        let existing = inner
            .ratings
            .iter()
            .position(|r| r.user_id == rating.user_id && r.item_id == rating.item_id);
        match existing {
            Some(idx) => inner.ratings[idx] = record,
            None => inner.ratings.push(record),
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
