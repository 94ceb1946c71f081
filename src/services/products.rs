use std::collections::HashMap;

use crate::{
    cached,
    db::{Cache, CacheKey, RatingStore},
    engine::{rank_popular, ContentIndex, EngineSettings, MatrixBuilder},
    error::{AppError, AppResult},
    models::{PopularProduct, ProductDetail, SimilarProduct},
    services::valid_ratings,
};

/// Largest popular listing a caller may ask for
pub const MAX_POPULAR_LIMIT: usize = 100;

/// Catalog entry plus its rating stats
///
/// Ratings that reference items missing from the catalog are legal; looking
/// such an item up simply reports `NotFound`.
pub async fn get_product(
    store: &dyn RatingStore,
    cache: &Cache,
    settings: &EngineSettings,
    item_id: &str,
) -> AppResult<ProductDetail> {
    cached!(
        cache,
        CacheKey::Product(item_id.to_string()),
        settings.product_cache_ttl,
        async {
            let product = store
                .fetch_product(item_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Product {} not found", item_id)))?;

            let stars: Vec<u8> = valid_ratings(store.fetch_item_ratings(item_id).await?)
                .into_iter()
                .map(|r| r.value)
                .collect();

            Ok::<ProductDetail, AppError>(ProductDetail::from_ratings(product, &stars))
        }
    )
}

/// Best-rated items across the working corpus
pub async fn get_popular_products(
    store: &dyn RatingStore,
    cache: &Cache,
    settings: &EngineSettings,
    limit: usize,
) -> AppResult<Vec<PopularProduct>> {
    if limit == 0 || limit > MAX_POPULAR_LIMIT {
        return Err(AppError::InvalidInput(format!(
            "limit must be between 1 and {}",
            MAX_POPULAR_LIMIT
        )));
    }

    cached!(
        cache,
        CacheKey::Popular(limit),
        settings.product_cache_ttl,
        async {
            let records = store
                .fetch_ratings_for_corpus(settings.corpus_sample)
                .await?;
            let matrix = MatrixBuilder::new().build(records).matrix;
            let mut popular = rank_popular(&matrix, settings.popular_min_ratings, limit);

            let ids: Vec<String> = popular.iter().map(|p| p.item_id.clone()).collect();
            let titles: HashMap<String, String> = store
                .fetch_products(&ids)
                .await?
                .into_iter()
                .map(|p| (p.item_id, p.title))
                .collect();

            for item in &mut popular {
                item.title = titles.get(&item.item_id).cloned();
                item.average_rating = (item.average_rating * 100.0).round() / 100.0;
            }

            tracing::debug!(count = popular.len(), "Ranked popular products");

            Ok::<Vec<PopularProduct>, AppError>(popular)
        }
    )
}

/// Catalog items whose title and description read most like `item_id`'s
///
/// Scores are TF-IDF cosine similarities; the item itself and items sharing
/// no term are left out.
pub async fn get_similar_products(
    store: &dyn RatingStore,
    settings: &EngineSettings,
    item_id: &str,
    k: Option<usize>,
) -> AppResult<Vec<SimilarProduct>> {
    let k = k.unwrap_or(settings.default_k);
    if k == 0 || k > EngineSettings::MAX_K {
        return Err(AppError::InvalidInput(format!(
            "k must be between 1 and {}",
            EngineSettings::MAX_K
        )));
    }

    let catalog = store.fetch_catalog().await?;
    let titles: HashMap<String, String> = catalog
        .iter()
        .map(|p| (p.item_id.clone(), p.title.clone()))
        .collect();

    let matches = tokio::task::spawn_blocking({
        let item_id = item_id.to_string();
        move || ContentIndex::build(&catalog).most_similar(&item_id, k)
    })
    .await
    .map_err(|e| AppError::Internal(format!("Similarity task failed: {}", e)))?
    .ok_or_else(|| AppError::NotFound(format!("Product {} not found", item_id)))?;

    tracing::debug!(item_id = %item_id, count = matches.len(), "Ranked similar products");

    Ok(matches
        .into_iter()
        .map(|m| SimilarProduct {
            title: titles.get(&m.item_id).cloned().unwrap_or_default(),
            similarity: round4(m.similarity),
            item_id: m.item_id,
        })
        .collect())
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
