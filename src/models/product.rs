use serde::{Deserialize, Serialize};

/// A catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub item_id: String,
    pub title: String,
    pub category: String,
    pub description: Option<String>,
}

/// Product detail returned to clients, with aggregate rating stats
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDetail {
    pub item_id: String,
    pub title: String,
    pub category: String,
    pub description: String,
    pub average_rating: f64,
    pub total_ratings: usize,
}

impl ProductDetail {
    /// Combines a catalog entry with the star values it received
    pub fn from_ratings(product: Product, ratings: &[u8]) -> Self {
        let total_ratings = ratings.len();
        let average_rating = if total_ratings == 0 {
            0.0
        } else {
            let sum: u32 = ratings.iter().map(|&r| r as u32).sum();
            round2(sum as f64 / total_ratings as f64)
        };

        Self {
            item_id: product.item_id,
            title: product.title,
            category: product.category,
            description: product
                .description
                .unwrap_or_else(|| "No description available".to_string()),
            average_rating,
            total_ratings,
        }
    }
}

/// A well-rated item, used for the popular listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopularProduct {
    pub item_id: String,
    pub title: Option<String>,
    pub average_rating: f64,
    pub total_ratings: usize,
}

/// A catalog item whose title and description resemble another one's
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarProduct {
    pub item_id: String,
    pub title: String,
    /// Cosine of the TF-IDF vectors, in (0, 1]
    pub similarity: f64,
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
