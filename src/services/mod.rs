use std::collections::BTreeSet;

use crate::models::{Rating, RatingRecord};

pub mod chat;
pub mod history;
pub mod preferences;
pub mod products;
pub mod providers;
pub mod recommendations;
pub mod users;

/// Validates store rows, logging and dropping the ones that fail
pub(crate) fn valid_ratings(records: Vec<RatingRecord>) -> Vec<Rating> {
    records
        .into_iter()
        .filter_map(|record| match Rating::try_from(record) {
            Ok(rating) => Some(rating),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping invalid rating");
                None
            }
        })
        .collect()
}

/// Distinct item ids referenced by the ratings, in id order
pub(crate) fn item_ids(ratings: &[Rating]) -> Vec<String> {
    ratings
        .iter()
        .map(|r| r.item_id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
