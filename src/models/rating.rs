use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Lowest rating a user can give
pub const MIN_RATING: u8 = 1;
/// Highest rating a user can give
pub const MAX_RATING: u8 = 5;

/// A rating row that failed validation
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DataError {
    #[error("rating {value} by {user_id} for {item_id} is outside 1..=5")]
    OutOfRange {
        user_id: String,
        item_id: String,
        value: f64,
    },

    #[error("rating {value} by {user_id} for {item_id} is not a whole star count")]
    NotIntegral {
        user_id: String,
        item_id: String,
        value: f64,
    },

    #[error("rating row is missing its {0}")]
    MissingId(&'static str),
}

/// Untyped rating row as it comes out of the store
///
/// Values stay `f64` here because the imported corpus stores stars as floats
/// (`5.0`). Conversion into [`Rating`] is the only place they are checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RatingRecord {
    pub user_id: String,
    pub item_id: String,
    pub rating: f64,
    /// Unix seconds
    pub rated_at: Option<i64>,
}

impl RatingRecord {
    pub fn new(user_id: &str, item_id: &str, rating: f64, rated_at: Option<i64>) -> Self {
        Self {
            user_id: user_id.to_string(),
            item_id: item_id.to_string(),
            rating,
            rated_at,
        }
    }
}

/// A validated (user, item, stars) observation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: String,
    pub item_id: String,
    pub value: u8,
    pub timestamp: Option<DateTime<Utc>>,
}

impl TryFrom<RatingRecord> for Rating {
    type Error = DataError;

    fn try_from(record: RatingRecord) -> Result<Self, Self::Error> {
        if record.user_id.trim().is_empty() {
            return Err(DataError::MissingId("user_id"));
        }
        if record.item_id.trim().is_empty() {
            return Err(DataError::MissingId("item_id"));
        }

        let value = record.rating;
        if !value.is_finite() || value < MIN_RATING as f64 || value > MAX_RATING as f64 {
            return Err(DataError::OutOfRange {
                user_id: record.user_id,
                item_id: record.item_id,
                value,
            });
        }
        if value.fract() != 0.0 {
            return Err(DataError::NotIntegral {
                user_id: record.user_id,
                item_id: record.item_id,
                value,
            });
        }

        Ok(Rating {
            user_id: record.user_id,
            item_id: record.item_id,
            value: value as u8,
            timestamp: record
                .rated_at
                .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        })
    }
}

/// Which slice of the ratings corpus the engine works on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CorpusSample {
    /// Every stored rating
    #[default]
    Full,
    /// The first `n` ratings in insertion order
    Head(usize),
    /// The `n` most recent ratings by timestamp
    Recent(usize),
    /// A seeded uniform sample of `size` ratings
    Random { size: usize, seed: u64 },
}

/// One line of a user's rating history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub item_id: String,
    pub rating: u8,
    /// `None` when the item is missing from the catalog
    pub product_title: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_record_converts() {
        let rating = Rating::try_from(RatingRecord::new("u1", "i1", 4.0, Some(1_700_000_000)))
            .unwrap();
        assert_eq!(rating.value, 4);
        assert_eq!(rating.timestamp.unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_bounds_are_inclusive() {
        assert!(Rating::try_from(RatingRecord::new("u1", "i1", 1.0, None)).is_ok());
        assert!(Rating::try_from(RatingRecord::new("u1", "i1", 5.0, None)).is_ok());
    }

    #[test]
    fn test_out_of_range_rejected() {
        let err = Rating::try_from(RatingRecord::new("u1", "i1", 0.0, None)).unwrap_err();
        assert!(matches!(err, DataError::OutOfRange { .. }));

        let err = Rating::try_from(RatingRecord::new("u1", "i1", 6.0, None)).unwrap_err();
        assert!(matches!(err, DataError::OutOfRange { .. }));

        let err = Rating::try_from(RatingRecord::new("u1", "i1", f64::NAN, None)).unwrap_err();
        assert!(matches!(err, DataError::OutOfRange { .. }));
    }

    #[test]
    fn test_fractional_rejected() {
        let err = Rating::try_from(RatingRecord::new("u1", "i1", 3.5, None)).unwrap_err();
        assert!(matches!(err, DataError::NotIntegral { .. }));
    }

    #[test]
    fn test_blank_ids_rejected() {
        let err = Rating::try_from(RatingRecord::new(" ", "i1", 3.0, None)).unwrap_err();
        assert_eq!(err, DataError::MissingId("user_id"));

        let err = Rating::try_from(RatingRecord::new("u1", "", 3.0, None)).unwrap_err();
        assert_eq!(err, DataError::MissingId("item_id"));
    }
}
