use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::models::{DataError, Rating, RatingRecord};

/// Item id to star value, ordered by item id
pub type RatingVector = BTreeMap<String, u8>;

/// Sparse user × item rating matrix
///
/// Unrated pairs are absent rather than zero. Both axes are kept in id order so
/// every computation over the matrix sums in the same sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserItemMatrix {
    rows: BTreeMap<String, RatingVector>,
}

impl UserItemMatrix {
    /// Rating vector of one user, `None` when the user has no valid ratings
    pub fn ratings_of(&self, user_id: &str) -> Option<&RatingVector> {
        self.rows.get(user_id)
    }

    pub fn contains_user(&self, user_id: &str) -> bool {
        self.rows.contains_key(user_id)
    }

    /// Every (user, ratings) row in user id order
    pub fn rows(&self) -> impl Iterator<Item = (&String, &RatingVector)> {
        self.rows.iter()
    }

    pub fn user_count(&self) -> usize {
        self.rows.len()
    }

    pub fn item_count(&self) -> usize {
        let mut items: Vec<&String> = self.rows.values().flat_map(|r| r.keys()).collect();
        items.sort();
        items.dedup();
        items.len()
    }

    /// Number of observed (user, item) cells
    pub fn rating_count(&self) -> usize {
        self.rows.values().map(|r| r.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Result of a matrix build: the matrix plus every row that was rejected
#[derive(Debug, Default)]
pub struct MatrixBuild {
    pub matrix: UserItemMatrix,
    pub rejected: Vec<DataError>,
}

/// Turns raw rating rows into a [`UserItemMatrix`]
#[derive(Debug, Clone, Copy)]
pub struct MatrixBuilder {
    min_ratings_per_user: usize,
    min_ratings_per_item: usize,
    max_users: Option<usize>,
    max_items: Option<usize>,
}

impl Default for MatrixBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MatrixBuilder {
    /// Builder that keeps every user and item with at least one valid rating
    pub fn new() -> Self {
        Self {
            min_ratings_per_user: 1,
            min_ratings_per_item: 1,
            max_users: None,
            max_items: None,
        }
    }

    /// Drops users and items with fewer valid ratings than the given minimums.
    /// Users are pruned first, then items, in a single pass.
    pub fn with_min_ratings(mut self, per_user: usize, per_item: usize) -> Self {
        self.min_ratings_per_user = per_user.max(1);
        self.min_ratings_per_item = per_item.max(1);
        self
    }

    /// Keeps only the most active users and items after minimum-count pruning.
    /// Activity is the number of ratings; equal counts go to the smaller id.
    pub fn with_max_axes(mut self, max_users: Option<usize>, max_items: Option<usize>) -> Self {
        self.max_users = max_users;
        self.max_items = max_items;
        self
    }

    /// Validates every record and pivots the valid ones into a matrix
    ///
    /// Invalid rows are collected in [`MatrixBuild::rejected`] and never abort
    /// the build. When the same (user, item) pair occurs twice, the observation
    /// with the later timestamp wins; with equal or missing timestamps the one
    /// seen last wins.
    pub fn build<I>(&self, records: I) -> MatrixBuild
    where
        I: IntoIterator<Item = RatingRecord>,
    {
        let mut cells: BTreeMap<String, BTreeMap<String, (u8, Option<DateTime<Utc>>)>> =
            BTreeMap::new();
        let mut rejected = Vec::new();

        for record in records {
            let rating = match Rating::try_from(record) {
                Ok(rating) => rating,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping invalid rating");
                    rejected.push(e);
                    continue;
                }
            };

            let row = cells.entry(rating.user_id).or_default();
            let newer_seen = matches!(
                row.get(&rating.item_id),
                Some((_, seen_at)) if *seen_at > rating.timestamp
            );
            if !newer_seen {
                row.insert(rating.item_id, (rating.value, rating.timestamp));
            }
        }

        let mut rows: BTreeMap<String, RatingVector> = cells
            .into_iter()
            .map(|(user, row)| {
                let vector = row.into_iter().map(|(item, (value, _))| (item, value)).collect();
                (user, vector)
            })
            .collect();

        self.prune(&mut rows);

        let matrix = UserItemMatrix { rows };

        tracing::debug!(
            users = matrix.user_count(),
            ratings = matrix.rating_count(),
            rejected = rejected.len(),
            "User-item matrix built"
        );

        MatrixBuild { matrix, rejected }
    }

    fn prune(&self, rows: &mut BTreeMap<String, RatingVector>) {
        if self.min_ratings_per_user > 1 {
            rows.retain(|_, row| row.len() >= self.min_ratings_per_user);
        }

        if self.min_ratings_per_item > 1 {
            let mut item_counts: HashMap<String, usize> = HashMap::new();
            for row in rows.values() {
                for item in row.keys() {
                    *item_counts.entry(item.clone()).or_default() += 1;
                }
            }
            for row in rows.values_mut() {
                row.retain(|item, _| item_counts[item] >= self.min_ratings_per_item);
            }
        }

        if self.max_users.is_some() || self.max_items.is_some() {
            let mut item_counts: HashMap<&str, usize> = HashMap::new();
            for row in rows.values() {
                for item in row.keys() {
                    *item_counts.entry(item.as_str()).or_default() += 1;
                }
            }
            let user_counts = rows.iter().map(|(user, row)| (user.as_str(), row.len()));

            let top_users = self.max_users.map(|n| most_active(user_counts, n));
            let top_items = self.max_items.map(|n| most_active(item_counts, n));

            if let Some(top) = &top_users {
                rows.retain(|user, _| top.contains(user));
            }
            if let Some(top) = &top_items {
                for row in rows.values_mut() {
                    row.retain(|item, _| top.contains(item));
                }
            }
        }

        rows.retain(|_, row| !row.is_empty());
    }
}

/// Ids of the `n` entries with the highest count, ties to the smaller id
fn most_active<'a>(counts: impl IntoIterator<Item = (&'a str, usize)>, n: usize) -> BTreeSet<String> {
    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(n)
        .map(|(id, _)| id.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(user: &str, item: &str, rating: f64) -> RatingRecord {
        RatingRecord::new(user, item, rating, None)
    }

    #[test]
    fn test_build_pivots_valid_ratings() {
        let build = MatrixBuilder::new().build(vec![
            record("u1", "i1", 5.0),
            record("u1", "i2", 3.0),
            record("u2", "i1", 4.0),
        ]);

        assert!(build.rejected.is_empty());
        assert_eq!(build.matrix.user_count(), 2);
        assert_eq!(build.matrix.item_count(), 2);
        assert_eq!(build.matrix.rating_count(), 3);
        assert_eq!(build.matrix.ratings_of("u1").unwrap()["i2"], 3);
    }

    #[test]
    fn test_invalid_ratings_are_skipped_not_fatal() {
        let build = MatrixBuilder::new().build(vec![
            record("u1", "i1", 5.0),
            record("u1", "i2", 9.0),
            record("u2", "i1", 0.0),
            record("u2", "i3", 2.5),
        ]);

        assert_eq!(build.rejected.len(), 3);
        assert_eq!(build.matrix.rating_count(), 1);
        // u2 only had invalid ratings, so it is not an axis at all
        assert!(!build.matrix.contains_user("u2"));
    }

    #[test]
    fn test_later_duplicate_wins() {
        let build = MatrixBuilder::new().build(vec![
            RatingRecord::new("u1", "i1", 2.0, Some(200)),
            RatingRecord::new("u1", "i1", 5.0, Some(100)),
            RatingRecord::new("u1", "i2", 1.0, None),
            RatingRecord::new("u1", "i2", 4.0, None),
        ]);

        let row = build.matrix.ratings_of("u1").unwrap();
        assert_eq!(row["i1"], 2);
        assert_eq!(row["i2"], 4);
        assert_eq!(build.matrix.rating_count(), 2);
    }

    #[test]
    fn test_min_ratings_pruning() {
        let build = MatrixBuilder::new().with_min_ratings(2, 2).build(vec![
            record("u1", "i1", 5.0),
            record("u1", "i2", 3.0),
            record("u2", "i1", 4.0),
            record("u2", "i3", 5.0),
            record("u3", "i2", 5.0),
        ]);

        // u3 dropped for having one rating; then i2 and i3 each have one left
        assert!(!build.matrix.contains_user("u3"));
        assert_eq!(build.matrix.item_count(), 1);
        assert_eq!(build.matrix.ratings_of("u1").unwrap().len(), 1);
        assert_eq!(build.matrix.ratings_of("u2").unwrap().len(), 1);
    }

    #[test]
    fn test_max_axes_keep_most_active() {
        let build = MatrixBuilder::new().with_max_axes(Some(2), Some(2)).build(vec![
            record("u1", "i1", 5.0),
            record("u1", "i2", 3.0),
            record("u1", "i3", 4.0),
            record("u2", "i1", 4.0),
            record("u2", "i2", 2.0),
            record("u3", "i1", 1.0),
            record("u3", "i3", 5.0),
            record("u4", "i4", 5.0),
        ]);

        // u2 and u3 tie on two ratings; u2 wins on id
        let users: Vec<&String> = build.matrix.rows().map(|(u, _)| u).collect();
        assert_eq!(users, vec!["u1", "u2"]);
        // i2 and i3 tie on two ratings; i2 wins on id
        assert_eq!(build.matrix.item_count(), 2);
        assert_eq!(build.matrix.ratings_of("u1").unwrap().len(), 2);
        assert!(!build.matrix.ratings_of("u1").unwrap().contains_key("i3"));
    }

    #[test]
    fn test_max_axes_unlimited_by_default() {
        let records = vec![
            record("u1", "i1", 5.0),
            record("u2", "i2", 3.0),
            record("u3", "i3", 4.0),
        ];
        let capped = MatrixBuilder::new().with_max_axes(None, None).build(records.clone());
        assert_eq!(capped.matrix, MatrixBuilder::new().build(records).matrix);
        assert_eq!(capped.matrix.user_count(), 3);
    }

    #[test]
    fn test_empty_input() {
        let build = MatrixBuilder::new().build(Vec::new());
        assert!(build.matrix.is_empty());
        assert_eq!(build.matrix.item_count(), 0);
    }
}
