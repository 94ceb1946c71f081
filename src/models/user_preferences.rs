use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::product::round2;
use super::rating::{Rating, MAX_RATING, MIN_RATING};

/// How many of a user's ratings fall into one category
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
}

/// Summary of what a user rates and how
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserPreferences {
    pub user_id: String,
    pub total_ratings: usize,
    pub average_rating: f64,
    /// Star value ("1".."5") to number of ratings with that value
    pub rating_distribution: BTreeMap<String, usize>,
    /// Most rated categories first
    pub preferred_categories: Vec<CategoryCount>,
}

impl UserPreferences {
    /// Creates an empty summary with every star bucket present
    pub fn new(user_id: &str) -> Self {
        let rating_distribution = (MIN_RATING..=MAX_RATING)
            .map(|stars| (stars.to_string(), 0))
            .collect();

        Self {
            user_id: user_id.to_string(),
            total_ratings: 0,
            average_rating: 0.0,
            rating_distribution,
            preferred_categories: Vec::new(),
        }
    }

    /// Builds the summary from a user's ratings
    ///
    /// `categories` maps item ids to catalog categories. Items missing from the
    /// catalog still count towards totals and the distribution.
    pub fn summarize(
        user_id: &str,
        ratings: &[Rating],
        categories: &HashMap<String, String>,
    ) -> Self {
        let mut prefs = Self::new(user_id);
        let mut category_counts: HashMap<&str, usize> = HashMap::new();
        let mut sum: u32 = 0;

        for rating in ratings {
            prefs.record(rating.value);
            sum += rating.value as u32;

            if let Some(category) = categories.get(&rating.item_id) {
                *category_counts.entry(category.as_str()).or_default() += 1;
            }
        }

        if prefs.total_ratings > 0 {
            prefs.average_rating = round2(sum as f64 / prefs.total_ratings as f64);
        }

        let mut preferred: Vec<CategoryCount> = category_counts
            .into_iter()
            .map(|(category, count)| CategoryCount {
                category: category.to_string(),
                count,
            })
            .collect();
        preferred.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.category.cmp(&b.category)));
        prefs.preferred_categories = preferred;

        prefs
    }

    fn record(&mut self, stars: u8) {
        self.total_ratings += 1;
        *self
            .rating_distribution
            .entry(stars.to_string())
            .or_default() += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rating(item_id: &str, value: u8) -> Rating {
        Rating {
            user_id: "u1".to_string(),
            item_id: item_id.to_string(),
            value,
            timestamp: None,
        }
    }

    #[test]
    fn test_new_preferences() {
        let prefs = UserPreferences::new("u1");
        assert_eq!(prefs.total_ratings, 0);
        assert_eq!(prefs.rating_distribution.len(), 5);
        assert!(prefs.rating_distribution.values().all(|&n| n == 0));
        assert!(prefs.preferred_categories.is_empty());
    }

    #[test]
    fn test_summarize_counts_and_average() {
        let ratings = vec![rating("i1", 5), rating("i2", 4), rating("i3", 4)];
        let prefs = UserPreferences::summarize("u1", &ratings, &HashMap::new());

        assert_eq!(prefs.total_ratings, 3);
        assert_eq!(prefs.average_rating, 4.33);
        assert_eq!(prefs.rating_distribution["4"], 2);
        assert_eq!(prefs.rating_distribution["5"], 1);
        assert_eq!(prefs.rating_distribution["1"], 0);
    }

    #[test]
    fn test_categories_sorted_by_volume_then_name() {
        let ratings = vec![
            rating("i1", 5),
            rating("i2", 3),
            rating("i3", 4),
            rating("i4", 2),
            rating("unknown", 1),
        ];
        let categories: HashMap<String, String> = [
            ("i1", "Electronics"),
            ("i2", "Books"),
            ("i3", "Electronics"),
            ("i4", "Audio"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let prefs = UserPreferences::summarize("u1", &ratings, &categories);

        assert_eq!(prefs.total_ratings, 5);
        let names: Vec<&str> = prefs
            .preferred_categories
            .iter()
            .map(|c| c.category.as_str())
            .collect();
        assert_eq!(names, vec!["Electronics", "Audio", "Books"]);
    }
}
