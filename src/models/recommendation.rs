use serde::{Deserialize, Serialize};

/// A predicted item for a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub item_id: String,
    pub predicted_score: f64,
    /// 1-based position in the ranked list
    pub rank: usize,
    pub explanation: String,
}

/// Response body for `GET /recommendations/{user_id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub user_id: String,
    pub k: usize,
    pub recommendations: Vec<Recommendation>,
}
