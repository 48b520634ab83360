use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{MediaType, ProfileSummary, Recommendation, WatchStatus};

/// Which data-gathering path produced a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// No qualifying ratings: trending titles only
    NoHistory,
    /// A handful of qualifying ratings: trending blended with one genre fetch
    EarlyStage,
    /// Enough ratings for the full genre x type search
    Established,
    /// Caller asked for a specific type or page
    Browse,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::NoHistory => "no_history",
            Tier::EarlyStage => "early_stage",
            Tier::Established => "established",
            Tier::Browse => "browse",
        }
    }
}

/// Response body of the recommendation endpoints
///
/// `recommendations` is already in final order; callers must not re-sort.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationResponse {
    pub recommendations: Vec<Recommendation>,
    pub count: usize,
    pub tier: Tier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<ProfileSummary>,
}

impl RecommendationResponse {
    pub fn new(recommendations: Vec<Recommendation>, tier: Tier) -> Self {
        Self {
            count: recommendations.len(),
            recommendations,
            tier,
            page: None,
            message: None,
            profile: None,
        }
    }
}

/// An in-progress series the user can pick back up
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContinueItem {
    pub series_id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub thumbnail_url: Option<String>,
    pub last_progress: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub status: WatchStatus,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContinueResponse {
    pub recommendations: Vec<ContinueItem>,
    pub count: usize,
}

/// Title search hit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TitleMatch {
    pub external_id: String,
    pub title: String,
    pub alternate_titles: Vec<String>,
    pub thumbnail_url: Option<String>,
    /// The type the caller searched for, even when the catalog files it as manga
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub synopsis: Option<String>,
    pub year: Option<i32>,
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleSearchResponse {
    pub results: Vec<TitleMatch>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_serialization() {
        assert_eq!(
            serde_json::to_string(&Tier::NoHistory).unwrap(),
            format!("\"{}\"", Tier::NoHistory.as_str())
        );
        assert_eq!(
            serde_json::to_string(&Tier::EarlyStage).unwrap(),
            "\"early_stage\""
        );
    }

    #[test]
    fn test_response_omits_empty_optionals() {
        let response = RecommendationResponse::new(vec![], Tier::Established);
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["count"], 0);
        assert_eq!(value["tier"], "established");
        assert!(value.get("page").is_none());
        assert!(value.get("message").is_none());
        assert!(value.get("profile").is_none());
    }
}
