use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use super::MediaType;

/// Series id -> genre labels, fetched for one request only
pub type GenreSet = HashMap<String, Vec<String>>;

/// Cumulative rating weight contributed to one genre
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GenreWeight {
    pub weight: f64,
    pub count: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypePreference {
    pub avg: f64,
    pub total_weight: f64,
    pub count: u32,
}

/// A library entry whose rating carries a non-zero weight
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualifyingSeries {
    pub series_id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub rating: f64,
    pub weight: f64,
    pub external_id: Option<String>,
}

/// Taste profile derived from a rated library
///
/// Built once per request by `services::profile::build_preference_profile`
/// and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceProfile {
    pub genre_weights: HashMap<String, GenreWeight>,
    pub preferred_types: BTreeMap<MediaType, TypePreference>,
    pub qualifying_series: Vec<QualifyingSeries>,
    /// At most six genres, heaviest first
    pub top_genres: Vec<String>,
    pub completed_count: u32,
    pub dropped_count: u32,
}

impl PreferenceProfile {
    pub fn genre_weight(&self, genre: &str) -> Option<f64> {
        self.genre_weights.get(genre).map(|g| g.weight)
    }

    pub fn type_preference(&self, media_type: MediaType) -> Option<&TypePreference> {
        self.preferred_types.get(&media_type)
    }

    /// Preferred types by total weight, ties in anime/manga/manhwa order
    pub fn ranked_types(&self) -> Vec<MediaType> {
        let mut types: Vec<(MediaType, f64)> = self
            .preferred_types
            .iter()
            .map(|(media_type, pref)| (*media_type, pref.total_weight))
            .collect();
        types.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        types.into_iter().map(|(media_type, _)| media_type).collect()
    }

    pub fn summary(&self) -> ProfileSummary {
        ProfileSummary {
            top_genres: self.top_genres.clone(),
            preferred_types: self.ranked_types(),
            qualifying_series_count: self.qualifying_series.len(),
        }
    }
}

/// Compact view of the profile echoed back with personalized results
#[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    pub top_genres: Vec<String>,
    pub preferred_types: Vec<MediaType>,
    pub qualifying_series_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pref(total_weight: f64, count: u32) -> TypePreference {
        TypePreference {
            avg: total_weight / count as f64,
            total_weight,
            count,
        }
    }

    #[test]
    fn test_ranked_types_by_total_weight() {
        let mut profile = PreferenceProfile::default();
        profile.preferred_types.insert(MediaType::Anime, pref(0.8, 1));
        profile.preferred_types.insert(MediaType::Manhwa, pref(2.4, 3));
        profile.preferred_types.insert(MediaType::Manga, pref(1.6, 2));

        assert_eq!(
            profile.ranked_types(),
            vec![MediaType::Manhwa, MediaType::Manga, MediaType::Anime]
        );
    }

    #[test]
    fn test_ranked_types_ties_keep_fixed_order() {
        let mut profile = PreferenceProfile::default();
        profile.preferred_types.insert(MediaType::Manhwa, pref(1.0, 1));
        profile.preferred_types.insert(MediaType::Anime, pref(1.0, 1));

        assert_eq!(
            profile.ranked_types(),
            vec![MediaType::Anime, MediaType::Manhwa]
        );
    }
}
