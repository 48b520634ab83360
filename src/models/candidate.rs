use serde::{Deserialize, Serialize};

use super::MediaType;

/// A title fetched from an upstream catalog, normalized to one shape
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub external_id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    /// Upstream community score on a 0-10 scale
    #[serde(default)]
    pub quality_score: Option<f64>,
    #[serde(default)]
    pub episodes: Option<u32>,
    #[serde(default)]
    pub chapters: Option<u32>,
    #[serde(default)]
    pub status: Option<String>,
}

impl Candidate {
    /// Fills episode/chapter/status fields that the primary catalog left empty
    pub fn apply_patch(&mut self, patch: &MetadataPatch) {
        if self.episodes.is_none() {
            self.episodes = patch.episodes;
        }
        if self.chapters.is_none() {
            self.chapters = patch.chapters;
        }
        if self.status.is_none() {
            self.status = patch.status.clone();
        }
    }

    pub fn is_missing_metadata(&self) -> bool {
        let count_missing = match self.media_type {
            MediaType::Anime => self.episodes.is_none(),
            MediaType::Manga | MediaType::Manhwa => self.chapters.is_none(),
        };
        count_missing || self.status.is_none()
    }
}

/// Secondary-catalog metadata used to patch incomplete candidates
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MetadataPatch {
    pub episodes: Option<u32>,
    pub chapters: Option<u32>,
    pub status: Option<String>,
}

/// A scored candidate as returned to the caller
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub score: f64,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manhwa(chapters: Option<u32>, status: Option<&str>) -> Candidate {
        Candidate {
            external_id: "1".to_string(),
            title: "Tower of God".to_string(),
            media_type: MediaType::Manhwa,
            thumbnail_url: None,
            genres: vec![],
            quality_score: Some(8.1),
            episodes: None,
            chapters,
            status: status.map(str::to_string),
        }
    }

    #[test]
    fn test_apply_patch_fills_only_missing_fields() {
        let mut candidate = manhwa(Some(550), None);
        candidate.apply_patch(&MetadataPatch {
            episodes: None,
            chapters: Some(999),
            status: Some("Hiatus".to_string()),
        });

        assert_eq!(candidate.chapters, Some(550));
        assert_eq!(candidate.status, Some("Hiatus".to_string()));
    }

    #[test]
    fn test_is_missing_metadata_by_type() {
        assert!(manhwa(None, Some("Publishing")).is_missing_metadata());
        assert!(manhwa(Some(10), None).is_missing_metadata());
        assert!(!manhwa(Some(10), Some("Publishing")).is_missing_metadata());
    }

    #[test]
    fn test_recommendation_serializes_flat() {
        let rec = Recommendation {
            candidate: manhwa(Some(10), None),
            score: 0.75,
            reason: "For you".to_string(),
        };
        let value = serde_json::to_value(&rec).unwrap();
        assert_eq!(value["externalId"], "1");
        assert_eq!(value["type"], "manhwa");
        assert_eq!(value["qualityScore"], 8.1);
        assert_eq!(value["score"], 0.75);
        assert_eq!(value["reason"], "For you");
    }
}
