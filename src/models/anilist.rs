// ============================================================================
// AniList GraphQL API Types
// ============================================================================

use serde::Deserialize;

use super::{Candidate, MediaType, MetadataPatch};

/// GraphQL envelope; `data` is absent when the query failed
#[derive(Debug, Clone, Deserialize)]
pub struct AniListResponse {
    #[serde(default)]
    pub data: Option<AniListPageData>,
    #[serde(default)]
    pub errors: Vec<AniListError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AniListError {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AniListPageData {
    #[serde(rename = "Page")]
    pub page: AniListPage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AniListPage {
    #[serde(default)]
    pub media: Vec<AniListMedia>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AniListMedia {
    pub id: u64,
    #[serde(default)]
    pub id_mal: Option<u64>,
    #[serde(default)]
    pub title: AniListTitle,
    #[serde(default)]
    pub cover_image: Option<AniListCoverImage>,
    #[serde(default)]
    pub genres: Vec<String>,
    /// 0-100
    #[serde(default)]
    pub average_score: Option<f64>,
    #[serde(default)]
    pub episodes: Option<u32>,
    #[serde(default)]
    pub chapters: Option<u32>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AniListTitle {
    #[serde(default)]
    pub romaji: Option<String>,
    #[serde(default)]
    pub english: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AniListCoverImage {
    #[serde(default)]
    pub large: Option<String>,
}

/// Maps AniList release states onto the display vocabulary
///
/// Unknown values pass through untouched.
pub fn normalize_status(raw: &str) -> String {
    match raw {
        "FINISHED" => "Finished",
        "RELEASING" => "Publishing",
        "NOT_YET_RELEASED" => "Not Yet Released",
        "CANCELLED" => "Cancelled",
        "HIATUS" => "Hiatus",
        other => other,
    }
    .to_string()
}

impl AniListMedia {
    /// Candidate keyed by MAL id when AniList knows it, so it lines up with
    /// library entries and Jikan results
    pub fn into_candidate(self, media_type: MediaType) -> Option<Candidate> {
        let title = self.title.romaji.or(self.title.english)?;
        let external_id = self
            .id_mal
            .map(|id| id.to_string())
            .unwrap_or_else(|| format!("anilist:{}", self.id));

        Some(Candidate {
            external_id,
            title,
            media_type,
            thumbnail_url: self.cover_image.and_then(|c| c.large),
            genres: self.genres,
            quality_score: self.average_score.map(|s| s / 10.0),
            episodes: self.episodes,
            chapters: self.chapters,
            status: self.status.as_deref().map(normalize_status),
        })
    }

    pub fn metadata_patch(&self) -> MetadataPatch {
        MetadataPatch {
            episodes: self.episodes,
            chapters: self.chapters,
            status: self.status.as_deref().map(normalize_status),
        }
    }
}
