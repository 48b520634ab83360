// ============================================================================
// Jikan (MyAnimeList) API Types
// ============================================================================

use serde::Deserialize;

use super::{Candidate, MediaType, TitleMatch};

/// List endpoints: search, genre browse, top feeds
#[derive(Debug, Clone, Deserialize)]
pub struct JikanListResponse {
    #[serde(default)]
    pub data: Vec<JikanMedia>,
}

/// Single-item endpoints such as `/anime/{id}/full`
#[derive(Debug, Clone, Deserialize)]
pub struct JikanItemResponse {
    pub data: JikanMedia,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JikanMedia {
    pub mal_id: u64,
    pub title: String,
    #[serde(default)]
    pub title_english: Option<String>,
    #[serde(default)]
    pub title_japanese: Option<String>,
    #[serde(default)]
    pub titles: Vec<JikanTitle>,
    #[serde(default)]
    pub images: Option<JikanImages>,
    #[serde(default)]
    pub genres: Vec<JikanNamed>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub episodes: Option<u32>,
    #[serde(default)]
    pub chapters: Option<u32>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub synopsis: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub published: Option<JikanPublished>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JikanTitle {
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JikanNamed {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JikanImages {
    #[serde(default)]
    pub jpg: Option<JikanImage>,
    #[serde(default)]
    pub webp: Option<JikanImage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JikanImage {
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JikanPublished {
    #[serde(default)]
    pub from: Option<String>,
}

impl JikanMedia {
    pub fn genre_names(&self) -> Vec<String> {
        self.genres.iter().map(|g| g.name.clone()).collect()
    }

    fn jpg_url(&self) -> Option<String> {
        self.images
            .as_ref()
            .and_then(|i| i.jpg.as_ref())
            .and_then(|i| i.image_url.clone())
    }

    fn webp_url(&self) -> Option<String> {
        self.images
            .as_ref()
            .and_then(|i| i.webp.as_ref())
            .and_then(|i| i.image_url.clone())
    }

    /// Release year, falling back to the publication start date for manga
    fn release_year(&self) -> Option<i32> {
        self.year.or_else(|| {
            self.published
                .as_ref()
                .and_then(|p| p.from.as_deref())
                .and_then(|from| from.get(..4))
                .and_then(|year| year.parse().ok())
        })
    }

    /// Normalizes into a candidate; `media_type` is the type that was asked for
    pub fn into_candidate(self, media_type: MediaType) -> Candidate {
        Candidate {
            external_id: self.mal_id.to_string(),
            thumbnail_url: self.jpg_url(),
            genres: self.genre_names(),
            quality_score: self.score,
            episodes: self.episodes,
            chapters: self.chapters,
            status: self.status,
            title: self.title,
            media_type,
        }
    }

    pub fn into_title_match(self, media_type: MediaType) -> TitleMatch {
        let mut alternate_titles: Vec<String> = Vec::new();
        let extra = self
            .title_english
            .iter()
            .chain(self.title_japanese.iter())
            .chain(self.titles.iter().map(|t| &t.title));
        for alt in extra {
            if !alt.is_empty() && *alt != self.title && !alternate_titles.contains(alt) {
                alternate_titles.push(alt.clone());
            }
        }

        TitleMatch {
            external_id: self.mal_id.to_string(),
            thumbnail_url: self.webp_url().or_else(|| self.jpg_url()),
            year: self.release_year(),
            alternate_titles,
            synopsis: self.synopsis,
            score: self.score,
            title: self.title,
            media_type,
        }
    }
}
