use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

/// Kind of series tracked in a library
///
/// Declaration order is the fixed order used whenever per-type results are
/// merged (anime, then manga, then manhwa).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Anime,
    Manga,
    Manhwa,
}

impl MediaType {
    pub const ALL: [MediaType; 3] = [MediaType::Anime, MediaType::Manga, MediaType::Manhwa];

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Anime => "anime",
            MediaType::Manga => "manga",
            MediaType::Manhwa => "manhwa",
        }
    }

    /// Catalog endpoint family: manhwa lives under manga upstream
    pub fn catalog_kind(&self) -> &'static str {
        match self {
            MediaType::Anime => "anime",
            MediaType::Manga | MediaType::Manhwa => "manga",
        }
    }
}

impl Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anime" => Ok(MediaType::Anime),
            "manga" => Ok(MediaType::Manga),
            "manhwa" => Ok(MediaType::Manhwa),
            other => Err(format!("unknown media type: {}", other)),
        }
    }
}

/// Progress status of a library entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WatchStatus {
    Watching,
    Reading,
    Completed,
    OnHold,
    Dropped,
    PlanToRead,
}

impl WatchStatus {
    /// Watching or reading right now
    pub fn is_active(&self) -> bool {
        matches!(self, WatchStatus::Watching | WatchStatus::Reading)
    }
}

impl FromStr for WatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "watching" => Ok(WatchStatus::Watching),
            "reading" => Ok(WatchStatus::Reading),
            "completed" => Ok(WatchStatus::Completed),
            "on-hold" => Ok(WatchStatus::OnHold),
            "dropped" => Ok(WatchStatus::Dropped),
            "plan-to-read" => Ok(WatchStatus::PlanToRead),
            other => Err(format!("unknown status: {}", other)),
        }
    }
}

/// One record of a user's library, as supplied by the library store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LibraryEntry {
    pub series_id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    /// MyAnimeList id, shared by both upstream catalogs
    #[serde(default)]
    pub external_id: Option<String>,
    /// 0-5 stars, absent when unrated
    #[serde(default)]
    pub rating: Option<f64>,
    pub status: WatchStatus,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub last_progress: Option<String>,
}
