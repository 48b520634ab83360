use futures::future::join_all;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::instrument;

use crate::{
    db::CachePolicy,
    error::{AppError, AppResult},
    models::{
        Candidate, ContinueItem, ContinueResponse, GenreSet, LibraryEntry, MediaType,
        PreferenceProfile, QualifyingSeries, Recommendation, RecommendationResponse, Tier,
    },
    services::{
        franchise::extract_franchise,
        profile::{build_preference_profile, qualifying_series},
        providers::{settle, CatalogGateway},
        ranking::{filter_existing, rank, score_candidate, ScoringConfig},
        tiering::TierPolicy,
    },
};

const TOTAL_FAILURE: &str = "Failed to fetch any recommendation candidates";
const TRENDING_REASON: &str = "Trending now";
const CONTINUE_REASON: &str = "Continue where you left off";
const NO_HISTORY_MESSAGE: &str = "Rate more series to get personalized recommendations";
const FALLBACK_GENRE: &str = "Action";
const MAX_CONTINUE_ITEMS: usize = 5;

/// Fan-out sizes and thresholds of the recommendation pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Qualifying series whose genres get looked up, in library order
    pub genre_lookup_limit: usize,
    pub tiers: TierPolicy,
    pub scoring: ScoringConfig,
    pub top_genre_count: usize,
    pub top_type_count: usize,
    /// Candidates requested per genre x type fetch
    pub genre_fetch_limit: u32,
    /// Candidates requested by the fallback genre fetch
    pub fallback_fetch_limit: u32,
    /// Trending titles requested per type for users without history
    pub trending_per_type: u32,
    pub early_trending_limit: u32,
    pub browse_page_size: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            genre_lookup_limit: 8,
            tiers: TierPolicy::default(),
            scoring: ScoringConfig::default(),
            top_genre_count: 3,
            top_type_count: 2,
            genre_fetch_limit: 8,
            fallback_fetch_limit: 15,
            trending_per_type: 5,
            early_trending_limit: 5,
            browse_page_size: 10,
        }
    }
}

/// Caller-controlled knobs of one recommendation request
#[derive(Debug, Clone, Default)]
pub struct RecommendationQuery {
    /// Explicit type filter; switches to browsing that type's trending list
    pub media_type: Option<MediaType>,
    /// Page of the browse list, 1-based
    pub page: Option<u32>,
    /// Skip cached catalog responses
    pub refresh: bool,
}

impl RecommendationQuery {
    fn is_browse(&self) -> bool {
        self.media_type.is_some() || self.page.is_some()
    }

    fn cache_policy(&self) -> CachePolicy {
        if self.refresh {
            CachePolicy::Bypass
        } else {
            CachePolicy::Prefer
        }
    }
}

/// Turns a rated library into ranked recommendations
#[derive(Clone)]
pub struct RecommendationService {
    gateway: Arc<dyn CatalogGateway>,
    config: PipelineConfig,
}

impl RecommendationService {
    pub fn new(gateway: Arc<dyn CatalogGateway>, config: PipelineConfig) -> Self {
        Self { gateway, config }
    }

    #[instrument(skip_all, fields(entries = library.len(), refresh = query.refresh))]
    pub async fn recommend(
        &self,
        library: &[LibraryEntry],
        query: &RecommendationQuery,
    ) -> AppResult<RecommendationResponse> {
        validate_library(library)?;
        let policy = query.cache_policy();

        if query.is_browse() {
            return self.browse(library, query, policy).await;
        }

        let qualifying = qualifying_series(library);
        let tier = self.config.tiers.select_tier(qualifying.len());

        let response = match tier {
            Tier::NoHistory => self.no_history(library, policy).await?,
            Tier::EarlyStage => self.early_stage(library, &qualifying, policy).await?,
            Tier::Established => self.established(library, &qualifying, policy).await?,
            Tier::Browse => self.browse(library, query, policy).await?,
        };

        tracing::info!(
            tier = tier.as_str(),
            qualifying = qualifying.len(),
            count = response.count,
            "Recommendations generated"
        );

        Ok(response)
    }

    /// Trending across every type, for users with nothing rated highly enough
    async fn no_history(&self, library: &[LibraryEntry], policy: CachePolicy) -> AppResult<RecommendationResponse> {
        let fetches = MediaType::ALL
            .iter()
            .map(|media_type| {
                self.gateway
                    .fetch_trending(*media_type, 1, self.config.trending_per_type, policy)
            });

        // Interleaved in the fixed type order so truncation keeps every type
        let batches = settle(join_all(fetches).await, "trending").into_result(TOTAL_FAILURE)?;
        let pool = interleave(batches);

        let profile = PreferenceProfile::default();
        let recommendations: Vec<Recommendation> = filter_existing(pool, library)
            .into_iter()
            .take(self.config.scoring.max_results)
            .map(|candidate| self.trending_recommendation(candidate, &profile))
            .collect();

        let mut response = RecommendationResponse::new(recommendations, Tier::NoHistory);
        response.message = Some(NO_HISTORY_MESSAGE.to_string());
        Ok(response)
    }

    /// One personalized genre fetch blended with a short trending list
    async fn early_stage(
        &self,
        library: &[LibraryEntry],
        qualifying: &[QualifyingSeries],
        policy: CachePolicy,
    ) -> AppResult<RecommendationResponse> {
        let genres = self.lookup_genres(qualifying).await;
        let profile = build_preference_profile(library, &genres);

        let favourite_type = profile
            .ranked_types()
            .first()
            .copied()
            .unwrap_or(MediaType::Anime);
        let top_genre = profile.top_genres.first().cloned();

        let personal = async {
            match &top_genre {
                Some(genre) => Some(
                    self.gateway
                        .fetch_by_genre(genre, favourite_type, self.config.genre_fetch_limit, policy)
                        .await,
                ),
                None => None,
            }
        };
        let trending = self.gateway.fetch_trending(
            favourite_type,
            1,
            self.config.early_trending_limit,
            policy,
        );
        let (personal, trending) = tokio::join!(personal, trending);

        let mut outcomes = vec![trending];
        outcomes.extend(personal);
        let mut pools = settle(outcomes, "early stage").into_result(TOTAL_FAILURE)?.into_iter();
        let trending_pool = pools.next().unwrap_or_default();
        let personal_pool = pools.next().unwrap_or_default();

        let mut recommendations = rank(personal_pool, library, &profile, &self.config.scoring);
        self.fill_with_trending(&mut recommendations, trending_pool, library, &profile);

        let mut response = RecommendationResponse::new(recommendations, Tier::EarlyStage);
        response.profile = Some(profile.summary());
        Ok(response)
    }

    /// Top genres x preferred types search, ranked and enriched
    async fn established(
        &self,
        library: &[LibraryEntry],
        qualifying: &[QualifyingSeries],
        policy: CachePolicy,
    ) -> AppResult<RecommendationResponse> {
        let genres = self.lookup_genres(qualifying).await;
        let profile = build_preference_profile(library, &genres);

        let types: Vec<MediaType> = profile
            .ranked_types()
            .into_iter()
            .take(self.config.top_type_count)
            .collect();

        let mut searches: Vec<(&str, MediaType, u32)> = profile
            .top_genres
            .iter()
            .take(self.config.top_genre_count)
            .flat_map(|genre| {
                types
                    .iter()
                    .map(move |media_type| (genre.as_str(), *media_type, self.config.genre_fetch_limit))
            })
            .collect();

        if searches.is_empty() {
            if let Some(top_type) = types.first() {
                tracing::info!(media_type = %top_type, "No genre data available, using fallback genre");
                searches.push((FALLBACK_GENRE, *top_type, self.config.fallback_fetch_limit));
            }
        }

        let fetches = searches
            .iter()
            .map(|(genre, media_type, limit)| self.gateway.fetch_by_genre(genre, *media_type, *limit, policy));
        let batches = settle(join_all(fetches).await, "genre candidates").into_result(TOTAL_FAILURE)?;

        let mut seen_ids = HashSet::new();
        let pool: Vec<Candidate> = batches
            .into_iter()
            .flatten()
            .filter(|c| seen_ids.insert(c.external_id.clone()))
            .collect();

        tracing::debug!(
            searches = searches.len(),
            pool_size = pool.len(),
            "Candidate pool assembled"
        );

        let mut recommendations = rank(pool, library, &profile, &self.config.scoring);
        self.enrich(&mut recommendations).await;

        let mut response = RecommendationResponse::new(recommendations, Tier::Established);
        response.profile = Some(profile.summary());
        Ok(response)
    }

    /// One type's trending page; bypasses tier selection entirely
    async fn browse(
        &self,
        library: &[LibraryEntry],
        query: &RecommendationQuery,
        policy: CachePolicy,
    ) -> AppResult<RecommendationResponse> {
        let page = query.page.unwrap_or(1);
        if page == 0 {
            return Err(AppError::InvalidInput("page starts at 1".to_string()));
        }
        let media_type = query.media_type.unwrap_or(MediaType::Anime);

        let fetched = self
            .gateway
            .fetch_trending(media_type, page, self.config.browse_page_size, policy)
            .await;
        let pool: Vec<Candidate> = settle(vec![fetched], "browse")
            .into_result(TOTAL_FAILURE)?
            .into_iter()
            .flatten()
            .collect();

        // Type and quality signals only; browsing never triggers genre lookups
        let profile = build_preference_profile(library, &GenreSet::new());
        let recommendations: Vec<Recommendation> = filter_existing(pool, library)
            .into_iter()
            .map(|candidate| self.trending_recommendation(candidate, &profile))
            .collect();

        tracing::info!(media_type = %media_type, page, count = recommendations.len(), "Browse page served");

        let mut response = RecommendationResponse::new(recommendations, Tier::Browse);
        response.page = Some(page);
        Ok(response)
    }

    /// Genre labels for the first qualifying series that carry an external id
    ///
    /// A failed lookup only costs that series its genre contribution.
    async fn lookup_genres(&self, qualifying: &[QualifyingSeries]) -> GenreSet {
        let targets: Vec<(&QualifyingSeries, &str)> = qualifying
            .iter()
            .filter_map(|series| series.external_id.as_deref().map(|id| (series, id)))
            .take(self.config.genre_lookup_limit)
            .collect();

        let lookups = targets
            .iter()
            .map(|(series, id)| self.gateway.fetch_series_genres(id, series.media_type));
        let outcome = settle(join_all(lookups).await, "series genres");

        targets
            .iter()
            .zip(outcome.values)
            .filter(|(_, genres)| !genres.is_empty())
            .map(|((series, _), genres)| (series.series_id.clone(), genres))
            .collect()
    }

    /// Appends trending titles until the list is full, skipping ids and
    /// franchises already present
    fn fill_with_trending(
        &self,
        recommendations: &mut Vec<Recommendation>,
        trending: Vec<Candidate>,
        library: &[LibraryEntry],
        profile: &PreferenceProfile,
    ) {
        let mut ids: HashSet<String> = recommendations
            .iter()
            .map(|r| r.candidate.external_id.clone())
            .collect();
        let mut franchises: HashSet<String> = recommendations
            .iter()
            .map(|r| extract_franchise(&r.candidate.title))
            .collect();

        for candidate in filter_existing(trending, library) {
            if recommendations.len() >= self.config.scoring.max_results {
                break;
            }
            let franchise = extract_franchise(&candidate.title);
            if ids.contains(&candidate.external_id) || franchises.contains(&franchise) {
                continue;
            }
            let filler = self.trending_recommendation(candidate, profile);
            if filler.score <= self.config.scoring.noise_floor {
                tracing::debug!(id = %filler.candidate.external_id, score = filler.score, "Trending filler below noise floor");
                continue;
            }
            ids.insert(filler.candidate.external_id.clone());
            franchises.insert(franchise);
            recommendations.push(filler);
        }
    }

    fn trending_recommendation(&self, candidate: Candidate, profile: &PreferenceProfile) -> Recommendation {
        Recommendation {
            score: score_candidate(&candidate, profile, &self.config.scoring),
            reason: TRENDING_REASON.to_string(),
            candidate,
        }
    }

    /// Patches missing episode/chapter/status fields from the secondary catalog
    ///
    /// Best effort: a failed lookup leaves the affected entries as they were.
    async fn enrich(&self, recommendations: &mut [Recommendation]) {
        let mut missing: BTreeMap<MediaType, Vec<String>> = BTreeMap::new();
        for rec in recommendations.iter() {
            if rec.candidate.is_missing_metadata() {
                missing
                    .entry(rec.candidate.media_type)
                    .or_default()
                    .push(rec.candidate.external_id.clone());
            }
        }

        if missing.is_empty() {
            return;
        }

        let lookups = missing
            .iter()
            .map(|(media_type, ids)| self.gateway.enrich_metadata(*media_type, ids));
        let results = join_all(lookups).await;

        for (media_type, result) in missing.keys().zip(results) {
            match result {
                Ok(patches) => {
                    for rec in recommendations
                        .iter_mut()
                        .filter(|r| r.candidate.media_type == *media_type)
                    {
                        if let Some(patch) = patches.get(&rec.candidate.external_id) {
                            rec.candidate.apply_patch(patch);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, media_type = %media_type, "Metadata enrichment failed");
                }
            }
        }
    }
}

/// Round-robin merge: first of each batch, then second of each, and so on
fn interleave(batches: Vec<Vec<Candidate>>) -> Vec<Candidate> {
    let mut iters: Vec<_> = batches.into_iter().map(Vec::into_iter).collect();
    let mut merged = Vec::new();
    loop {
        let before = merged.len();
        merged.extend(iters.iter_mut().filter_map(Iterator::next));
        if merged.len() == before {
            return merged;
        }
    }
}

/// Rejects libraries with ratings outside the 0-5 star range
pub fn validate_library(library: &[LibraryEntry]) -> AppResult<()> {
    for entry in library {
        if let Some(rating) = entry.rating {
            if !rating.is_finite() || !(0.0..=5.0).contains(&rating) {
                return Err(AppError::InvalidInput(format!(
                    "rating for '{}' must be between 0 and 5, got {}",
                    entry.title, rating
                )));
            }
        }
    }
    Ok(())
}

/// In-progress series, most recently touched first
pub fn continue_recommendations(library: &[LibraryEntry]) -> ContinueResponse {
    let mut active: Vec<&LibraryEntry> = library.iter().filter(|e| e.status.is_active()).collect();
    active.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

    let recommendations: Vec<ContinueItem> = active
        .into_iter()
        .take(MAX_CONTINUE_ITEMS)
        .map(|entry| ContinueItem {
            series_id: entry.series_id.clone(),
            title: entry.title.clone(),
            media_type: entry.media_type,
            thumbnail_url: entry.thumbnail_url.clone(),
            last_progress: entry.last_progress.clone(),
            updated_at: entry.updated_at,
            status: entry.status,
            reason: CONTINUE_REASON.to_string(),
        })
        .collect();

    ContinueResponse {
        count: recommendations.len(),
        recommendations,
    }
}
