use std::collections::{HashMap, HashSet};

use crate::{
    models::{Candidate, LibraryEntry, PreferenceProfile, Recommendation},
    services::franchise::{extract_franchise, short_title},
};

/// Weights and cut-offs of the relevance score
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    pub genre_weight: f64,
    pub type_weight: f64,
    pub quality_weight: f64,
    /// Assumed maximum profile weight per candidate genre
    pub genre_ceiling: f64,
    /// Scores at or below this are dropped
    pub noise_floor: f64,
    pub max_results: usize,
    pub max_per_franchise: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            genre_weight: 0.6,
            type_weight: 0.25,
            quality_weight: 0.15,
            genre_ceiling: 2.0,
            noise_floor: 0.2,
            max_results: 10,
            max_per_franchise: 1,
        }
    }
}

/// Rating at which a qualifying series is named in explanations
const NAMED_SERIES_MIN_RATING: f64 = 4.0;

/// Relevance of a candidate to a profile, in [0, 1]
///
/// Missing signals (no genres, a type the user never rated, no upstream
/// score) contribute nothing.
pub fn score_candidate(candidate: &Candidate, profile: &PreferenceProfile, config: &ScoringConfig) -> f64 {
    let genre = if candidate.genres.is_empty() {
        0.0
    } else {
        let matched: f64 = candidate
            .genres
            .iter()
            .filter_map(|g| profile.genre_weight(g))
            .sum();
        let ceiling = config.genre_ceiling * candidate.genres.len() as f64;
        (matched / ceiling).clamp(0.0, 1.0)
    };

    let type_affinity = profile
        .type_preference(candidate.media_type)
        .map(|pref| pref.avg.clamp(0.0, 1.0))
        .unwrap_or(0.0);

    let quality = candidate
        .quality_score
        .map(|q| (q / 10.0).clamp(0.0, 1.0))
        .unwrap_or(0.0);

    config.genre_weight * genre + config.type_weight * type_affinity + config.quality_weight * quality
}

/// Short human-readable reason, most specific rule first
pub fn explain(candidate: &Candidate, profile: &PreferenceProfile) -> String {
    let liked: Vec<&str> = profile
        .qualifying_series
        .iter()
        .filter(|s| s.rating >= NAMED_SERIES_MIN_RATING)
        .take(2)
        .map(|s| short_title(&s.title))
        .collect();

    if let [first, second] = liked.as_slice() {
        return format!("You liked {} & {}", first, second);
    }

    let shared: Vec<&String> = candidate
        .genres
        .iter()
        .filter(|g| profile.top_genres.contains(*g))
        .collect();

    match (shared.as_slice(), liked.as_slice()) {
        ([first, second, ..], _) => format!("{} + {}", first, second),
        ([genre], _) => format!("{} {}", genre, candidate.media_type),
        ([], [only]) => format!("Similar to {}", only),
        _ => "For you".to_string(),
    }
}

/// Drops candidates already in the library, by external id and then by title
pub fn filter_existing(candidates: Vec<Candidate>, library: &[LibraryEntry]) -> Vec<Candidate> {
    let known_ids: HashSet<&str> = library
        .iter()
        .filter_map(|e| e.external_id.as_deref())
        .collect();
    let known_titles: HashSet<String> = library.iter().map(|e| e.title.to_lowercase()).collect();

    candidates
        .into_iter()
        .filter(|c| {
            !known_ids.contains(c.external_id.as_str())
                && !known_titles.contains(&c.title.to_lowercase())
        })
        .collect()
}

/// Keeps at most `max_per_franchise` entries per franchise, in input order
pub fn dedupe_by_franchise(recommendations: Vec<Recommendation>, max_per_franchise: usize) -> Vec<Recommendation> {
    let mut seen: HashMap<String, usize> = HashMap::new();

    recommendations
        .into_iter()
        .filter(|rec| {
            let count = seen.entry(extract_franchise(&rec.candidate.title)).or_insert(0);
            *count += 1;
            *count <= max_per_franchise
        })
        .collect()
}

/// Full post-scoring pipeline
///
/// Library filter, noise floor, stable sort by score, franchise dedup, then
/// truncation. The returned order is final.
pub fn rank(
    candidates: Vec<Candidate>,
    library: &[LibraryEntry],
    profile: &PreferenceProfile,
    config: &ScoringConfig,
) -> Vec<Recommendation> {
    let pool_size = candidates.len();

    let mut scored: Vec<Recommendation> = filter_existing(candidates, library)
        .into_iter()
        .filter_map(|candidate| {
            let score = score_candidate(&candidate, profile, config);
            (score > config.noise_floor).then(|| Recommendation {
                reason: explain(&candidate, profile),
                candidate,
                score,
            })
        })
        .collect();

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    let mut ranked = dedupe_by_franchise(scored, config.max_per_franchise);
    ranked.truncate(config.max_results);

    tracing::debug!(pool_size, ranked = ranked.len(), "Candidates ranked");

    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GenreSet, MediaType};
    use crate::services::profile::{build_preference_profile, test_support::entry};

    fn candidate(id: &str, title: &str, media_type: MediaType, genres: &[&str], quality: Option<f64>) -> Candidate {
        Candidate {
            external_id: id.to_string(),
            title: title.to_string(),
            media_type,
            thumbnail_url: None,
            genres: genres.iter().map(|g| g.to_string()).collect(),
            quality_score: quality,
            episodes: None,
            chapters: None,
            status: None,
        }
    }

    /// Five manga rated 5.0, all tagged Action only
    fn action_fan() -> (Vec<LibraryEntry>, PreferenceProfile) {
        let library: Vec<LibraryEntry> = (1..=5)
            .map(|i| entry(&format!("s{}", i), &format!("Action Manga {}", i), MediaType::Manga, Some(5.0)))
            .collect();
        let genres: GenreSet = library
            .iter()
            .map(|e| (e.series_id.clone(), vec!["Action".to_string()]))
            .collect();
        let profile = build_preference_profile(&library, &genres);
        (library, profile)
    }

    #[test]
    fn test_full_genre_match_scoring() {
        let (_, profile) = action_fan();
        let config = ScoringConfig::default();

        let action = candidate("900", "Hunter x Hunter", MediaType::Anime, &["Action"], Some(9.0));
        let romance = candidate("901", "Kimi ni Todoke", MediaType::Anime, &["Romance"], Some(9.0));

        let action_score = score_candidate(&action, &profile, &config);
        let romance_score = score_candidate(&romance, &profile, &config);

        assert!((action_score - (0.6 + 0.15 * 0.9)).abs() < 1e-9);
        assert!((romance_score - 0.15 * 0.9).abs() < 1e-9);
        assert!(action_score > romance_score);
    }

    #[test]
    fn test_type_affinity_adds_to_score() {
        let (_, profile) = action_fan();
        let config = ScoringConfig::default();

        let manga = candidate("902", "Kingdom", MediaType::Manga, &["Action"], Some(9.0));
        let score = score_candidate(&manga, &profile, &config);
        assert!((score - (0.6 + 0.25 + 0.135)).abs() < 1e-9);
    }

    #[test]
    fn test_partial_genre_match_is_normalized() {
        let (_, profile) = action_fan();
        let config = ScoringConfig::default();

        // 5.0 Action weight against a ceiling of 2.0 x 4 genres
        let mixed = candidate("903", "Mixed", MediaType::Anime, &["Action", "Romance", "Comedy", "Drama"], None);
        let score = score_candidate(&mixed, &profile, &config);
        assert!((score - 0.6 * (5.0 / 8.0)).abs() < 1e-9);
    }

    #[test]
    fn test_missing_signals_score_zero() {
        let profile = PreferenceProfile::default();
        let bare = candidate("904", "Unknown", MediaType::Manhwa, &[], None);
        assert_eq!(score_candidate(&bare, &profile, &ScoringConfig::default()), 0.0);
    }

    #[test]
    fn test_rank_enforces_library_floor_franchise_and_length() {
        let (mut library, profile) = action_fan();
        library.push(entry("s9", "Naruto", MediaType::Anime, Some(3.0)));

        let mut candidates = vec![
            // In library by external id
            candidate("100", "Renamed", MediaType::Manga, &["Action"], Some(9.0)),
            // In library by title
            candidate("777", "NARUTO", MediaType::Anime, &["Action"], Some(8.0)),
            // Below the noise floor
            candidate("778", "Slow Romance", MediaType::Anime, &["Romance"], Some(9.5)),
        ];
        for i in 0..20 {
            candidates.push(candidate(
                &format!("{}", 2000 + i),
                &format!("Series {}: Part {}", i % 12, i),
                MediaType::Manga,
                &["Action"],
                Some(5.0 + (i as f64) / 10.0),
            ));
        }

        let ranked = rank(candidates, &library, &profile, &ScoringConfig::default());

        assert_eq!(ranked.len(), 10);
        let franchises: HashSet<String> = ranked
            .iter()
            .map(|r| extract_franchise(&r.candidate.title))
            .collect();
        assert_eq!(franchises.len(), ranked.len());
        assert!(ranked.iter().all(|r| r.score > 0.2));
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
        for rec in &ranked {
            assert!(library.iter().all(|e| {
                e.external_id.as_deref() != Some(rec.candidate.external_id.as_str())
                    && e.title.to_lowercase() != rec.candidate.title.to_lowercase()
            }));
        }
    }

    #[test]
    fn test_naruto_continuations_collapse_to_one_franchise() {
        let library = vec![
            entry("s1", "Naruto", MediaType::Anime, Some(5.0)),
            entry("s2", "Naruto: Shippuden", MediaType::Anime, Some(4.5)),
        ];
        let genres: GenreSet = [
            ("s1".to_string(), vec!["Action".to_string(), "Adventure".to_string()]),
            ("s2".to_string(), vec!["Action".to_string()]),
        ]
        .into_iter()
        .collect();
        let profile = build_preference_profile(&library, &genres);

        let candidates = vec![
            candidate("442", "Naruto: Shippuuden Movie 1", MediaType::Anime, &["Action", "Adventure"], Some(7.3)),
            candidate("936", "Naruto: The Last", MediaType::Anime, &["Action"], Some(7.7)),
            candidate("1735", "Naruto Season 2", MediaType::Anime, &["Action"], Some(8.2)),
            candidate("34566", "Boruto: Naruto Next Generations", MediaType::Anime, &["Action"], Some(6.0)),
        ];

        let ranked = rank(candidates, &library, &profile, &ScoringConfig::default());

        let naruto: Vec<&Recommendation> = ranked
            .iter()
            .filter(|r| extract_franchise(&r.candidate.title) == "naruto")
            .collect();
        assert_eq!(naruto.len(), 1);
        // The franchise's best-scoring edition wins
        assert_eq!(naruto[0].candidate.external_id, "1735");
        assert!(ranked.iter().any(|r| r.candidate.external_id == "34566"));
    }

    #[test]
    fn test_explain_names_two_liked_series() {
        let library = vec![
            entry("s1", "Fullmetal Alchemist: Brotherhood", MediaType::Anime, Some(5.0)),
            entry("s2", "Steins;Gate", MediaType::Anime, Some(4.0)),
            entry("s3", "Monster", MediaType::Manga, Some(4.5)),
        ];
        let profile = build_preference_profile(&library, &GenreSet::new());
        let c = candidate("1", "X", MediaType::Anime, &["Action"], None);

        assert_eq!(explain(&c, &profile), "You liked Fullmetal Alchemist & Steins;Gate");
    }

    #[test]
    fn test_explain_genre_rules() {
        let library = vec![entry("s1", "Berserk", MediaType::Manga, Some(3.5))];
        let genres: GenreSet = [(
            "s1".to_string(),
            vec!["Action".to_string(), "Horror".to_string()],
        )]
        .into_iter()
        .collect();
        let profile = build_preference_profile(&library, &genres);

        let two = candidate("1", "X", MediaType::Manga, &["Horror", "Action", "Drama"], None);
        assert_eq!(explain(&two, &profile), "Horror + Action");

        let one = candidate("2", "Y", MediaType::Manhwa, &["Action", "Romance"], None);
        assert_eq!(explain(&one, &profile), "Action manhwa");

        let none = candidate("3", "Z", MediaType::Anime, &["Romance"], None);
        assert_eq!(explain(&none, &profile), "For you");
    }

    #[test]
    fn test_explain_single_liked_series() {
        let library = vec![entry("s1", "Vagabond: Complete Edition", MediaType::Manga, Some(4.0))];
        let profile = build_preference_profile(&library, &GenreSet::new());
        let c = candidate("1", "X", MediaType::Manga, &["Drama"], None);

        assert_eq!(explain(&c, &profile), "Similar to Vagabond");
    }
}
