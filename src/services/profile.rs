use std::collections::{BTreeMap, HashMap};

use crate::models::{
    GenreSet, GenreWeight, LibraryEntry, MediaType, PreferenceProfile, QualifyingSeries,
    TypePreference, WatchStatus,
};

const MAX_TOP_GENRES: usize = 6;

/// Step function from a 0-5 star rating to a preference weight
///
/// Anything under 3.5 stars (or unrated) carries no weight.
pub fn rating_to_weight(rating: Option<f64>) -> f64 {
    match rating {
        Some(r) if r >= 5.0 => 1.0,
        Some(r) if r >= 4.5 => 0.8,
        Some(r) if r >= 4.0 => 0.6,
        Some(r) if r >= 3.5 => 0.4,
        _ => 0.0,
    }
}

/// Entries whose rating carries a non-zero weight, in library order
pub fn qualifying_series(library: &[LibraryEntry]) -> Vec<QualifyingSeries> {
    library
        .iter()
        .filter_map(|entry| {
            let weight = rating_to_weight(entry.rating);
            (weight > 0.0).then(|| QualifyingSeries {
                series_id: entry.series_id.clone(),
                title: entry.title.clone(),
                media_type: entry.media_type,
                rating: entry.rating.unwrap_or_default(),
                weight,
                external_id: entry.external_id.clone(),
            })
        })
        .collect()
}

/// Aggregates a rated library into a taste profile
///
/// Series without an entry in `genres` contribute to type weighting only.
pub fn build_preference_profile(library: &[LibraryEntry], genres: &GenreSet) -> PreferenceProfile {
    let qualifying = qualifying_series(library);

    let mut type_totals: BTreeMap<MediaType, (f64, u32)> = BTreeMap::new();
    // Insertion order is kept alongside the map for first-seen tie breaking
    let mut genre_order: Vec<String> = Vec::new();
    let mut genre_weights: HashMap<String, GenreWeight> = HashMap::new();

    for series in &qualifying {
        let totals = type_totals.entry(series.media_type).or_default();
        totals.0 += series.weight;
        totals.1 += 1;

        let Some(series_genres) = genres.get(&series.series_id) else {
            continue;
        };
        for genre in series_genres {
            let entry = genre_weights.entry(genre.clone()).or_insert_with(|| {
                genre_order.push(genre.clone());
                GenreWeight::default()
            });
            entry.weight += series.weight;
            entry.count += 1;
        }
    }

    let preferred_types = type_totals
        .into_iter()
        .map(|(media_type, (total_weight, count))| {
            (
                media_type,
                TypePreference {
                    avg: total_weight / count as f64,
                    total_weight,
                    count,
                },
            )
        })
        .collect();

    // Stable sort keeps first-seen order among equal weights
    let mut top_genres = genre_order;
    top_genres.sort_by(|a, b| {
        let wa = genre_weights[a].weight;
        let wb = genre_weights[b].weight;
        wb.partial_cmp(&wa).unwrap_or(std::cmp::Ordering::Equal)
    });
    top_genres.truncate(MAX_TOP_GENRES);

    let completed_count = library
        .iter()
        .filter(|e| e.status == WatchStatus::Completed)
        .count() as u32;
    let dropped_count = library
        .iter()
        .filter(|e| e.status == WatchStatus::Dropped)
        .count() as u32;

    PreferenceProfile {
        genre_weights,
        preferred_types,
        qualifying_series: qualifying,
        top_genres,
        completed_count,
        dropped_count,
    }
}
