/// Separators that start a subtitle or sequel marker, applied in this order
const SUBTITLE_SEPARATORS: [&str; 4] = [":", " - ", " Season", " Part"];

/// Franchise key of a title: the base name, trimmed and lower-cased
///
/// "Naruto: Shippuden" and "Attack on Titan Season 3 Part 2" reduce to
/// "naruto" and "attack on titan".
pub fn extract_franchise(title: &str) -> String {
    SUBTITLE_SEPARATORS
        .iter()
        .fold(title, |base, separator| {
            base.split(separator).next().unwrap_or(base)
        })
        .trim()
        .to_lowercase()
}

/// Title with any subtitle after the first colon removed, for display
pub fn short_title(title: &str) -> &str {
    title.split(':').next().unwrap_or(title).trim_end()
}
