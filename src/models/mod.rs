pub mod anilist;
pub mod candidate;
pub mod jikan;
pub mod library;
pub mod profile;
pub mod response;

pub use candidate::{Candidate, MetadataPatch, Recommendation};
pub use library::{LibraryEntry, MediaType, WatchStatus};
pub use profile::{
    GenreSet, GenreWeight, PreferenceProfile, ProfileSummary, QualifyingSeries, TypePreference,
};
pub use response::{
    ContinueItem, ContinueResponse, RecommendationResponse, Tier, TitleMatch,
    TitleSearchResponse,
};
