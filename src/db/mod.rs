pub mod cache;
pub mod postgres;

mod macros;

pub use cache::{CacheKey, CachePolicy, ResponseCache};
pub use postgres::{create_pool, PgLibraryStore};

use crate::{error::AppResult, models::LibraryEntry};

/// Source of a user's rated library
///
/// The recommendation core only ever reads from it.
#[async_trait::async_trait]
pub trait LibraryStore: Send + Sync {
    async fn load_library(&self, user_id: &str) -> AppResult<Vec<LibraryEntry>>;
}
