//! Taste-based recommendations for anime, manga and manhwa libraries.
//!
//! A user's rated library is turned into a genre/type preference profile,
//! candidates are pulled from the Jikan and AniList catalogs through a
//! rate-limited, cached client, and the result is scored, deduplicated by
//! franchise and explained.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use routes::{create_router, AppState};
