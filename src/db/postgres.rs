use chrono::NaiveDateTime;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::LibraryStore,
    error::AppResult,
    models::{LibraryEntry, MediaType, WatchStatus},
};

/// Creates a PostgreSQL connection pool for the library store
///
/// The pool connects lazily, so the service can start (and serve
/// library-in-body requests) while the database is still unreachable.
pub fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect_lazy(database_url)?;

    Ok(pool)
}

/// Reads a user's library from the tracker's `UserSeries`/`Series` tables
#[derive(Clone)]
pub struct PgLibraryStore {
    pool: PgPool,
}

impl PgLibraryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LibraryRow {
    series_id: String,
    title: String,
    media_type: String,
    external_id: Option<String>,
    thumbnail_url: Option<String>,
    rating: Option<f64>,
    status: Option<String>,
    last_progress: Option<String>,
    updated_at: NaiveDateTime,
}

impl LibraryRow {
    fn into_entry(self) -> Result<LibraryEntry, String> {
        let media_type: MediaType = self.media_type.parse()?;
        let status: WatchStatus = self
            .status
            .as_deref()
            .unwrap_or("plan-to-read")
            .parse()?;

        Ok(LibraryEntry {
            series_id: self.series_id,
            title: self.title,
            media_type,
            external_id: self.external_id,
            rating: self.rating,
            status,
            updated_at: self.updated_at.and_utc(),
            thumbnail_url: self.thumbnail_url,
            last_progress: self.last_progress,
        })
    }
}

#[async_trait::async_trait]
impl LibraryStore for PgLibraryStore {
    async fn load_library(&self, user_id: &str) -> AppResult<Vec<LibraryEntry>> {
        let rows: Vec<LibraryRow> = sqlx::query_as(
            r#"
            SELECT s."id" AS series_id,
                   s."title" AS title,
                   s."type" AS media_type,
                   s."externalId" AS external_id,
                   s."thumbnailUrl" AS thumbnail_url,
                   us."rating"::float8 AS rating,
                   us."status" AS status,
                   us."lastProgress"::text AS last_progress,
                   us."updatedAt" AS updated_at
            FROM "UserSeries" us
            JOIN "Series" s ON s."id" = us."seriesId"
            WHERE us."userId" = $1
            ORDER BY us."updatedAt" DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let total = rows.len();
        let entries: Vec<LibraryEntry> = rows
            .into_iter()
            .filter_map(|row| {
                let series_id = row.series_id.clone();
                row.into_entry()
                    .map_err(|e| {
                        tracing::warn!(series_id = %series_id, error = %e, "Skipping unreadable library row");
                    })
                    .ok()
            })
            .collect();

        tracing::debug!(
            user_id = %user_id,
            rows = total,
            entries = entries.len(),
            "Library loaded"
        );

        Ok(entries)
    }
}
