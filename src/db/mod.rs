//! Database layer for rag-backfill
//!
//! Read-only access to the platform's Postgres article table. The backfill
//! never writes here; its only durable state is the cursor file.
//!
//! ## Submodules
//!
//! - [`articles`] — ordered article paging for the resumable stream

use crate::error::{DatabaseError, Error, Result};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use sqlx::postgres::{PgPool, PgPoolOptions};

mod articles;

pub use articles::{ArticleSource, PgArticleSource, SourceBounds};

/// Article record from the platform's article table
#[derive(Debug, Clone, FromRow)]
pub struct Article {
    /// Stable article id, unique across the table
    pub id: String,
    /// Article title
    pub title: String,
    /// Full article body; rows with NULL or empty bodies are never selected
    pub body: String,
    /// Publication timestamp, first half of the stream ordering key
    pub created_at: DateTime<Utc>,
}

/// Database handle for rag-backfill
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to the article store
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .connect(database_url)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::ConnectionFailed(format!(
                    "Failed to connect to database: {}",
                    e
                )))
            })?;

        Ok(Self { pool })
    }

    /// Access the underlying connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Close all connections
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
