//! Ordered article paging for the resumable stream.
//!
//! Articles flow strictly in `(created_at ASC, id ASC)` order via keyset
//! pagination: each page starts strictly after the previous page's last row,
//! compared as a row value, so equal timestamps are broken by id and no row
//! is ever skipped or repeated within a run.

use crate::config::BackfillConfig;
use crate::cursor::Cursor;
use crate::error::{DatabaseError, Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;

use super::{Article, Database};

/// Start position and upper bound for one run's article stream
#[derive(Debug, Clone, PartialEq)]
pub struct SourceBounds {
    /// Stream rows strictly after this `(created_at, id)` position
    pub after_created_at: DateTime<Utc>,
    /// Id half of the start position; empty string sorts before every real id
    pub after_id: String,
    /// Exclusive upper bound on `created_at`
    pub until: DateTime<Utc>,
}

impl SourceBounds {
    /// Decide where this run starts and stops
    ///
    /// An explicit `--from` wins over the cursor: the operator asked for that
    /// range, remembered progress notwithstanding. The empty id makes the
    /// from-day's first instant inclusive. Without `--from`, the stream
    /// resumes strictly after the cursor position.
    pub fn for_run(cursor: &Cursor, config: &BackfillConfig, now: DateTime<Utc>) -> Self {
        let (after_created_at, after_id) = match config.start_override() {
            Some(from) => (from, String::new()),
            None => (cursor.last_created_at, cursor.last_id.clone()),
        };
        Self {
            after_created_at,
            after_id,
            until: config.end_bound_at(now),
        }
    }
}

/// Ordered, bounded stream of articles
///
/// The trait seam lets the runner and its tests operate on an in-memory
/// source; production uses [`PgArticleSource`]. An empty page means the
/// stream is exhausted.
#[async_trait]
pub trait ArticleSource: Send {
    /// Fetch the next page, at most `limit` articles, advancing the
    /// in-memory read position past the returned rows
    async fn next_page(&mut self, limit: usize) -> Result<Vec<Article>>;

    /// Estimate how many articles remain from the current read position
    async fn count_remaining(&self) -> Result<u64>;
}

/// Postgres-backed article source
pub struct PgArticleSource {
    pool: PgPool,
    position: (DateTime<Utc>, String),
    until: DateTime<Utc>,
}

impl Database {
    /// Open an article stream over the given bounds
    pub fn article_source(&self, bounds: SourceBounds) -> PgArticleSource {
        PgArticleSource {
            pool: self.pool.clone(),
            position: (bounds.after_created_at, bounds.after_id),
            until: bounds.until,
        }
    }
}

#[async_trait]
impl ArticleSource for PgArticleSource {
    async fn next_page(&mut self, limit: usize) -> Result<Vec<Article>> {
        let rows: Vec<Article> = sqlx::query_as(
            r#"
            SELECT id, title, body, created_at
            FROM articles
            WHERE (created_at, id) > ($1, $2)
              AND created_at < $3
              AND body IS NOT NULL AND body <> ''
            ORDER BY created_at ASC, id ASC
            LIMIT $4
            "#,
        )
        .bind(self.position.0)
        .bind(&self.position.1)
        .bind(self.until)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to fetch article page: {}",
                e
            )))
        })?;

        if let Some(last) = rows.last() {
            self.position = (last.created_at, last.id.clone());
        }

        Ok(rows)
    }

    async fn count_remaining(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM articles
            WHERE (created_at, id) > ($1, $2)
              AND created_at < $3
              AND body IS NOT NULL AND body <> ''
            "#,
        )
        .bind(self.position.0)
        .bind(&self.position.1)
        .bind(self.until)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to count remaining articles: {}",
                e
            )))
        })?;

        Ok(count.max(0) as u64)
    }
}
