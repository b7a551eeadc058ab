//! Durable backfill checkpoint.
//!
//! The cursor records the position of the last article whose whole batch was
//! confirmed, so an interrupted run resumes without resubmitting anything at
//! or before that position. It is the only state the backfill persists.

use crate::db::Article;
use crate::error::{CursorError, Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Format version written by this build
pub const CURSOR_VERSION: u32 = 1;

/// Checkpoint record persisted as JSON
///
/// `(last_created_at, last_id)` only ever moves forward, and only to
/// positions whose entire prefix in `(created_at, id)` order has been
/// dispatched. A version of 0 with the zero timestamp means "never written";
/// that state is persisted only by `reset-cursor`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
    /// Format version (0 = empty cursor)
    pub version: u32,

    /// `created_at` of the last confirmed article (Unix epoch = none)
    pub last_created_at: DateTime<Utc>,

    /// Id of the last confirmed article, tie-breaker within a timestamp
    pub last_id: String,

    /// Calendar date (YYYY-MM-DD, UTC) of the last confirmed article
    pub current_date: String,

    /// Articles confirmed across the lifetime of this cursor file
    pub processed_count: u64,

    /// When this checkpoint was written
    pub updated_at: DateTime<Utc>,
}

impl Cursor {
    /// The cursor of a backfill that has not confirmed anything yet
    pub fn empty() -> Self {
        Self {
            version: 0,
            last_created_at: DateTime::UNIX_EPOCH,
            last_id: String::new(),
            current_date: String::new(),
            processed_count: 0,
            updated_at: DateTime::UNIX_EPOCH,
        }
    }

    /// True when no article has ever been confirmed
    pub fn is_empty(&self) -> bool {
        self.version == 0 && self.last_created_at == DateTime::UNIX_EPOCH
    }

    /// Checkpoint one confirmed article
    ///
    /// Pure: returns the advanced cursor, leaving `self` untouched. The
    /// runner folds this over a fully resolved batch and persists the result,
    /// so the on-disk cursor only ever lands on batch boundaries.
    pub fn advance(&self, article: &Article, now: DateTime<Utc>) -> Cursor {
        Cursor {
            version: CURSOR_VERSION,
            last_created_at: article.created_at,
            last_id: article.id.clone(),
            current_date: article.created_at.format("%Y-%m-%d").to_string(),
            processed_count: self.processed_count + 1,
            updated_at: now,
        }
    }

    /// Load the cursor from `path`
    ///
    /// An absent file is a first run and yields the empty cursor. A file that
    /// exists but does not parse is fatal: silently starting over would
    /// resubmit the whole history, so the operator must decide (fix the file
    /// or run `reset-cursor`).
    pub async fn load(path: &Path) -> Result<Cursor> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Cursor::empty()),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&bytes).map_err(|e| {
            Error::Cursor(CursorError::Corrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
        })
    }

    /// Persist the cursor to `path`, crash-safe
    ///
    /// Writes to a sibling temp file and renames it over the target, so a
    /// crash mid-write leaves either the previous cursor or the new one,
    /// never a truncated file.
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::Cursor(CursorError::WriteFailed {
                    path: path.to_path_buf(),
                    reason: format!("failed to create parent directory: {e}"),
                })
            })?;
        }

        let json = serde_json::to_vec_pretty(self)?;
        let tmp_path = path.with_extension("tmp");

        tokio::fs::write(&tmp_path, &json).await.map_err(|e| {
            Error::Cursor(CursorError::WriteFailed {
                path: tmp_path.clone(),
                reason: e.to_string(),
            })
        })?;

        tokio::fs::rename(&tmp_path, path).await.map_err(|e| {
            Error::Cursor(CursorError::WriteFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
        })?;

        Ok(())
    }
}
