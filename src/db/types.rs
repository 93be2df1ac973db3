//! Shared type definitions for the database layer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors specific to database operations.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Failed to create database directory: {0}")]
    CreateDir(std::io::Error),

    #[error("Schema migration failed: {0}")]
    Migration(String),
}

/// A row from the `items` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbItem {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub intensity: String,
    /// Derived from intensity (easy=5, medium=10, hard=20); recomputed on
    /// intensity change, never set directly.
    pub point_value: i64,
    pub is_recurring: bool,
    pub is_active: bool,
    pub archived: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// A row from the `subtasks` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbSubtask {
    pub id: String,
    pub item_id: String,
    pub title: String,
    pub is_repetitive: bool,
    pub is_completed: bool,
    pub last_shown_at: Option<String>,
    pub created_at: String,
}

/// A row from the `completions` table. The points and streak columns are
/// snapshots taken at completion time, never recomputed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbCompletion {
    pub id: String,
    pub user_id: String,
    pub item_id: String,
    pub completed_at: String,
    pub points_awarded: i64,
    pub streak_at_completion: i64,
    pub notes: Option<String>,
}

/// A row from the `ledgers` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbLedger {
    pub user_id: String,
    pub total_points: i64,
    pub weekly_points: i64,
    pub current_streak: i64,
    pub longest_streak: i64,
    pub current_level: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// An item paired with its completed-today flag, for the today view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodayItem {
    #[serde(flatten)]
    pub item: DbItem,
    pub completed_today: bool,
}
