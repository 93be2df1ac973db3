use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::db::{DbCompletion, DbLedger};

/// Configuration stored in ~/.stride/config.json
///
/// The engine itself only needs the timezone: completions bucket into local
/// calendar days (midnight to midnight in this zone), not UTC days.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// IANA timezone name used for calendar-day bucketing, e.g. "America/Toronto".
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
        }
    }
}

impl Config {
    /// Load config from `~/.stride/config.json`, falling back to defaults if
    /// the file is missing or unreadable.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load config from an explicit path, falling back to defaults.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => config,
                Err(e) => {
                    log::warn!("Failed to parse {}: {} — using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".stride").join("config.json"))
    }

    /// Resolve the configured timezone name to a `chrono_tz::Tz`.
    ///
    /// Unknown names fall back to UTC with a warning rather than failing the
    /// whole engine — a broken config shouldn't block completions.
    pub fn resolved_timezone(&self) -> chrono_tz::Tz {
        match chrono_tz::Tz::from_str(&self.timezone) {
            Ok(tz) => tz,
            Err(_) => {
                log::warn!("Unknown timezone '{}', falling back to UTC", self.timezone);
                chrono_tz::Tz::UTC
            }
        }
    }
}

/// How demanding an item is. Derives the item's point value; the point value
/// is bookkeeping recomputed on intensity change, never set directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Easy,
    Medium,
    Hard,
}

impl Intensity {
    pub fn point_value(&self) -> i64 {
        match self {
            Intensity::Easy => 5,
            Intensity::Medium => 10,
            Intensity::Hard => 20,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Intensity::Easy => "easy",
            Intensity::Medium => "medium",
            Intensity::Hard => "hard",
        }
    }

    /// Parse a stored intensity string. Unknown values read as Medium so a
    /// bad row degrades to the default rather than poisoning queries.
    pub fn parse_or_default(s: &str) -> Self {
        match s {
            "easy" => Intensity::Easy,
            "hard" => Intensity::Hard,
            _ => Intensity::Medium,
        }
    }
}

/// Category tag on an unlocked achievement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AchievementCategory {
    Streak,
    Points,
    Milestone,
}

impl AchievementCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            AchievementCategory::Streak => "streak",
            AchievementCategory::Points => "points",
            AchievementCategory::Milestone => "milestone",
        }
    }

    pub fn parse_or_default(s: &str) -> Self {
        match s {
            "streak" => AchievementCategory::Streak,
            "points" => AchievementCategory::Points,
            _ => AchievementCategory::Milestone,
        }
    }
}

/// An unlocked achievement, as stored and as returned to the route layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: String,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub category: AchievementCategory,
    pub unlocked_at: String,
}

/// Read view of a user's progression ledger.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSnapshot {
    pub user_id: String,
    pub total_points: i64,
    pub weekly_points: i64,
    pub current_streak: i64,
    pub longest_streak: i64,
    pub current_level: i64,
    pub level_title: String,
    pub achievements: Vec<Achievement>,
}

impl LedgerSnapshot {
    pub fn from_row(row: DbLedger, achievements: Vec<Achievement>) -> Self {
        Self {
            level_title: crate::progression::points::level_title(row.current_level).to_string(),
            user_id: row.user_id,
            total_points: row.total_points,
            weekly_points: row.weekly_points,
            current_streak: row.current_streak,
            longest_streak: row.longest_streak,
            current_level: row.current_level,
            achievements,
        }
    }
}

/// Result of a successful `complete_item` call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionOutcome {
    pub completion: DbCompletion,
    pub ledger: LedgerSnapshot,
    pub new_achievements: Vec<Achievement>,
}

/// Result of a successful `undo_completion` call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoOutcome {
    pub ledger: LedgerSnapshot,
}
