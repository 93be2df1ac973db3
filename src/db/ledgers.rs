use std::collections::HashSet;

use rusqlite::{params, Row};

use crate::types::{Achievement, AchievementCategory};

use super::*;

impl TrackerDb {
    // =========================================================================
    // Progression ledgers
    // =========================================================================

    fn map_ledger_row(row: &Row) -> Result<DbLedger, rusqlite::Error> {
        Ok(DbLedger {
            user_id: row.get(0)?,
            total_points: row.get(1)?,
            weekly_points: row.get(2)?,
            current_streak: row.get(3)?,
            longest_streak: row.get(4)?,
            current_level: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    pub fn get_ledger(&self, user_id: &str) -> Result<Option<DbLedger>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, total_points, weekly_points, current_streak, longest_streak,
                    current_level, created_at, updated_at
             FROM ledgers WHERE user_id = ?1",
        )?;
        let mut rows = stmt.query_map(params![user_id], Self::map_ledger_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Ledgers are created lazily: the first completion (or item creation)
    /// for a user materializes an all-zero row.
    pub fn get_or_create_ledger(&self, user_id: &str, now: &str) -> Result<DbLedger, DbError> {
        self.conn.execute(
            "INSERT OR IGNORE INTO ledgers
                 (user_id, total_points, weekly_points, current_streak, longest_streak,
                  current_level, created_at, updated_at)
             VALUES (?1, 0, 0, 0, 0, 0, ?2, ?2)",
            params![user_id, now],
        )?;
        match self.get_ledger(user_id)? {
            Some(ledger) => Ok(ledger),
            None => Err(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows)),
        }
    }

    /// Credit an award to both point accumulators. A single atomic UPDATE —
    /// never read-modify-write — so concurrent completions can't lose points.
    pub fn apply_award(&self, user_id: &str, points: i64, now: &str) -> Result<(), DbError> {
        self.conn.execute(
            "UPDATE ledgers
             SET total_points = total_points + ?2,
                 weekly_points = weekly_points + ?2,
                 updated_at = ?3
             WHERE user_id = ?1",
            params![user_id, points, now],
        )?;
        Ok(())
    }

    /// Undo's point correction: subtract from both accumulators, floored at
    /// zero.
    pub fn deduct_points(&self, user_id: &str, points: i64, now: &str) -> Result<(), DbError> {
        self.conn.execute(
            "UPDATE ledgers
             SET total_points = MAX(0, total_points - ?2),
                 weekly_points = MAX(0, weekly_points - ?2),
                 updated_at = ?3
             WHERE user_id = ?1",
            params![user_id, points, now],
        )?;
        Ok(())
    }

    /// Fold a freshly computed per-item streak into the user-level fields:
    /// both are high-water marks against the new value.
    pub fn fold_streak(&self, user_id: &str, streak: i64, now: &str) -> Result<(), DbError> {
        self.conn.execute(
            "UPDATE ledgers
             SET current_streak = MAX(current_streak, ?2),
                 longest_streak = MAX(longest_streak, ?2),
                 updated_at = ?3
             WHERE user_id = ?1",
            params![user_id, streak, now],
        )?;
        Ok(())
    }

    pub fn set_level(&self, user_id: &str, level: i64, now: &str) -> Result<(), DbError> {
        self.conn.execute(
            "UPDATE ledgers SET current_level = ?2, updated_at = ?3 WHERE user_id = ?1",
            params![user_id, level, now],
        )?;
        Ok(())
    }

    /// Fresh total after increments, for the level recompute inside the same
    /// transaction.
    pub fn total_points(&self, user_id: &str) -> Result<i64, DbError> {
        let total = self.conn.query_row(
            "SELECT total_points FROM ledgers WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    /// Weekly boundary hook for a single user.
    pub fn reset_weekly_points(&self, user_id: &str, now: &str) -> Result<(), DbError> {
        self.conn.execute(
            "UPDATE ledgers SET weekly_points = 0, updated_at = ?2 WHERE user_id = ?1",
            params![user_id, now],
        )?;
        Ok(())
    }

    /// Weekly boundary hook for the whole store. Returns rows touched.
    pub fn reset_all_weekly_points(&self, now: &str) -> Result<usize, DbError> {
        let touched = self.conn.execute(
            "UPDATE ledgers SET weekly_points = 0, updated_at = ?1 WHERE weekly_points != 0",
            params![now],
        )?;
        Ok(touched)
    }

    /// Administrative reset — the only sanctioned way longest_streak decreases.
    pub fn reset_streaks(&self, user_id: &str, now: &str) -> Result<(), DbError> {
        self.conn.execute(
            "UPDATE ledgers SET current_streak = 0, longest_streak = 0, updated_at = ?2
             WHERE user_id = ?1",
            params![user_id, now],
        )?;
        Ok(())
    }

    // =========================================================================
    // Achievements
    // =========================================================================

    /// Append a batch of unlocks. INSERT OR IGNORE on the composite key keeps
    /// the set append-only and re-unlock-proof.
    pub fn insert_achievements(
        &self,
        user_id: &str,
        unlocks: &[Achievement],
    ) -> Result<(), DbError> {
        let mut stmt = self.conn.prepare(
            "INSERT OR IGNORE INTO achievements
                 (user_id, achievement_id, title, description, icon, category, unlocked_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for unlock in unlocks {
            stmt.execute(params![
                user_id,
                unlock.id,
                unlock.title,
                unlock.description,
                unlock.icon,
                unlock.category.as_str(),
                unlock.unlocked_at,
            ])?;
        }
        Ok(())
    }

    pub fn achievements_for_user(&self, user_id: &str) -> Result<Vec<Achievement>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT achievement_id, title, description, icon, category, unlocked_at
             FROM achievements WHERE user_id = ?1 ORDER BY unlocked_at, achievement_id",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            let category: String = row.get(4)?;
            Ok(Achievement {
                id: row.get(0)?,
                title: row.get(1)?,
                description: row.get(2)?,
                icon: row.get(3)?,
                category: AchievementCategory::parse_or_default(&category),
                unlocked_at: row.get(5)?,
            })
        })?;

        let mut achievements = Vec::new();
        for row in rows {
            achievements.push(row?);
        }
        Ok(achievements)
    }

    pub fn achievement_ids(&self, user_id: &str) -> Result<HashSet<String>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT achievement_id FROM achievements WHERE user_id = ?1")?;
        let rows = stmt.query_map(params![user_id], |row| row.get::<_, String>(0))?;

        let mut ids = HashSet::new();
        for row in rows {
            ids.insert(row?);
        }
        Ok(ids)
    }
}
