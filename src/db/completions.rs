use rusqlite::{params, Row};

use super::*;

impl TrackerDb {
    // =========================================================================
    // Completion events
    // =========================================================================

    fn map_completion_row(row: &Row) -> Result<DbCompletion, rusqlite::Error> {
        Ok(DbCompletion {
            id: row.get(0)?,
            user_id: row.get(1)?,
            item_id: row.get(2)?,
            completed_at: row.get(3)?,
            points_awarded: row.get(4)?,
            streak_at_completion: row.get(5)?,
            notes: row.get(6)?,
        })
    }

    pub fn insert_completion(&self, completion: &DbCompletion) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO completions (id, user_id, item_id, completed_at, points_awarded,
                                      streak_at_completion, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                completion.id,
                completion.user_id,
                completion.item_id,
                completion.completed_at,
                completion.points_awarded,
                completion.streak_at_completion,
                completion.notes,
            ],
        )?;
        Ok(())
    }

    /// Idempotence guard for recurring items: is there a completion for this
    /// (user, item) within `[start, end)`? One indexed point query; the
    /// streak walk issues one of these per day.
    pub fn completion_exists_in_window(
        &self,
        user_id: &str,
        item_id: &str,
        start: &str,
        end: &str,
    ) -> Result<bool, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT 1 FROM completions
             WHERE user_id = ?1 AND item_id = ?2
               AND completed_at >= ?3 AND completed_at < ?4
             LIMIT 1",
        )?;
        Ok(stmt.exists(params![user_id, item_id, start, end])?)
    }

    /// Idempotence guard for non-recurring items (goals): any completion ever?
    pub fn any_completion_exists(&self, user_id: &str, item_id: &str) -> Result<bool, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT 1 FROM completions WHERE user_id = ?1 AND item_id = ?2 LIMIT 1",
        )?;
        Ok(stmt.exists(params![user_id, item_id])?)
    }

    /// The most recent completion within `[start, end)`, if any. Undo targets
    /// this row.
    pub fn latest_completion_in_window(
        &self,
        user_id: &str,
        item_id: &str,
        start: &str,
        end: &str,
    ) -> Result<Option<DbCompletion>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, item_id, completed_at, points_awarded,
                    streak_at_completion, notes
             FROM completions
             WHERE user_id = ?1 AND item_id = ?2
               AND completed_at >= ?3 AND completed_at < ?4
             ORDER BY completed_at DESC
             LIMIT 1",
        )?;
        let mut rows = stmt.query_map(
            params![user_id, item_id, start, end],
            Self::map_completion_row,
        )?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    pub fn delete_completion(&self, id: &str) -> Result<(), DbError> {
        self.conn
            .execute("DELETE FROM completions WHERE id = ?1", params![id])?;
        Ok(())
    }

    /// Guard for hard item deletion: an item with history is archived instead.
    pub fn count_completions_for_item(&self, item_id: &str) -> Result<i64, DbError> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM completions WHERE item_id = ?1",
            params![item_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Recent history for an item, newest first.
    pub fn completions_for_item(
        &self,
        user_id: &str,
        item_id: &str,
        limit: i64,
    ) -> Result<Vec<DbCompletion>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, item_id, completed_at, points_awarded,
                    streak_at_completion, notes
             FROM completions
             WHERE user_id = ?1 AND item_id = ?2
             ORDER BY completed_at DESC
             LIMIT ?3",
        )?;
        let rows = stmt.query_map(params![user_id, item_id, limit], Self::map_completion_row)?;

        let mut completions = Vec::new();
        for row in rows {
            completions.push(row?);
        }
        Ok(completions)
    }
}
