use rusqlite::{params, Row};

use super::*;

impl TrackerDb {
    // =========================================================================
    // Items
    // =========================================================================

    fn map_item_row(row: &Row) -> Result<DbItem, rusqlite::Error> {
        Ok(DbItem {
            id: row.get(0)?,
            user_id: row.get(1)?,
            title: row.get(2)?,
            intensity: row.get(3)?,
            point_value: row.get(4)?,
            is_recurring: row.get(5)?,
            is_active: row.get(6)?,
            archived: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    pub fn insert_item(&self, item: &DbItem) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO items (id, user_id, title, intensity, point_value, is_recurring,
                                is_active, archived, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                item.id,
                item.user_id,
                item.title,
                item.intensity,
                item.point_value,
                item.is_recurring,
                item.is_active,
                item.archived,
                item.created_at,
                item.updated_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_item(&self, id: &str) -> Result<Option<DbItem>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, title, intensity, point_value, is_recurring,
                    is_active, archived, created_at, updated_at
             FROM items WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id], Self::map_item_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    pub fn update_item_title(&self, id: &str, title: &str, now: &str) -> Result<(), DbError> {
        self.conn.execute(
            "UPDATE items SET title = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, title, now],
        )?;
        Ok(())
    }

    /// Write a new intensity together with its derived point value.
    pub fn update_item_intensity(
        &self,
        id: &str,
        intensity: &str,
        point_value: i64,
        now: &str,
    ) -> Result<(), DbError> {
        self.conn.execute(
            "UPDATE items SET intensity = ?2, point_value = ?3, updated_at = ?4 WHERE id = ?1",
            params![id, intensity, point_value, now],
        )?;
        Ok(())
    }

    pub fn set_item_active(&self, id: &str, active: bool, now: &str) -> Result<(), DbError> {
        self.conn.execute(
            "UPDATE items SET is_active = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, active, now],
        )?;
        Ok(())
    }

    /// Soft-delete: the item disappears from views but its completions remain
    /// historical.
    pub fn archive_item(&self, id: &str, now: &str) -> Result<(), DbError> {
        self.conn.execute(
            "UPDATE items SET archived = 1, is_active = 0, updated_at = ?2 WHERE id = ?1",
            params![id, now],
        )?;
        Ok(())
    }

    /// Hard delete. Callers must first check no completions reference the
    /// item (`count_completions_for_item`).
    pub fn delete_item(&self, id: &str) -> Result<(), DbError> {
        self.conn
            .execute("DELETE FROM subtasks WHERE item_id = ?1", params![id])?;
        self.conn
            .execute("DELETE FROM items WHERE id = ?1", params![id])?;
        Ok(())
    }

    pub fn items_for_user(&self, user_id: &str) -> Result<Vec<DbItem>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, title, intensity, point_value, is_recurring,
                    is_active, archived, created_at, updated_at
             FROM items
             WHERE user_id = ?1 AND archived = 0
             ORDER BY created_at",
        )?;
        let rows = stmt.query_map(params![user_id], Self::map_item_row)?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }

    /// Active items for the today view, each with a completed-today flag for
    /// the given `[day_start, day_end)` window. Inactive and archived items
    /// are excluded; their completions stay historical.
    pub fn today_items(
        &self,
        user_id: &str,
        day_start: &str,
        day_end: &str,
    ) -> Result<Vec<TodayItem>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, title, intensity, point_value, is_recurring,
                    is_active, archived, created_at, updated_at,
                    EXISTS (
                        SELECT 1 FROM completions c
                        WHERE c.item_id = items.id
                          AND c.user_id = items.user_id
                          AND c.completed_at >= ?2
                          AND c.completed_at < ?3
                    ) AS completed_today
             FROM items
             WHERE user_id = ?1 AND is_active = 1 AND archived = 0
             ORDER BY created_at",
        )?;
        let rows = stmt.query_map(params![user_id, day_start, day_end], |row| {
            let item = Self::map_item_row(row)?;
            let completed_today: bool = row.get(10)?;
            Ok(TodayItem {
                item,
                completed_today,
            })
        })?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }

    // =========================================================================
    // Subtasks
    // =========================================================================

    fn map_subtask_row(row: &Row) -> Result<DbSubtask, rusqlite::Error> {
        Ok(DbSubtask {
            id: row.get(0)?,
            item_id: row.get(1)?,
            title: row.get(2)?,
            is_repetitive: row.get(3)?,
            is_completed: row.get(4)?,
            last_shown_at: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    pub fn insert_subtask(&self, subtask: &DbSubtask) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO subtasks (id, item_id, title, is_repetitive, is_completed,
                                   last_shown_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                subtask.id,
                subtask.item_id,
                subtask.title,
                subtask.is_repetitive,
                subtask.is_completed,
                subtask.last_shown_at,
                subtask.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_subtask(&self, id: &str) -> Result<Option<DbSubtask>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, item_id, title, is_repetitive, is_completed, last_shown_at, created_at
             FROM subtasks WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id], Self::map_subtask_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    pub fn subtasks_for_item(&self, item_id: &str) -> Result<Vec<DbSubtask>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, item_id, title, is_repetitive, is_completed, last_shown_at, created_at
             FROM subtasks WHERE item_id = ?1 ORDER BY created_at",
        )?;
        let rows = stmt.query_map(params![item_id], Self::map_subtask_row)?;

        let mut subtasks = Vec::new();
        for row in rows {
            subtasks.push(row?);
        }
        Ok(subtasks)
    }

    pub fn set_subtask_completed(&self, id: &str, completed: bool) -> Result<(), DbError> {
        self.conn.execute(
            "UPDATE subtasks SET is_completed = ?2 WHERE id = ?1",
            params![id, completed],
        )?;
        Ok(())
    }

    /// Daily-reset pattern: completing a recurring item flips its repetitive,
    /// already-completed subtasks back to incomplete and refreshes their
    /// last_shown_at. Returns the number of rows reset.
    pub fn reset_repetitive_subtasks(&self, item_id: &str, now: &str) -> Result<usize, DbError> {
        let reset = self.conn.execute(
            "UPDATE subtasks SET is_completed = 0, last_shown_at = ?2
             WHERE item_id = ?1 AND is_repetitive = 1 AND is_completed = 1",
            params![item_id, now],
        )?;
        Ok(reset)
    }
}
