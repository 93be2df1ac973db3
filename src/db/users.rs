use rusqlite::params;

use super::*;

impl TrackerDb {
    // =========================================================================
    // Users
    // =========================================================================

    /// Upsert a user row. The role column is the only claim the engine reads;
    /// admin checks go through it, never through a literal identity.
    pub fn upsert_user(
        &self,
        id: &str,
        email: Option<&str>,
        role: &str,
        now: &str,
    ) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO users (id, email, role, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                email = excluded.email,
                role = excluded.role",
            params![id, email, role, now],
        )?;
        Ok(())
    }

    pub fn get_user_role(&self, id: &str) -> Result<Option<String>, DbError> {
        let mut stmt = self.conn.prepare("SELECT role FROM users WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], |row| row.get::<_, String>(0))?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }
}
