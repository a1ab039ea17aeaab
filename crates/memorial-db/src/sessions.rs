use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;

use crate::models::SessionRow;
use crate::{Database, format_timestamp};

impl Database {
    /// Loads a session that has not yet expired at `now`.
    pub fn get_session(&self, id: &str, now: DateTime<Utc>) -> Result<Option<SessionRow>> {
        let now = format_timestamp(now);
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, data, expires_at FROM sessions WHERE id = ?1 AND expires_at > ?2",
                    rusqlite::params![id, now],
                    |row| {
                        Ok(SessionRow {
                            id: row.get(0)?,
                            data: row.get(1)?,
                            expires_at: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Insert-or-replace, so a regenerated payload overwrites the old one.
    pub fn save_session(&self, id: &str, data: &str, expires_at: DateTime<Utc>) -> Result<()> {
        let expires_at = format_timestamp(expires_at);
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sessions (id, data, expires_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE
                 SET data = excluded.data, expires_at = excluded.expires_at",
                rusqlite::params![id, data, expires_at],
            )?;
            Ok(())
        })
    }

    /// Pushes the expiry of a live session forward. Returns false if the
    /// session is gone.
    pub fn touch_session(&self, id: &str, expires_at: DateTime<Utc>) -> Result<bool> {
        let expires_at = format_timestamp(expires_at);
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE sessions SET expires_at = ?2 WHERE id = ?1",
                rusqlite::params![id, expires_at],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_session(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM sessions WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    /// Deletes every session that expired before `now`; returns how many.
    pub fn prune_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize> {
        let now = format_timestamp(now);
        self.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", [now])?;
            Ok(removed)
        })
    }
}
