use anyhow::Result;
use chrono::Utc;
use rusqlite::OptionalExtension;

use crate::models::MemoryRow;
use crate::{Database, format_timestamp};

impl Database {
    /// Newest first. `limit = None` returns every row from `offset` on.
    pub fn list_memories(&self, limit: Option<u32>, offset: Option<u32>) -> Result<Vec<MemoryRow>> {
        let limit = limit.map(i64::from).unwrap_or(-1);
        let offset = offset.map(i64::from).unwrap_or(0);

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM memories
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?1 OFFSET ?2",
                MemoryRow::COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![limit, offset], MemoryRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_memory(&self, id: i64) -> Result<Option<MemoryRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM memories WHERE id = ?1", MemoryRow::COLUMNS);
            let row = conn.query_row(&sql, [id], MemoryRow::from_row).optional()?;
            Ok(row)
        })
    }

    /// Inserts a memory stamped with the current time and returns the stored row.
    pub fn create_memory(
        &self,
        from: &str,
        message: &str,
        photo_url: Option<&str>,
    ) -> Result<MemoryRow> {
        let created_at = format_timestamp(Utc::now());
        self.with_conn(|conn| {
            let sql = format!(
                "INSERT INTO memories (from_name, message, photo_url, created_at)
                 VALUES (?1, ?2, ?3, ?4)
                 RETURNING {}",
                MemoryRow::COLUMNS
            );
            let row = conn.query_row(
                &sql,
                rusqlite::params![from, message, photo_url, created_at],
                MemoryRow::from_row,
            )?;
            Ok(row)
        })
    }

    /// Coalescing update: `None` leaves the column untouched. `created_at` is
    /// never written. Returns `None` when the id does not exist.
    pub fn update_memory(
        &self,
        id: i64,
        from: Option<&str>,
        message: Option<&str>,
    ) -> Result<Option<MemoryRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "UPDATE memories
                 SET from_name = COALESCE(?2, from_name),
                     message = COALESCE(?3, message)
                 WHERE id = ?1
                 RETURNING {}",
                MemoryRow::COLUMNS
            );
            let row = conn
                .query_row(&sql, rusqlite::params![id, from, message], MemoryRow::from_row)
                .optional()?;
            Ok(row)
        })
    }

    /// Removes a memory and hands back the deleted row so the caller can
    /// clean up its photo blob.
    pub fn delete_memory(&self, id: i64) -> Result<Option<MemoryRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "DELETE FROM memories WHERE id = ?1 RETURNING {}",
                MemoryRow::COLUMNS
            );
            let row = conn.query_row(&sql, [id], MemoryRow::from_row).optional()?;
            Ok(row)
        })
    }
}
