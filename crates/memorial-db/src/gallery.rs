use anyhow::Result;
use chrono::Utc;
use rusqlite::OptionalExtension;

use crate::models::GalleryRow;
use crate::{Database, format_timestamp};

/// Result of a bulk reorder. A missing id aborts the whole batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderOutcome {
    Applied,
    Missing(i64),
}

impl Database {
    /// Ascending display order; ties fall back to insertion order.
    pub fn list_gallery(&self) -> Result<Vec<GalleryRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM gallery ORDER BY display_order ASC, id ASC",
                GalleryRow::COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], GalleryRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_photo(&self, id: i64) -> Result<Option<GalleryRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM gallery WHERE id = ?1", GalleryRow::COLUMNS);
            let row = conn.query_row(&sql, [id], GalleryRow::from_row).optional()?;
            Ok(row)
        })
    }

    /// Appends a photo after the current last one (`max(display_order) + 1`,
    /// or 1 on an empty table). The order is computed inside the INSERT so two
    /// concurrent uploads cannot read the same maximum.
    pub fn create_photo(
        &self,
        filename: &str,
        photo_url: &str,
        caption: &str,
    ) -> Result<GalleryRow> {
        let created_at = format_timestamp(Utc::now());
        self.with_conn(|conn| {
            let sql = format!(
                "INSERT INTO gallery (filename, photo_url, caption, display_order, created_at)
                 VALUES (?1, ?2, ?3, (SELECT COALESCE(MAX(display_order), 0) + 1 FROM gallery), ?4)
                 RETURNING {}",
                GalleryRow::COLUMNS
            );
            let row = conn.query_row(
                &sql,
                rusqlite::params![filename, photo_url, caption, created_at],
                GalleryRow::from_row,
            )?;
            Ok(row)
        })
    }

    pub fn update_caption(&self, id: i64, caption: &str) -> Result<Option<GalleryRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "UPDATE gallery SET caption = ?2 WHERE id = ?1 RETURNING {}",
                GalleryRow::COLUMNS
            );
            let row = conn
                .query_row(&sql, rusqlite::params![id, caption], GalleryRow::from_row)
                .optional()?;
            Ok(row)
        })
    }

    pub fn delete_photo(&self, id: i64) -> Result<Option<GalleryRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "DELETE FROM gallery WHERE id = ?1 RETURNING {}",
                GalleryRow::COLUMNS
            );
            let row = conn.query_row(&sql, [id], GalleryRow::from_row).optional()?;
            Ok(row)
        })
    }

    /// Applies `(id, display_order)` pairs in one transaction. If any id is
    /// unknown nothing is written.
    pub fn reorder_gallery(&self, updates: &[(i64, i64)]) -> Result<ReorderOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare("UPDATE gallery SET display_order = ?2 WHERE id = ?1")?;
                for &(id, order) in updates {
                    if stmt.execute([id, order])? == 0 {
                        // Dropping `tx` without commit rolls back.
                        return Ok(ReorderOutcome::Missing(id));
                    }
                }
            }
            tx.commit()?;
            Ok(ReorderOutcome::Applied)
        })
    }
}
