//! Database row types. These map directly to SQLite rows and are kept apart
//! from the memorial-types models so the storage layer owns its own shape.

use memorial_types::models::{GalleryPhoto, Memory, SessionData};
use tracing::warn;

use crate::parse_timestamp;

#[derive(Debug, Clone)]
pub struct MemoryRow {
    pub id: i64,
    pub from_name: String,
    pub message: String,
    pub photo_url: Option<String>,
    pub created_at: String,
}

impl MemoryRow {
    pub(crate) const COLUMNS: &'static str = "id, from_name, message, photo_url, created_at";

    pub(crate) fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            from_name: row.get(1)?,
            message: row.get(2)?,
            photo_url: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    pub fn into_memory(self) -> Memory {
        let timestamp = parse_timestamp(&self.created_at, &format!("memory {}", self.id));
        Memory {
            id: self.id,
            from: self.from_name,
            message: self.message,
            photo_url: self.photo_url,
            timestamp,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GalleryRow {
    pub id: i64,
    pub filename: String,
    pub photo_url: String,
    pub caption: String,
    pub display_order: i64,
    pub created_at: String,
}

impl GalleryRow {
    pub(crate) const COLUMNS: &'static str =
        "id, filename, photo_url, caption, display_order, created_at";

    pub(crate) fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            filename: row.get(1)?,
            photo_url: row.get(2)?,
            caption: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            display_order: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    pub fn into_photo(self) -> GalleryPhoto {
        let created_at = parse_timestamp(&self.created_at, &format!("gallery photo {}", self.id));
        GalleryPhoto {
            id: self.id,
            filename: self.filename,
            photo_url: self.photo_url,
            caption: self.caption,
            display_order: self.display_order,
            created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionRow {
    pub id: String,
    pub data: String,
    pub expires_at: String,
}

impl SessionRow {
    /// Decodes the JSON payload. A corrupt payload degrades to an anonymous
    /// session rather than failing the request.
    pub fn session_data(&self) -> SessionData {
        serde_json::from_str(&self.data).unwrap_or_else(|e| {
            warn!("Corrupt session payload: {}", e);
            SessionData::default()
        })
    }
}
