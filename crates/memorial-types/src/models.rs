use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A guestbook entry. `timestamp` is assigned by the server on creation and
/// never changes afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub id: i64,
    pub from: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// An admin-curated gallery image. `display_order` is only a sort key;
/// several photos may share a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryPhoto {
    pub id: i64,
    pub filename: String,
    pub photo_url: String,
    pub caption: String,
    pub display_order: i64,
    pub created_at: DateTime<Utc>,
}

/// Server-side session state, serialized into the `sessions` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub username: Option<String>,
}
