use serde::{Deserialize, Serialize};

use crate::models::{GalleryPhoto, Memory};

// -- Memories --

/// Public guestbook submission. Fields are optional so that a missing value
/// surfaces as a validation message instead of a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateMemoryRequest {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateMemoryRequest {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct MemoryListResponse {
    pub success: bool,
    pub memories: Vec<Memory>,
}

#[derive(Debug, Serialize)]
pub struct MemoryResponse {
    pub success: bool,
    pub message: String,
    pub memory: Memory,
}

// -- Gallery --

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateCaptionRequest {
    #[serde(default)]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoOrder {
    pub id: i64,
    pub order: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReorderRequest {
    pub photos: Vec<PhotoOrder>,
}

#[derive(Debug, Serialize)]
pub struct GalleryListResponse {
    pub success: bool,
    pub photos: Vec<GalleryPhoto>,
}

#[derive(Debug, Serialize)]
pub struct PhotoResponse {
    pub success: bool,
    pub message: String,
    pub photo: GalleryPhoto,
}

// -- Auth --

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    #[serde(rename = "isAuthenticated")]
    pub is_authenticated: bool,
}

// -- Generic --

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Body of every non-2xx JSON response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn status_uses_camel_case_flag() {
        let json = serde_json::to_value(StatusResponse {
            is_authenticated: true,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({ "isAuthenticated": true }));
    }

    #[test]
    fn memory_without_photo_omits_field() {
        let memory = Memory {
            id: 1,
            from: "Alice".into(),
            message: "Hi".into(),
            photo_url: None,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&memory).unwrap();
        assert!(json.get("photo_url").is_none());
        assert_eq!(json["from"], "Alice");
    }

    #[test]
    fn login_request_tolerates_missing_fields() {
        let req: LoginRequest = serde_json::from_str(r#"{"username":"admin"}"#).unwrap();
        assert_eq!(req.username.as_deref(), Some("admin"));
        assert!(req.password.is_none());
    }

    #[test]
    fn reorder_request_rejects_unknown_fields() {
        let res = serde_json::from_str::<ReorderRequest>(r#"{"photos":[],"extra":1}"#);
        assert!(res.is_err());
    }
}
