use std::collections::HashMap;

use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use bytes::Bytes;
use tracing::{debug, warn};

use crate::error::ApiError;

/// 10 MB per photo.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Request body limit for upload routes: one photo plus room for the text
/// fields and multipart framing.
pub const MAX_REQUEST_BYTES: usize = MAX_UPLOAD_BYTES + 512 * 1024;

const ALLOWED_IMAGE_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
];

const PHOTO_FIELD: &str = "photo";

#[derive(Debug, Clone)]
pub struct UploadedPhoto {
    pub filename: String,
    pub bytes: Bytes,
}

/// A parsed multipart form: text fields by name plus the optional `photo`.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub fields: HashMap<String, String>,
    pub photo: Option<UploadedPhoto>,
}

impl UploadForm {
    /// Moves a field out of the form.
    pub fn take(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name)
    }
}

/// MIME type for an allowed image filename, by extension.
pub fn content_type_for(filename: &str) -> Option<&'static str> {
    let ext = filename.rsplit_once('.')?.1.to_ascii_lowercase();
    ALLOWED_IMAGE_TYPES
        .iter()
        .find(|(allowed, _)| *allowed == ext)
        .map(|(_, mime)| *mime)
}

/// Both the extension and the declared MIME type must be on the allow-list.
pub fn check_image(filename: &str, content_type: &str) -> Result<(), ApiError> {
    let declared = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    let mime_ok = ALLOWED_IMAGE_TYPES.iter().any(|(_, mime)| *mime == declared)
        || declared == "image/jpg";

    if content_type_for(filename).is_some() && mime_ok {
        Ok(())
    } else {
        Err(ApiError::Upload("Only image files are allowed".into()))
    }
}

/// Drains a multipart stream, enforcing the image allow-list and size cap on
/// the `photo` part. An empty `photo` part (no file chosen) counts as absent.
pub async fn read_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == PHOTO_FIELD {
            let filename = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().unwrap_or_default().to_string();
            let bytes = field.bytes().await.map_err(multipart_error)?;

            if filename.is_empty() && bytes.is_empty() {
                continue;
            }
            if bytes.len() > MAX_UPLOAD_BYTES {
                return Err(too_large());
            }
            check_image(&filename, &content_type)?;

            debug!("Received photo '{}' ({}, {} bytes)", filename, content_type, bytes.len());
            form.photo = Some(UploadedPhoto { filename, bytes });
        } else {
            let text = field.text().await.map_err(multipart_error)?;
            form.fields.insert(name, text);
        }
    }

    Ok(form)
}

fn too_large() -> ApiError {
    ApiError::Upload("File too large. Maximum size is 10MB.".into())
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_large()
    } else {
        warn!("Malformed multipart body: {}", e.body_text());
        ApiError::BadRequest("Malformed upload".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_accepts_images() {
        for (name, mime) in [
            ("a.jpg", "image/jpeg"),
            ("a.JPEG", "image/jpeg"),
            ("a.png", "image/png"),
            ("a.gif", "image/gif"),
            ("a.webp", "image/webp"),
        ] {
            assert!(check_image(name, mime).is_ok(), "{} should pass", name);
        }
    }

    #[test]
    fn allow_list_rejects_mismatches() {
        assert!(check_image("a.exe", "image/png").is_err());
        assert!(check_image("a.png", "application/pdf").is_err());
        assert!(check_image("noext", "image/png").is_err());
        assert!(check_image("a.svg", "image/svg+xml").is_err());
    }

    #[test]
    fn content_type_by_extension() {
        assert_eq!(content_type_for("x.JPG"), Some("image/jpeg"));
        assert_eq!(content_type_for("x.webp"), Some("image/webp"));
        assert_eq!(content_type_for("x.tiff"), None);
    }
}
