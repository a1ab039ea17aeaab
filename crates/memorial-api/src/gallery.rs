use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
};
use axum_extra::extract::WithRejection;
use tracing::info;

use memorial_db::ReorderOutcome;
use memorial_types::api::{
    GalleryListResponse, MessageResponse, PhotoResponse, ReorderRequest, UpdateCaptionRequest,
};

use crate::blob::sanitize_filename;
use crate::error::{ApiError, parse_id};
use crate::session::ActiveSession;
use crate::state::AppState;
use crate::upload::read_form;

const GALLERY_FOLDER: &str = "gallery";

async fn load_gallery(
    state: &AppState,
    message: &'static str,
) -> Result<Json<GalleryListResponse>, ApiError> {
    let rows = state.run_db(message, |db| db.list_gallery()).await?;
    Ok(Json(GalleryListResponse {
        success: true,
        photos: rows.into_iter().map(|r| r.into_photo()).collect(),
    }))
}

/// GET /api/gallery
pub async fn list(State(state): State<AppState>) -> Result<Json<GalleryListResponse>, ApiError> {
    load_gallery(&state, "Failed to retrieve gallery").await
}

/// GET /api/admin/gallery
pub async fn admin_list(
    State(state): State<AppState>,
) -> Result<Json<GalleryListResponse>, ApiError> {
    load_gallery(&state, "Failed to load gallery").await
}

/// POST /api/admin/gallery: multipart `photo` plus optional `caption`.
pub async fn upload(
    State(state): State<AppState>,
    WithRejection(multipart, _): WithRejection<Multipart, ApiError>,
) -> Result<Json<PhotoResponse>, ApiError> {
    let mut form = read_form(multipart).await?;
    let photo = form
        .photo
        .take()
        .ok_or_else(|| ApiError::Upload("No photo uploaded".into()))?;
    let caption = form.take("caption").unwrap_or_default().trim().to_string();
    let filename = sanitize_filename(&photo.filename);

    let stored = state
        .blobs
        .upload(photo.bytes, &photo.filename, GALLERY_FOLDER)
        .await
        .map_err(|e| ApiError::storage("Failed to upload photo", e))?;

    let url = stored.url.clone();
    let saved = state
        .run_db("Failed to upload photo", move |db| {
            db.create_photo(&filename, &url, &caption)
        })
        .await;

    let row = match saved {
        Ok(row) => row,
        Err(e) => {
            state.blobs.delete(&stored.url).await;
            return Err(e);
        }
    };

    info!("Gallery photo {} added at position {}", row.id, row.display_order);
    Ok(Json(PhotoResponse {
        success: true,
        message: "Photo added successfully".into(),
        photo: row.into_photo(),
    }))
}

/// PUT /api/admin/gallery/{id}
pub async fn update_caption(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<String>, ApiError>,
    WithRejection(Json(req), _): WithRejection<Json<UpdateCaptionRequest>, ApiError>,
) -> Result<Json<PhotoResponse>, ApiError> {
    let id = parse_id(&id, "Photo not found")?;
    let caption = req.caption.unwrap_or_default().trim().to_string();

    let row = state
        .run_db("Failed to update photo", move |db| db.update_caption(id, &caption))
        .await?
        .ok_or(ApiError::NotFound("Photo not found"))?;

    Ok(Json(PhotoResponse {
        success: true,
        message: "Photo updated successfully".into(),
        photo: row.into_photo(),
    }))
}

/// DELETE /api/admin/gallery/{id}: removes the row, then the blob.
pub async fn delete(
    State(state): State<AppState>,
    Extension(session): Extension<ActiveSession>,
    WithRejection(Path(id), _): WithRejection<Path<String>, ApiError>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_id(&id, "Photo not found")?;
    let row = state
        .run_db("Failed to delete photo", move |db| db.delete_photo(id))
        .await?
        .ok_or(ApiError::NotFound("Photo not found"))?;

    state.blobs.delete(&row.photo_url).await;

    info!("Gallery photo {} deleted by {}", id, session.username());
    Ok(Json(MessageResponse::ok("Photo deleted successfully")))
}

/// PUT /api/admin/gallery/reorder: all-or-nothing.
pub async fn reorder(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<ReorderRequest>, ApiError>,
) -> Result<Json<MessageResponse>, ApiError> {
    let updates: Vec<(i64, i64)> = req.photos.iter().map(|p| (p.id, p.order)).collect();
    let count = updates.len();

    let outcome = state
        .run_db("Failed to reorder gallery", move |db| db.reorder_gallery(&updates))
        .await?;

    match outcome {
        ReorderOutcome::Applied => {
            info!("Gallery reordered ({} photos)", count);
            Ok(Json(MessageResponse::ok("Gallery order updated")))
        }
        ReorderOutcome::Missing(_) => Err(ApiError::NotFound("Photo not found")),
    }
}
