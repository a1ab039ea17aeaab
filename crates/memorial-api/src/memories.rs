use axum::{
    Extension, Json, RequestExt,
    extract::{Multipart, Path, Query, Request, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use tracing::{info, warn};

use memorial_types::api::{
    CreateMemoryRequest, ListQuery, MemoryListResponse, MemoryResponse, MessageResponse,
    UpdateMemoryRequest,
};

use crate::error::{ApiError, parse_id};
use crate::middleware::ClientIp;
use crate::session::ActiveSession;
use crate::state::AppState;
use crate::upload::{UploadedPhoto, read_form};
use crate::validate::{supplied, validate_memory, validate_memory_update};

const MEMORY_FOLDER: &str = "memories";

/// GET /api/memories: newest first, optional `limit`/`offset`.
pub async fn list(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<ListQuery>, ApiError>,
) -> Result<Json<MemoryListResponse>, ApiError> {
    let rows = state
        .run_db("Failed to retrieve memories", move |db| {
            db.list_memories(query.limit, query.offset)
        })
        .await?;

    Ok(Json(MemoryListResponse {
        success: true,
        memories: rows.into_iter().map(|r| r.into_memory()).collect(),
    }))
}

/// POST /api/memories: JSON `{from, message}` or a multipart form with an
/// optional `photo`.
pub async fn create(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    req: Request,
) -> Result<impl IntoResponse, ApiError> {
    if !state.memory_limiter.allow(&ip) {
        warn!("Memory submission rate limit hit for {}", ip);
        return Err(ApiError::RateLimited(
            "Too many requests. Please wait a minute before submitting again.",
        ));
    }

    let (candidate, photo) = read_submission(req).await?;

    let validation = validate_memory(&candidate);
    if !validation.valid {
        return Err(ApiError::Validation(validation.errors));
    }
    let from = candidate.from.unwrap_or_default().trim().to_string();
    let message = candidate.message.unwrap_or_default().trim().to_string();

    let photo_url = match photo {
        Some(photo) => {
            let stored = state
                .blobs
                .upload(photo.bytes, &photo.filename, MEMORY_FOLDER)
                .await
                .map_err(|e| ApiError::storage("Failed to save memory", e))?;
            Some(stored.url)
        }
        None => None,
    };

    let url = photo_url.clone();
    let saved = state
        .run_db("Failed to save memory", move |db| {
            db.create_memory(&from, &message, url.as_deref())
        })
        .await;

    let row = match saved {
        Ok(row) => row,
        Err(e) => {
            // Don't leave an orphaned blob behind a failed insert.
            if let Some(url) = photo_url {
                state.blobs.delete(&url).await;
            }
            return Err(e);
        }
    };

    info!("Memory {} shared from {}", row.id, ip);
    Ok((
        StatusCode::CREATED,
        Json(MemoryResponse {
            success: true,
            message: "Memory shared successfully".into(),
            memory: row.into_memory(),
        }),
    ))
}

async fn read_submission(
    req: Request,
) -> Result<(CreateMemoryRequest, Option<UploadedPhoto>), ApiError> {
    let is_multipart = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));

    if is_multipart {
        let multipart: Multipart = req.extract().await?;
        let mut form = read_form(multipart).await?;
        let candidate = CreateMemoryRequest {
            from: form.take("from"),
            message: form.take("message"),
        };
        Ok((candidate, form.photo))
    } else {
        let Json(candidate): Json<CreateMemoryRequest> = req.extract().await?;
        Ok((candidate, None))
    }
}

// -- Admin moderation --

/// GET /api/admin/memories
pub async fn admin_list(
    State(state): State<AppState>,
) -> Result<Json<MemoryListResponse>, ApiError> {
    let rows = state
        .run_db("Failed to load memories", |db| db.list_memories(None, None))
        .await?;

    Ok(Json(MemoryListResponse {
        success: true,
        memories: rows.into_iter().map(|r| r.into_memory()).collect(),
    }))
}

/// PUT /api/admin/memories/{id}: blank or missing fields keep their value.
pub async fn update(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<String>, ApiError>,
    WithRejection(Json(req), _): WithRejection<Json<UpdateMemoryRequest>, ApiError>,
) -> Result<Json<MemoryResponse>, ApiError> {
    let id = parse_id(&id, "Memory not found")?;
    let validation = validate_memory_update(&req);
    if !validation.valid {
        return Err(ApiError::Validation(validation.errors));
    }

    let from = supplied(req.from.as_deref()).map(String::from);
    let message = supplied(req.message.as_deref()).map(String::from);

    let row = state
        .run_db("Failed to update memory", move |db| {
            db.update_memory(id, from.as_deref(), message.as_deref())
        })
        .await?
        .ok_or(ApiError::NotFound("Memory not found"))?;

    info!("Memory {} updated", id);
    Ok(Json(MemoryResponse {
        success: true,
        message: "Memory updated successfully".into(),
        memory: row.into_memory(),
    }))
}

/// DELETE /api/admin/memories/{id}: also removes the attached photo.
pub async fn delete(
    State(state): State<AppState>,
    Extension(session): Extension<ActiveSession>,
    WithRejection(Path(id), _): WithRejection<Path<String>, ApiError>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_id(&id, "Memory not found")?;
    let row = state
        .run_db("Failed to delete memory", move |db| db.delete_memory(id))
        .await?
        .ok_or(ApiError::NotFound("Memory not found"))?;

    if let Some(url) = &row.photo_url {
        state.blobs.delete(url).await;
    }

    info!("Memory {} deleted by {}", id, session.username());
    Ok(Json(MessageResponse::ok("Memory deleted successfully")))
}
