use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::{
    DeleteResponse, ListPhotosParams, ListPhotosResponse, PhotoResponse, UploadPhotoRequest,
};
use crate::models::{CreatePhoto, ListPhotosFilter};
use crate::startup::AppState;

const MAX_PHOTO_BYTES: usize = 10 * 1024 * 1024;
const ALLOWED_MIME_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/webp", "image/heic"];

pub async fn upload_photo(
    State(state): State<AppState>,
    Json(payload): Json<UploadPhotoRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.customer_id.is_none()
        && payload.estimate_id.is_none()
        && payload.invoice_id.is_none()
    {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Must specify customerId, estimateId, or invoiceId"
        )));
    }

    let data = BASE64.decode(payload.data.as_bytes()).map_err(|e| {
        AppError::BadRequest(anyhow::anyhow!("Invalid base64 image data: {}", e))
    })?;

    if data.len() > MAX_PHOTO_BYTES {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "File size exceeds 10MB limit"
        )));
    }

    if !ALLOWED_MIME_TYPES.contains(&payload.mime_type.as_str()) {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Invalid mime type. Allowed: {}",
            ALLOWED_MIME_TYPES.join(", ")
        )));
    }

    let extension = payload.mime_type.split('/').nth(1).unwrap_or("bin");
    let storage_key = format!("{}.{}", Uuid::new_v4(), extension);
    let file_size = data.len() as i64;

    tracing::info!(
        storage_key = %storage_key,
        filename = %payload.filename,
        size = %file_size,
        "Photo upload started"
    );

    // Blob first; a row-insert failure after this point leaks the blob.
    state
        .storage
        .upload(&storage_key, data, &payload.mime_type)
        .await
        .map_err(|e| {
            tracing::error!("Failed to upload photo {} to storage: {}", storage_key, e);
            e
        })?;

    let url = state.storage.public_url(&storage_key);

    let photo = state
        .db
        .create_photo(&CreatePhoto {
            url,
            storage_key,
            filename: payload.filename,
            mime_type: payload.mime_type,
            file_size,
            caption: payload.caption,
            customer_id: payload.customer_id,
            estimate_id: payload.estimate_id,
            invoice_id: payload.invoice_id,
        })
        .await?;

    tracing::info!(photo_id = %photo.id, "Photo upload completed");

    Ok((StatusCode::CREATED, Json(PhotoResponse::from(photo))))
}

pub async fn list_photos(
    State(state): State<AppState>,
    Query(params): Query<ListPhotosParams>,
) -> Result<impl IntoResponse, AppError> {
    let photos = state
        .db
        .list_photos(&ListPhotosFilter {
            customer_id: params.customer_id,
            estimate_id: params.estimate_id,
            invoice_id: params.invoice_id,
        })
        .await?;

    Ok(Json(ListPhotosResponse {
        photos: photos.into_iter().map(PhotoResponse::from).collect(),
    }))
}

pub async fn delete_photo(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let photo = state
        .db
        .get_photo(id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Photo not found")))?;

    // Blob removal must succeed before the row goes; on failure the row is
    // retained so the photo stays deletable.
    state.storage.delete(&photo.storage_key).await.map_err(|e| {
        tracing::error!(
            photo_id = %id,
            storage_key = %photo.storage_key,
            "Failed to delete photo blob"
        );
        e
    })?;

    state.db.delete_photo(id).await?;

    Ok(Json(DeleteResponse { success: true }))
}
