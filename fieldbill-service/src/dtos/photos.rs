use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Photo;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadPhotoRequest {
    pub filename: String,
    pub mime_type: String,
    /// Base64-encoded image bytes.
    pub data: String,
    pub caption: Option<String>,
    pub customer_id: Option<i64>,
    pub estimate_id: Option<i64>,
    pub invoice_id: Option<i64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListPhotosParams {
    pub customer_id: Option<i64>,
    pub estimate_id: Option<i64>,
    pub invoice_id: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoResponse {
    pub id: i64,
    pub url: String,
    pub storage_key: String,
    pub filename: String,
    pub mime_type: String,
    pub file_size: i64,
    pub caption: Option<String>,
    pub customer_id: Option<i64>,
    pub estimate_id: Option<i64>,
    pub invoice_id: Option<i64>,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

impl From<Photo> for PhotoResponse {
    fn from(photo: Photo) -> Self {
        Self {
            id: photo.id,
            url: photo.url,
            storage_key: photo.storage_key,
            filename: photo.filename,
            mime_type: photo.mime_type,
            file_size: photo.file_size,
            caption: photo.caption,
            customer_id: photo.customer_id,
            estimate_id: photo.estimate_id,
            invoice_id: photo.invoice_id,
            sort_order: photo.sort_order,
            created_at: photo.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListPhotosResponse {
    pub photos: Vec<PhotoResponse>,
}
