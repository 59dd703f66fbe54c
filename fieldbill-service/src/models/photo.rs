//! Photo attachment model for fieldbill-service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Photo row. References at most one of customer/estimate/invoice and
/// exclusively owns its blob-store key.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Photo {
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

/// Input for persisting an uploaded photo.
#[derive(Debug, Clone)]
pub struct CreatePhoto {
    pub url: String,
    pub storage_key: String,
    pub filename: String,
    pub mime_type: String,
    pub file_size: i64,
    pub caption: Option<String>,
    pub customer_id: Option<i64>,
    pub estimate_id: Option<i64>,
    pub invoice_id: Option<i64>,
}

/// Filter parameters for listing photos by parent.
#[derive(Debug, Clone, Default)]
pub struct ListPhotosFilter {
    pub customer_id: Option<i64>,
    pub estimate_id: Option<i64>,
    pub invoice_id: Option<i64>,
}
