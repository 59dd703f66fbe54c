//! Estimate model for fieldbill-service.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;

use crate::models::NewLineItem;

/// Estimate status. `Approved` and `Rejected` are terminal; an approved
/// estimate and its line items are frozen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateStatus {
    Draft,
    Sent,
    Approved,
    Rejected,
}

impl EstimateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstimateStatus::Draft => "draft",
            EstimateStatus::Sent => "sent",
            EstimateStatus::Approved => "approved",
            EstimateStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for EstimateStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(EstimateStatus::Draft),
            "sent" => Ok(EstimateStatus::Sent),
            "approved" => Ok(EstimateStatus::Approved),
            "rejected" => Ok(EstimateStatus::Rejected),
            other => Err(format!("unknown estimate status: {other}")),
        }
    }
}

/// Estimate document header.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Estimate {
    pub id: i64,
    pub customer_id: i64,
    pub estimate_number: String,
    pub status: String,
    pub title: String,
    pub description: Option<String>,
    pub subtotal: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
}

impl Estimate {
    pub fn is_approved(&self) -> bool {
        self.status == EstimateStatus::Approved.as_str()
    }
}

/// Input for creating an estimate with its line items.
#[derive(Debug, Clone)]
pub struct CreateEstimate {
    pub customer_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub tax_rate: Option<Decimal>,
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<String>,
    pub line_items: Vec<NewLineItem>,
}

/// Input for updating an estimate. `None` fields are left untouched; a
/// non-empty `line_items` replaces the existing set and recomputes totals.
#[derive(Debug, Clone, Default)]
pub struct UpdateEstimate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tax_rate: Option<Decimal>,
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<String>,
    pub line_items: Option<Vec<NewLineItem>>,
}

/// Filter parameters for listing estimates.
#[derive(Debug, Clone, Default)]
pub struct ListEstimatesFilter {
    pub customer_id: Option<i64>,
    pub status: Option<EstimateStatus>,
}
