use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{Estimate, EstimateStatus, ItemType, LineItem, NewLineItem};

/// One line item in a create or replace-all batch.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemInput {
    pub item_type: ItemType,
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub quantity: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    #[serde(default)]
    pub sort_order: i32,
}

impl From<LineItemInput> for NewLineItem {
    fn from(input: LineItemInput) -> Self {
        Self {
            item_type: input.item_type,
            description: input.description,
            quantity: input.quantity,
            unit_price: input.unit_price,
            total: input.total,
            sort_order: input.sort_order,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEstimateRequest {
    pub customer_id: i64,
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    pub description: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub tax_rate: Option<Decimal>,
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<String>,
    #[validate(length(min = 1, message = "at least one line item is required"))]
    pub line_items: Vec<LineItemInput>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEstimateRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub tax_rate: Option<Decimal>,
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<String>,
    pub line_items: Option<Vec<LineItemInput>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListEstimatesParams {
    pub customer_id: Option<i64>,
    pub status: Option<EstimateStatus>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemResponse {
    pub id: i64,
    pub item_type: String,
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub quantity: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub sort_order: i32,
}

impl From<LineItem> for LineItemResponse {
    fn from(item: LineItem) -> Self {
        Self {
            id: item.id,
            item_type: item.item_type,
            description: item.description,
            quantity: item.quantity,
            unit_price: item.unit_price,
            total: item.total,
            sort_order: item.sort_order,
        }
    }
}

/// Estimate as sent over the wire. List responses omit `lineItems`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateResponse {
    pub id: i64,
    pub customer_id: i64,
    pub estimate_number: String,
    pub status: String,
    pub title: String,
    pub description: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax_rate: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_items: Option<Vec<LineItemResponse>>,
}

impl EstimateResponse {
    /// Header only, for list responses.
    pub fn from_row(estimate: Estimate) -> Self {
        Self::build(estimate, None)
    }

    pub fn with_line_items(estimate: Estimate, line_items: Vec<LineItem>) -> Self {
        let items = line_items.into_iter().map(LineItemResponse::from).collect();
        Self::build(estimate, Some(items))
    }

    fn build(estimate: Estimate, line_items: Option<Vec<LineItemResponse>>) -> Self {
        Self {
            id: estimate.id,
            customer_id: estimate.customer_id,
            estimate_number: estimate.estimate_number,
            status: estimate.status,
            title: estimate.title,
            description: estimate.description,
            subtotal: estimate.subtotal,
            tax_rate: estimate.tax_rate,
            tax_amount: estimate.tax_amount,
            total: estimate.total,
            valid_until: estimate.valid_until,
            notes: estimate.notes,
            created_at: estimate.created_at,
            updated_at: estimate.updated_at,
            sent_at: estimate.sent_at,
            approved_at: estimate.approved_at,
            line_items,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListEstimatesResponse {
    pub estimates: Vec<EstimateResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveEstimateResponse {
    pub estimate: EstimateResponse,
    pub invoice_id: i64,
}
