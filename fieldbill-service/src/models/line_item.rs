//! Line item model for fieldbill-service.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;

/// Kind of billable entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Labor,
    Material,
    Other,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Labor => "labor",
            ItemType::Material => "material",
            ItemType::Other => "other",
        }
    }
}

impl FromStr for ItemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "labor" => Ok(ItemType::Labor),
            "material" => Ok(ItemType::Material),
            "other" => Ok(ItemType::Other),
            other => Err(format!("unknown item type: {other}")),
        }
    }
}

/// Line item on an estimate or invoice. Exactly one parent reference is set.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LineItem {
    pub id: i64,
    pub estimate_id: Option<i64>,
    pub invoice_id: Option<i64>,
    pub item_type: String,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total: Decimal,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

/// Input for one line item in a document create or replace-all batch.
///
/// The `total` is supplied by the caller and stored verbatim; it is not
/// recomputed from `quantity * unit_price`.
#[derive(Debug, Clone)]
pub struct NewLineItem {
    pub item_type: ItemType,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total: Decimal,
    pub sort_order: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_type_round_trips_through_str() {
        for item_type in [ItemType::Labor, ItemType::Material, ItemType::Other] {
            assert_eq!(item_type.as_str().parse::<ItemType>(), Ok(item_type));
        }
    }

    #[test]
    fn unknown_item_type_is_rejected() {
        assert!("equipment".parse::<ItemType>().is_err());
    }
}
