//! Invoice model for fieldbill-service.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;

use crate::models::NewLineItem;

/// Invoice status. A paid invoice and its line items are frozen. `Overdue`
/// and `Cancelled` are carried for external mutation; no operation here
/// assigns them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for InvoiceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(InvoiceStatus::Draft),
            "sent" => Ok(InvoiceStatus::Sent),
            "paid" => Ok(InvoiceStatus::Paid),
            "overdue" => Ok(InvoiceStatus::Overdue),
            "cancelled" => Ok(InvoiceStatus::Cancelled),
            other => Err(format!("unknown invoice status: {other}")),
        }
    }
}

/// Invoice document header. `amount_due == total - amount_paid` at all times.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invoice {
    pub id: i64,
    pub customer_id: i64,
    pub estimate_id: Option<i64>,
    pub invoice_number: String,
    pub status: String,
    pub title: String,
    pub description: Option<String>,
    pub subtotal: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
    pub amount_paid: Decimal,
    pub amount_due: Decimal,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub paid_date: Option<DateTime<Utc>>,
    pub payment_reference: Option<String>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}

impl Invoice {
    pub fn is_paid(&self) -> bool {
        self.status == InvoiceStatus::Paid.as_str()
    }
}

/// Input for creating an invoice with its line items.
#[derive(Debug, Clone)]
pub struct CreateInvoice {
    pub customer_id: i64,
    pub estimate_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub tax_rate: Option<Decimal>,
    pub issue_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub line_items: Vec<NewLineItem>,
}

/// Input for updating an invoice. `None` fields are left untouched; a
/// non-empty `line_items` replaces the existing set, recomputes totals, and
/// resets `amount_due` to the new total.
#[derive(Debug, Clone, Default)]
pub struct UpdateInvoice {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tax_rate: Option<Decimal>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub line_items: Option<Vec<NewLineItem>>,
}

/// Input for recording a payment against an invoice.
#[derive(Debug, Clone)]
pub struct RecordPayment {
    pub amount: Decimal,
    pub payment_method: String,
    pub payment_reference: Option<String>,
}

/// Filter parameters for listing invoices.
#[derive(Debug, Clone, Default)]
pub struct ListInvoicesFilter {
    pub customer_id: Option<i64>,
    pub status: Option<InvoiceStatus>,
}
