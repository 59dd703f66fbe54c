use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::dtos::estimates::{LineItemInput, LineItemResponse};
use crate::models::{Invoice, InvoiceStatus, LineItem};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceRequest {
    pub customer_id: i64,
    pub estimate_id: Option<i64>,
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    pub description: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub tax_rate: Option<Decimal>,
    pub issue_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    #[validate(length(min = 1, message = "at least one line item is required"))]
    pub line_items: Vec<LineItemInput>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInvoiceRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub tax_rate: Option<Decimal>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub line_items: Option<Vec<LineItemInput>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPaymentRequest {
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub payment_method: String,
    pub payment_reference: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListInvoicesParams {
    pub customer_id: Option<i64>,
    pub status: Option<InvoiceStatus>,
}

/// Invoice as sent over the wire. List and payment responses omit `lineItems`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceResponse {
    pub id: i64,
    pub customer_id: i64,
    pub estimate_id: Option<i64>,
    pub invoice_number: String,
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
    #[serde(with = "rust_decimal::serde::float")]
    pub amount_paid: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
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
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_items: Option<Vec<LineItemResponse>>,
}

impl InvoiceResponse {
    /// Header only, for list and payment responses.
    pub fn from_row(invoice: Invoice) -> Self {
        Self::build(invoice, None)
    }

    pub fn with_line_items(invoice: Invoice, line_items: Vec<LineItem>) -> Self {
        let items = line_items.into_iter().map(LineItemResponse::from).collect();
        Self::build(invoice, Some(items))
    }

    fn build(invoice: Invoice, line_items: Option<Vec<LineItemResponse>>) -> Self {
        Self {
            id: invoice.id,
            customer_id: invoice.customer_id,
            estimate_id: invoice.estimate_id,
            invoice_number: invoice.invoice_number,
            status: invoice.status,
            title: invoice.title,
            description: invoice.description,
            subtotal: invoice.subtotal,
            tax_rate: invoice.tax_rate,
            tax_amount: invoice.tax_amount,
            total: invoice.total,
            amount_paid: invoice.amount_paid,
            amount_due: invoice.amount_due,
            issue_date: invoice.issue_date,
            due_date: invoice.due_date,
            paid_date: invoice.paid_date,
            payment_reference: invoice.payment_reference,
            payment_method: invoice.payment_method,
            notes: invoice.notes,
            created_at: invoice.created_at,
            updated_at: invoice.updated_at,
            sent_at: invoice.sent_at,
            line_items,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListInvoicesResponse {
    pub invoices: Vec<InvoiceResponse>,
}

#[derive(Debug, Serialize)]
pub struct RecordPaymentResponse {
    pub invoice: InvoiceResponse,
}
