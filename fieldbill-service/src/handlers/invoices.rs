use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use validator::Validate;

use crate::dtos::{
    CreateInvoiceRequest, DeleteResponse, InvoiceResponse, ListInvoicesParams,
    ListInvoicesResponse, RecordPaymentRequest, RecordPaymentResponse, UpdateInvoiceRequest,
};
use crate::models::{CreateInvoice, ListInvoicesFilter, NewLineItem, RecordPayment, UpdateInvoice};
use crate::startup::AppState;

pub async fn create_invoice(
    State(state): State<AppState>,
    Json(payload): Json<CreateInvoiceRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let line_items: Vec<NewLineItem> =
        payload.line_items.into_iter().map(NewLineItem::from).collect();

    let (invoice, line_items) = state
        .db
        .create_invoice(&CreateInvoice {
            customer_id: payload.customer_id,
            estimate_id: payload.estimate_id,
            title: payload.title,
            description: payload.description,
            tax_rate: payload.tax_rate,
            issue_date: payload.issue_date,
            due_date: payload.due_date,
            notes: payload.notes,
            line_items,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(InvoiceResponse::with_line_items(invoice, line_items)),
    ))
}

pub async fn list_invoices(
    State(state): State<AppState>,
    Query(params): Query<ListInvoicesParams>,
) -> Result<impl IntoResponse, AppError> {
    let invoices = state
        .db
        .list_invoices(&ListInvoicesFilter {
            customer_id: params.customer_id,
            status: params.status,
        })
        .await?;

    Ok(Json(ListInvoicesResponse {
        invoices: invoices.into_iter().map(InvoiceResponse::from_row).collect(),
    }))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let invoice = state
        .db
        .get_invoice(id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;
    let line_items = state.db.invoice_line_items(id).await?;

    Ok(Json(InvoiceResponse::with_line_items(invoice, line_items)))
}

pub async fn update_invoice(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateInvoiceRequest>,
) -> Result<impl IntoResponse, AppError> {
    let line_items = payload
        .line_items
        .map(|items| items.into_iter().map(NewLineItem::from).collect());

    let (invoice, line_items) = state
        .db
        .update_invoice(
            id,
            &UpdateInvoice {
                title: payload.title,
                description: payload.description,
                tax_rate: payload.tax_rate,
                due_date: payload.due_date,
                notes: payload.notes,
                line_items,
            },
        )
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;

    Ok(Json(InvoiceResponse::with_line_items(invoice, line_items)))
}

pub async fn delete_invoice(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !state.db.delete_invoice(id).await? {
        return Err(AppError::NotFound(anyhow::anyhow!("Invoice not found")));
    }

    Ok(Json(DeleteResponse { success: true }))
}

pub async fn record_payment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<RecordPaymentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let invoice = state
        .db
        .record_payment(
            id,
            &RecordPayment {
                amount: payload.amount,
                payment_method: payload.payment_method,
                payment_reference: payload.payment_reference,
            },
        )
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;

    Ok(Json(RecordPaymentResponse {
        invoice: InvoiceResponse::from_row(invoice),
    }))
}
