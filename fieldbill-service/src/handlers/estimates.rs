use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use validator::Validate;

use crate::dtos::{
    ApproveEstimateResponse, CreateEstimateRequest, DeleteResponse, EstimateResponse,
    ListEstimatesParams, ListEstimatesResponse, UpdateEstimateRequest,
};
use crate::models::{CreateEstimate, ListEstimatesFilter, NewLineItem, UpdateEstimate};
use crate::startup::AppState;

pub async fn create_estimate(
    State(state): State<AppState>,
    Json(payload): Json<CreateEstimateRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let line_items: Vec<NewLineItem> =
        payload.line_items.into_iter().map(NewLineItem::from).collect();

    let (estimate, line_items) = state
        .db
        .create_estimate(&CreateEstimate {
            customer_id: payload.customer_id,
            title: payload.title,
            description: payload.description,
            tax_rate: payload.tax_rate,
            valid_until: payload.valid_until,
            notes: payload.notes,
            line_items,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(EstimateResponse::with_line_items(estimate, line_items)),
    ))
}

pub async fn list_estimates(
    State(state): State<AppState>,
    Query(params): Query<ListEstimatesParams>,
) -> Result<impl IntoResponse, AppError> {
    let estimates = state
        .db
        .list_estimates(&ListEstimatesFilter {
            customer_id: params.customer_id,
            status: params.status,
        })
        .await?;

    Ok(Json(ListEstimatesResponse {
        estimates: estimates
            .into_iter()
            .map(EstimateResponse::from_row)
            .collect(),
    }))
}

pub async fn get_estimate(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let estimate = state
        .db
        .get_estimate(id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Estimate not found")))?;
    let line_items = state.db.estimate_line_items(id).await?;

    Ok(Json(EstimateResponse::with_line_items(estimate, line_items)))
}

pub async fn update_estimate(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateEstimateRequest>,
) -> Result<impl IntoResponse, AppError> {
    let line_items = payload
        .line_items
        .map(|items| items.into_iter().map(NewLineItem::from).collect());

    let (estimate, line_items) = state
        .db
        .update_estimate(
            id,
            &UpdateEstimate {
                title: payload.title,
                description: payload.description,
                tax_rate: payload.tax_rate,
                valid_until: payload.valid_until,
                notes: payload.notes,
                line_items,
            },
        )
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Estimate not found")))?;

    Ok(Json(EstimateResponse::with_line_items(estimate, line_items)))
}

pub async fn delete_estimate(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !state.db.delete_estimate(id).await? {
        return Err(AppError::NotFound(anyhow::anyhow!("Estimate not found")));
    }

    Ok(Json(DeleteResponse { success: true }))
}

pub async fn approve_estimate(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let (estimate, line_items, invoice_id) = state
        .db
        .approve_estimate(id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Estimate not found")))?;

    Ok(Json(ApproveEstimateResponse {
        estimate: EstimateResponse::with_line_items(estimate, line_items),
        invoice_id,
    }))
}
