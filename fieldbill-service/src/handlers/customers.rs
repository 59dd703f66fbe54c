use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use validator::Validate;

use crate::dtos::{
    CreateCustomerRequest, CustomerResponse, DeleteResponse, ListCustomersResponse,
    UpdateCustomerRequest,
};
use crate::models::{CreateCustomer, UpdateCustomer};
use crate::startup::AppState;

pub async fn create_customer(
    State(state): State<AppState>,
    Json(payload): Json<CreateCustomerRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let customer = state
        .db
        .create_customer(&CreateCustomer {
            name: payload.name,
            email: payload.email,
            phone: payload.phone,
            address: payload.address,
            notes: payload.notes,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(CustomerResponse::from(customer))))
}

pub async fn list_customers(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let customers = state.db.list_customers().await?;

    Ok(Json(ListCustomersResponse {
        customers: customers.into_iter().map(CustomerResponse::from).collect(),
    }))
}

pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let customer = state
        .db
        .get_customer(id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Customer not found")))?;

    Ok(Json(CustomerResponse::from(customer)))
}

pub async fn update_customer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateCustomerRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let customer = state
        .db
        .update_customer(
            id,
            &UpdateCustomer {
                name: payload.name,
                email: payload.email,
                phone: payload.phone,
                address: payload.address,
                notes: payload.notes,
            },
        )
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Customer not found")))?;

    Ok(Json(CustomerResponse::from(customer)))
}

pub async fn delete_customer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !state.db.delete_customer(id).await? {
        return Err(AppError::NotFound(anyhow::anyhow!("Customer not found")));
    }

    Ok(Json(DeleteResponse { success: true }))
}
