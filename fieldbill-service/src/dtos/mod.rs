//! Wire types for the REST API. Field names are camelCase and monetary
//! values are JSON numbers, matching the dashboard client.

mod customers;
mod estimates;
mod invoices;
mod photos;

pub use customers::{
    CreateCustomerRequest, CustomerResponse, ListCustomersResponse, UpdateCustomerRequest,
};
pub use estimates::{
    ApproveEstimateResponse, CreateEstimateRequest, EstimateResponse, LineItemInput,
    LineItemResponse, ListEstimatesParams, ListEstimatesResponse, UpdateEstimateRequest,
};
pub use invoices::{
    CreateInvoiceRequest, InvoiceResponse, ListInvoicesParams, ListInvoicesResponse,
    RecordPaymentRequest, RecordPaymentResponse, UpdateInvoiceRequest,
};
pub use photos::{ListPhotosParams, ListPhotosResponse, PhotoResponse, UploadPhotoRequest};

use serde::Serialize;

/// Acknowledgement body for delete endpoints.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
}
