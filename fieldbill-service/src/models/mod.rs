//! Domain models for fieldbill-service.

mod customer;
mod estimate;
mod invoice;
mod line_item;
mod numbering;
mod photo;

pub use customer::{CreateCustomer, Customer, UpdateCustomer};
pub use estimate::{
    CreateEstimate, Estimate, EstimateStatus, ListEstimatesFilter, UpdateEstimate,
};
pub use invoice::{
    CreateInvoice, Invoice, InvoiceStatus, ListInvoicesFilter, RecordPayment, UpdateInvoice,
};
pub use line_item::{ItemType, LineItem, NewLineItem};
pub use numbering::DocumentKind;
pub use photo::{CreatePhoto, ListPhotosFilter, Photo};
