pub mod customers;
pub mod estimates;
pub mod health;
pub mod invoices;
pub mod photos;

pub use customers::{
    create_customer, delete_customer, get_customer, list_customers, update_customer,
};
pub use estimates::{
    approve_estimate, create_estimate, delete_estimate, get_estimate, list_estimates,
    update_estimate,
};
pub use health::{health_check, metrics_endpoint};
pub use invoices::{
    create_invoice, delete_invoice, get_invoice, list_invoices, record_payment, update_invoice,
};
pub use photos::{delete_photo, list_photos, upload_photo};
