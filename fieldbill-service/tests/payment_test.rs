//! Payment recording integration tests.

mod common;

use common::{line_item, TestApp};
use serde_json::{json, Value};

/// Create an invoice with a 100 subtotal and 10% tax (total 110) and return
/// its id.
async fn create_invoice_110(app: &TestApp, customer_id: i64) -> i64 {
    let response = app
        .client
        .post(format!("{}/invoices", app.address))
        .json(&json!({
            "customerId": customer_id,
            "title": "Payment target",
            "taxRate": 10.0,
            "lineItems": [line_item("labor", "Work", 2.0, 50.0, 100.0)]
        }))
        .send()
        .await
        .expect("Failed to create invoice");
    assert_eq!(response.status().as_u16(), 201);
    let body: Value = response.json().await.expect("Invalid invoice body");
    body["id"].as_i64().unwrap()
}

async fn pay(app: &TestApp, invoice_id: i64, amount: f64) -> reqwest::Response {
    app.client
        .post(format!("{}/invoices/{}/payment", app.address, invoice_id))
        .json(&json!({
            "amount": amount,
            "paymentMethod": "card",
            "paymentReference": "TXN-123456"
        }))
        .send()
        .await
        .expect("Failed to send payment")
}

#[tokio::test]
async fn full_payment_marks_invoice_paid() {
    let app = TestApp::spawn().await;
    let customer_id = app.create_customer("Full Payment Customer").await;
    let invoice_id = create_invoice_110(&app, customer_id).await;

    let response = pay(&app, invoice_id, 110.0).await;
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Invalid payment body");
    let invoice = &body["invoice"];
    assert_eq!(invoice["status"], "paid");
    assert_eq!(invoice["amountPaid"].as_f64().unwrap(), 110.0);
    assert_eq!(invoice["amountDue"].as_f64().unwrap(), 0.0);
    assert!(invoice["paidDate"].is_string());
    assert_eq!(invoice["paymentMethod"], "card");
    assert_eq!(invoice["paymentReference"], "TXN-123456");
    // Payment responses carry the header only.
    assert!(invoice.get("lineItems").is_none());

    app.cleanup().await;
}

#[tokio::test]
async fn paying_a_paid_invoice_fails_with_conflict() {
    let app = TestApp::spawn().await;
    let customer_id = app.create_customer("Repeat Payment Customer").await;
    let invoice_id = create_invoice_110(&app, customer_id).await;

    let response = pay(&app, invoice_id, 110.0).await;
    assert!(response.status().is_success());

    let response = pay(&app, invoice_id, 10.0).await;
    assert_eq!(response.status().as_u16(), 409);

    app.cleanup().await;
}

#[tokio::test]
async fn partial_payments_accumulate_and_settle_on_the_second() {
    let app = TestApp::spawn().await;
    let customer_id = app.create_customer("Partial Payment Customer").await;
    let invoice_id = create_invoice_110(&app, customer_id).await;

    // First payment leaves the invoice outstanding.
    let response = pay(&app, invoice_id, 60.0).await;
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Invalid body");
    let invoice = &body["invoice"];
    assert_eq!(invoice["status"], "sent");
    assert_eq!(invoice["amountPaid"].as_f64().unwrap(), 60.0);
    assert_eq!(invoice["amountDue"].as_f64().unwrap(), 50.0);
    assert!(invoice["paidDate"].is_null());

    // Second payment settles it.
    let response = pay(&app, invoice_id, 50.0).await;
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Invalid body");
    let invoice = &body["invoice"];
    assert_eq!(invoice["status"], "paid");
    assert_eq!(invoice["amountPaid"].as_f64().unwrap(), 110.0);
    assert_eq!(invoice["amountDue"].as_f64().unwrap(), 0.0);
    assert!(invoice["paidDate"].is_string());

    app.cleanup().await;
}

#[tokio::test]
async fn overpayment_settles_with_negative_amount_due() {
    let app = TestApp::spawn().await;
    let customer_id = app.create_customer("Overpayment Customer").await;
    let invoice_id = create_invoice_110(&app, customer_id).await;

    let response = pay(&app, invoice_id, 150.0).await;
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Invalid body");
    let invoice = &body["invoice"];
    assert_eq!(invoice["status"], "paid");
    assert_eq!(invoice["amountPaid"].as_f64().unwrap(), 150.0);
    assert_eq!(invoice["amountDue"].as_f64().unwrap(), -40.0);

    app.cleanup().await;
}

#[tokio::test]
async fn payment_on_missing_invoice_returns_404() {
    let app = TestApp::spawn().await;

    let response = pay(&app, 9999, 10.0).await;
    assert_eq!(response.status().as_u16(), 404);

    app.cleanup().await;
}

#[tokio::test]
async fn paid_invoice_cannot_be_updated_or_deleted() {
    let app = TestApp::spawn().await;
    let customer_id = app.create_customer("Frozen Invoice Customer").await;
    let invoice_id = create_invoice_110(&app, customer_id).await;

    let response = pay(&app, invoice_id, 110.0).await;
    assert!(response.status().is_success());

    let response = app
        .client
        .put(format!("{}/invoices/{}", app.address, invoice_id))
        .json(&json!({ "title": "Too late" }))
        .send()
        .await
        .expect("Failed to send update");
    assert_eq!(response.status().as_u16(), 409);

    let response = app
        .client
        .delete(format!("{}/invoices/{}", app.address, invoice_id))
        .send()
        .await
        .expect("Failed to send delete");
    assert_eq!(response.status().as_u16(), 409);

    // Row and line items are intact.
    let response = app
        .client
        .get(format!("{}/invoices/{}", app.address, invoice_id))
        .send()
        .await
        .expect("Failed to get invoice");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Invalid body");
    assert_eq!(body["status"], "paid");
    assert_eq!(body["lineItems"].as_array().unwrap().len(), 1);

    app.cleanup().await;
}
