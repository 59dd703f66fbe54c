//! Document numbering integration tests.

mod common;

use common::{line_item, TestApp};
use serde_json::{json, Value};
use std::collections::HashSet;

async fn create_estimate_number(app: &TestApp, customer_id: i64) -> String {
    let response = app
        .client
        .post(format!("{}/estimates", app.address))
        .json(&json!({
            "customerId": customer_id,
            "title": "Numbered estimate",
            "lineItems": [line_item("labor", "Work", 1.0, 100.0, 100.0)]
        }))
        .send()
        .await
        .expect("Failed to create estimate");
    assert_eq!(response.status().as_u16(), 201);
    let body: Value = response.json().await.expect("Invalid estimate body");
    body["estimateNumber"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn sequential_creates_produce_increasing_numbers() {
    let app = TestApp::spawn().await;
    let customer_id = app.create_customer("Numbering Customer").await;

    assert_eq!(create_estimate_number(&app, customer_id).await, "EST-00001");
    assert_eq!(create_estimate_number(&app, customer_id).await, "EST-00002");
    assert_eq!(create_estimate_number(&app, customer_id).await, "EST-00003");

    app.cleanup().await;
}

#[tokio::test]
async fn estimate_and_invoice_sequences_are_independent() {
    let app = TestApp::spawn().await;
    let customer_id = app.create_customer("Independent Customer").await;

    assert_eq!(create_estimate_number(&app, customer_id).await, "EST-00001");

    let response = app
        .client
        .post(format!("{}/invoices", app.address))
        .json(&json!({
            "customerId": customer_id,
            "title": "Numbered invoice",
            "lineItems": [line_item("labor", "Work", 1.0, 100.0, 100.0)]
        }))
        .send()
        .await
        .expect("Failed to create invoice");
    let body: Value = response.json().await.expect("Invalid invoice body");
    assert_eq!(body["invoiceNumber"], "INV-00001");

    assert_eq!(create_estimate_number(&app, customer_id).await, "EST-00002");

    app.cleanup().await;
}

#[tokio::test]
async fn concurrent_creates_never_duplicate_numbers() {
    let app = TestApp::spawn().await;
    let customer_id = app.create_customer("Concurrent Customer").await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let client = app.client.clone();
        let address = app.address.clone();
        handles.push(tokio::spawn(async move {
            let response = client
                .post(format!("{}/estimates", address))
                .json(&json!({
                    "customerId": customer_id,
                    "title": "Racing estimate",
                    "lineItems": [line_item("labor", "Work", 1.0, 100.0, 100.0)]
                }))
                .send()
                .await
                .expect("Failed to create estimate");
            assert_eq!(response.status().as_u16(), 201);
            let body: Value = response.json().await.expect("Invalid estimate body");
            body["estimateNumber"].as_str().unwrap().to_string()
        }));
    }

    let mut numbers = HashSet::new();
    for handle in handles {
        let number = handle.await.expect("Task panicked");
        assert!(number.starts_with("EST-"));
        assert!(
            numbers.insert(number.clone()),
            "duplicate document number {number}"
        );
    }
    assert_eq!(numbers.len(), 10);

    app.cleanup().await;
}
