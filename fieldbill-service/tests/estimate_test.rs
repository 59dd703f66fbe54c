//! Estimate CRUD integration tests.

mod common;

use common::{line_item, TestApp};
use serde_json::{json, Value};

async fn create_estimate(app: &TestApp, customer_id: i64, title: &str, body: Value) -> Value {
    let mut payload = json!({
        "customerId": customer_id,
        "title": title,
    });
    payload
        .as_object_mut()
        .unwrap()
        .extend(body.as_object().unwrap().clone());

    let response = app
        .client
        .post(format!("{}/estimates", app.address))
        .json(&payload)
        .send()
        .await
        .expect("Failed to create estimate");
    assert_eq!(response.status().as_u16(), 201);
    response.json().await.expect("Invalid estimate body")
}

#[tokio::test]
async fn create_estimate_assigns_number_and_totals() {
    let app = TestApp::spawn().await;
    let customer_id = app.create_customer("Estimate Customer").await;

    let estimate = create_estimate(
        &app,
        customer_id,
        "Deck repair",
        json!({
            "taxRate": 8.5,
            "lineItems": [
                line_item("labor", "Demo and rebuild", 8.0, 45.0, 360.0),
                line_item("material", "Lumber", 1.0, 240.0, 240.0)
            ]
        }),
    )
    .await;

    assert_eq!(estimate["estimateNumber"], "EST-00001");
    assert_eq!(estimate["status"], "draft");
    assert_eq!(estimate["subtotal"].as_f64().unwrap(), 600.0);
    assert_eq!(estimate["taxRate"].as_f64().unwrap(), 8.5);
    assert_eq!(estimate["taxAmount"].as_f64().unwrap(), 51.0);
    assert_eq!(estimate["total"].as_f64().unwrap(), 651.0);
    assert!(estimate["approvedAt"].is_null());

    let items = estimate["lineItems"].as_array().expect("Missing line items");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["itemType"], "labor");
    assert_eq!(items[0]["sortOrder"], 0);
    assert_eq!(items[1]["itemType"], "material");
    assert_eq!(items[1]["sortOrder"], 1);

    app.cleanup().await;
}

#[tokio::test]
async fn create_estimate_with_empty_line_items_fails() {
    let app = TestApp::spawn().await;
    let customer_id = app.create_customer("No Items Customer").await;

    let response = app
        .client
        .post(format!("{}/estimates", app.address))
        .json(&json!({
            "customerId": customer_id,
            "title": "Empty estimate",
            "lineItems": []
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status().as_u16(), 422);

    app.cleanup().await;
}

#[tokio::test]
async fn create_estimate_for_missing_customer_fails() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .post(format!("{}/estimates", app.address))
        .json(&json!({
            "customerId": 9999,
            "title": "Orphan estimate",
            "lineItems": [line_item("labor", "Work", 1.0, 100.0, 100.0)]
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status().as_u16(), 404);

    app.cleanup().await;
}

#[tokio::test]
async fn get_estimate_includes_line_items_in_order() {
    let app = TestApp::spawn().await;
    let customer_id = app.create_customer("Ordered Customer").await;

    let estimate = create_estimate(
        &app,
        customer_id,
        "Three phases",
        json!({
            "lineItems": [
                line_item("labor", "Phase one", 1.0, 100.0, 100.0),
                line_item("labor", "Phase two", 1.0, 100.0, 100.0),
                line_item("other", "Permit fee", 1.0, 50.0, 50.0)
            ]
        }),
    )
    .await;
    let estimate_id = estimate["id"].as_i64().unwrap();

    let response = app
        .client
        .get(format!("{}/estimates/{}", app.address, estimate_id))
        .send()
        .await
        .expect("Failed to get estimate");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Invalid body");
    let items = body["lineItems"].as_array().expect("Missing line items");
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["description"], "Phase one");
    assert_eq!(items[1]["description"], "Phase two");
    assert_eq!(items[2]["description"], "Permit fee");

    app.cleanup().await;
}

#[tokio::test]
async fn get_missing_estimate_returns_404() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(format!("{}/estimates/9999", app.address))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status().as_u16(), 404);

    app.cleanup().await;
}

#[tokio::test]
async fn list_estimates_omits_line_items() {
    let app = TestApp::spawn().await;
    let customer_id = app.create_customer("List Customer").await;

    create_estimate(
        &app,
        customer_id,
        "Listed estimate",
        json!({ "lineItems": [line_item("labor", "Work", 1.0, 100.0, 100.0)] }),
    )
    .await;

    let response = app
        .client
        .get(format!("{}/estimates", app.address))
        .send()
        .await
        .expect("Failed to list estimates");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Invalid body");
    let estimates = body["estimates"].as_array().expect("Missing estimates");
    assert_eq!(estimates.len(), 1);
    assert!(estimates[0].get("lineItems").is_none());

    app.cleanup().await;
}

#[tokio::test]
async fn list_estimates_filters_by_customer_and_status() {
    let app = TestApp::spawn().await;
    let first_customer = app.create_customer("Filter Customer A").await;
    let second_customer = app.create_customer("Filter Customer B").await;

    create_estimate(
        &app,
        first_customer,
        "A's estimate",
        json!({ "lineItems": [line_item("labor", "Work", 1.0, 100.0, 100.0)] }),
    )
    .await;
    create_estimate(
        &app,
        second_customer,
        "B's estimate",
        json!({ "lineItems": [line_item("labor", "Work", 1.0, 100.0, 100.0)] }),
    )
    .await;

    let response = app
        .client
        .get(format!(
            "{}/estimates?customerId={}",
            app.address, first_customer
        ))
        .send()
        .await
        .expect("Failed to list estimates");
    let body: Value = response.json().await.expect("Invalid body");
    let estimates = body["estimates"].as_array().unwrap();
    assert_eq!(estimates.len(), 1);
    assert_eq!(estimates[0]["title"], "A's estimate");

    let response = app
        .client
        .get(format!("{}/estimates?status=draft", app.address))
        .send()
        .await
        .expect("Failed to list estimates");
    let body: Value = response.json().await.expect("Invalid body");
    assert_eq!(body["estimates"].as_array().unwrap().len(), 2);

    let response = app
        .client
        .get(format!("{}/estimates?status=approved", app.address))
        .send()
        .await
        .expect("Failed to list estimates");
    let body: Value = response.json().await.expect("Invalid body");
    assert!(body["estimates"].as_array().unwrap().is_empty());

    app.cleanup().await;
}

#[tokio::test]
async fn update_estimate_fields_leaves_totals_untouched() {
    let app = TestApp::spawn().await;
    let customer_id = app.create_customer("Update Customer").await;

    let estimate = create_estimate(
        &app,
        customer_id,
        "Original title",
        json!({
            "taxRate": 10.0,
            "lineItems": [line_item("labor", "Work", 2.0, 50.0, 100.0)]
        }),
    )
    .await;
    let estimate_id = estimate["id"].as_i64().unwrap();

    let response = app
        .client
        .put(format!("{}/estimates/{}", app.address, estimate_id))
        .json(&json!({
            "title": "Updated title",
            "notes": "Customer prefers afternoons"
        }))
        .send()
        .await
        .expect("Failed to update estimate");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Invalid body");
    assert_eq!(body["title"], "Updated title");
    assert_eq!(body["notes"], "Customer prefers afternoons");
    assert_eq!(body["subtotal"].as_f64().unwrap(), 100.0);
    assert_eq!(body["taxAmount"].as_f64().unwrap(), 10.0);
    assert_eq!(body["total"].as_f64().unwrap(), 110.0);
    assert_eq!(body["lineItems"].as_array().unwrap().len(), 1);

    app.cleanup().await;
}

#[tokio::test]
async fn update_missing_estimate_returns_404() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .put(format!("{}/estimates/9999", app.address))
        .json(&json!({ "title": "Ghost" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status().as_u16(), 404);

    app.cleanup().await;
}

#[tokio::test]
async fn delete_estimate_removes_it() {
    let app = TestApp::spawn().await;
    let customer_id = app.create_customer("Delete Customer").await;

    let estimate = create_estimate(
        &app,
        customer_id,
        "Doomed",
        json!({ "lineItems": [line_item("labor", "Work", 1.0, 100.0, 100.0)] }),
    )
    .await;
    let estimate_id = estimate["id"].as_i64().unwrap();

    let response = app
        .client
        .delete(format!("{}/estimates/{}", app.address, estimate_id))
        .send()
        .await
        .expect("Failed to delete estimate");
    assert!(response.status().is_success());

    let response = app
        .client
        .get(format!("{}/estimates/{}", app.address, estimate_id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 404);

    app.cleanup().await;
}
