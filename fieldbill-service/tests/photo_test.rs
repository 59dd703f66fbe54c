//! Photo upload, listing, and deletion integration tests.

mod common;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use common::{line_item, TestApp};
use serde_json::{json, Value};

const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 0, 0, 0];

async fn upload_photo(app: &TestApp, parent: Value) -> reqwest::Response {
    let mut payload = json!({
        "filename": "site.png",
        "mimeType": "image/png",
        "data": BASE64.encode(PNG_BYTES),
        "caption": "Before shot"
    });
    payload
        .as_object_mut()
        .unwrap()
        .extend(parent.as_object().unwrap().clone());

    app.client
        .post(format!("{}/photos/upload", app.address))
        .json(&payload)
        .send()
        .await
        .expect("Failed to upload photo")
}

#[tokio::test]
async fn upload_requires_a_parent() {
    let app = TestApp::spawn().await;

    let response = upload_photo(&app, json!({})).await;
    assert_eq!(response.status().as_u16(), 400);

    app.cleanup().await;
}

#[tokio::test]
async fn upload_rejects_unsupported_mime_type() {
    let app = TestApp::spawn().await;
    let customer_id = app.create_customer("Gif Customer").await;

    let response = app
        .client
        .post(format!("{}/photos/upload", app.address))
        .json(&json!({
            "filename": "anim.gif",
            "mimeType": "image/gif",
            "data": BASE64.encode(PNG_BYTES),
            "customerId": customer_id
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status().as_u16(), 400);

    app.cleanup().await;
}

#[tokio::test]
async fn upload_rejects_invalid_base64() {
    let app = TestApp::spawn().await;
    let customer_id = app.create_customer("Garbled Customer").await;

    let response = app
        .client
        .post(format!("{}/photos/upload", app.address))
        .json(&json!({
            "filename": "broken.png",
            "mimeType": "image/png",
            "data": "!!! definitely not base64 !!!",
            "customerId": customer_id
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status().as_u16(), 400);

    app.cleanup().await;
}

#[tokio::test]
async fn upload_rejects_files_over_ten_megabytes() {
    let app = TestApp::spawn().await;
    let customer_id = app.create_customer("Oversize Customer").await;

    let oversized = vec![0u8; 10 * 1024 * 1024 + 1];
    let response = app
        .client
        .post(format!("{}/photos/upload", app.address))
        .json(&json!({
            "filename": "huge.png",
            "mimeType": "image/png",
            "data": BASE64.encode(&oversized),
            "customerId": customer_id
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status().as_u16(), 400);

    app.cleanup().await;
}

#[tokio::test]
async fn upload_stores_blob_and_row() {
    let app = TestApp::spawn().await;
    let customer_id = app.create_customer("Photo Customer").await;

    let response = upload_photo(&app, json!({ "customerId": customer_id })).await;
    assert_eq!(response.status().as_u16(), 201);

    let body: Value = response.json().await.expect("Invalid photo body");
    let storage_key = body["storageKey"].as_str().unwrap();
    assert!(storage_key.ends_with(".png"));
    assert_eq!(
        body["url"],
        format!("http://localhost/test-photos/{}", storage_key)
    );
    assert_eq!(body["fileSize"].as_i64().unwrap(), PNG_BYTES.len() as i64);
    assert_eq!(body["mimeType"], "image/png");
    assert_eq!(body["caption"], "Before shot");
    assert_eq!(body["customerId"].as_i64().unwrap(), customer_id);
    assert!(body["estimateId"].is_null());

    // The blob landed in the storage directory.
    let blob_path = format!("{}/{}", app.storage_path, storage_key);
    let metadata = tokio::fs::metadata(&blob_path)
        .await
        .expect("Blob not found in storage");
    assert_eq!(metadata.len(), PNG_BYTES.len() as u64);

    app.cleanup().await;
}

#[tokio::test]
async fn list_photos_filters_by_parent() {
    let app = TestApp::spawn().await;
    let customer_id = app.create_customer("Album Customer").await;

    let response = app
        .client
        .post(format!("{}/estimates", app.address))
        .json(&json!({
            "customerId": customer_id,
            "title": "Photographed job",
            "lineItems": [line_item("labor", "Work", 1.0, 100.0, 100.0)]
        }))
        .send()
        .await
        .expect("Failed to create estimate");
    let estimate: Value = response.json().await.expect("Invalid body");
    let estimate_id = estimate["id"].as_i64().unwrap();

    upload_photo(&app, json!({ "customerId": customer_id })).await;
    upload_photo(&app, json!({ "customerId": customer_id })).await;
    upload_photo(&app, json!({ "estimateId": estimate_id })).await;

    let response = app
        .client
        .get(format!("{}/photos?customerId={}", app.address, customer_id))
        .send()
        .await
        .expect("Failed to list photos");
    let body: Value = response.json().await.expect("Invalid body");
    assert_eq!(body["photos"].as_array().unwrap().len(), 2);

    let response = app
        .client
        .get(format!("{}/photos?estimateId={}", app.address, estimate_id))
        .send()
        .await
        .expect("Failed to list photos");
    let body: Value = response.json().await.expect("Invalid body");
    assert_eq!(body["photos"].as_array().unwrap().len(), 1);

    app.cleanup().await;
}

#[tokio::test]
async fn delete_photo_removes_blob_then_row() {
    let app = TestApp::spawn().await;
    let customer_id = app.create_customer("Cleanup Customer").await;

    let response = upload_photo(&app, json!({ "customerId": customer_id })).await;
    let body: Value = response.json().await.expect("Invalid photo body");
    let photo_id = body["id"].as_i64().unwrap();
    let storage_key = body["storageKey"].as_str().unwrap().to_string();

    let response = app
        .client
        .delete(format!("{}/photos/{}", app.address, photo_id))
        .send()
        .await
        .expect("Failed to delete photo");
    assert!(response.status().is_success());

    // Blob is gone.
    let blob_path = format!("{}/{}", app.storage_path, storage_key);
    assert!(tokio::fs::metadata(&blob_path).await.is_err());

    // Row is gone.
    let response = app
        .client
        .get(format!("{}/photos?customerId={}", app.address, customer_id))
        .send()
        .await
        .expect("Failed to list photos");
    let body: Value = response.json().await.expect("Invalid body");
    assert!(body["photos"].as_array().unwrap().is_empty());

    let response = app
        .client
        .delete(format!("{}/photos/{}", app.address, photo_id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 404);

    app.cleanup().await;
}

#[tokio::test]
async fn delete_missing_photo_returns_404() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .delete(format!("{}/photos/9999", app.address))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status().as_u16(), 404);

    app.cleanup().await;
}
