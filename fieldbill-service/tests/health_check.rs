mod common;

use common::TestApp;

#[tokio::test]
async fn health_check_reports_ok() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("Failed to call health endpoint");

    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await.expect("Invalid health body");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "fieldbill-service");

    app.cleanup().await;
}

#[tokio::test]
async fn metrics_endpoint_exposes_prometheus_text() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(format!("{}/metrics", app.address))
        .send()
        .await
        .expect("Failed to call metrics endpoint");

    assert!(response.status().is_success());
    // The readiness polling in spawn() already went through the metrics
    // middleware, so the request counter has samples.
    let body = response.text().await.expect("Invalid metrics body");
    assert!(body.contains("fieldbill_http_requests_total"));

    app.cleanup().await;
}
