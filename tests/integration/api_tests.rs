//! API integration tests against a running server
//!
//! Run with: cargo test --test api_tests -- --ignored
//! `FORECAST_TEST_EQUIPMENT` must name an equipment with at least two years of reservations.

use reqwest::Client;
use serde_json::Value;

const BASE_URL: &str = "http://localhost:8080/api";

fn with_key(request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    match std::env::var("FUNCTION_KEY") {
        Ok(key) => request.header("x-functions-key", key),
        Err(_) => request,
    }
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_readiness_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/ready", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
#[ignore]
async fn test_unknown_equipment_is_not_found() {
    let client = Client::new();

    let response = with_key(client.get(format!("{}/http_trigger/no-such-equipment", BASE_URL)))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 404);
    let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/plain"));
}

#[tokio::test]
#[ignore]
async fn test_forecast_for_equipment() {
    let equipment = std::env::var("FORECAST_TEST_EQUIPMENT").expect("FORECAST_TEST_EQUIPMENT not set");
    let client = Client::new();

    let response = with_key(client.get(format!("{}/http_trigger/{}", BASE_URL, equipment)))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.expect("Failed to parse response");
    let points = body.as_array().expect("Forecast is not an array");
    assert_eq!(points.len(), 6);
    for point in points {
        assert!(point["year"].is_i64());
        assert!((1..=12).contains(&point["month"].as_i64().unwrap()));
        assert!(point["count"].is_i64());
    }
}
