// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Endpoint tests for POST /detect/base64
//!
//! These tests drive the full router with stub detectors so every
//! response-contract and error path is exercised without a model file:
//! - 503 when the detector capability is absent, whatever the payload
//! - 400 for undecodable image data
//! - 500 when inference fails
//! - full response body for the happy paths

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use image::DynamicImage;
use resq_fire_node::{
    api::http_server::{create_app, AppState},
    vision::{FireDetector, RawDetection},
};
use std::collections::HashMap;
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot`

// 1x1 red PNG image (base64)
const TINY_PNG_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8DwHwAFBQIAX8jx0gAAAABJRU5ErkJggg==";

/// Canned detector that returns a fixed set of raw detections
struct StubDetector {
    detections: Vec<RawDetection>,
    names: HashMap<usize, String>,
}

impl StubDetector {
    fn new(detections: Vec<RawDetection>) -> Self {
        let names = [(0, "fire"), (1, "smoke"), (2, "person")]
            .into_iter()
            .map(|(id, name)| (id, name.to_string()))
            .collect();
        Self { detections, names }
    }
}

impl FireDetector for StubDetector {
    fn infer(&self, _image: &DynamicImage) -> anyhow::Result<Vec<RawDetection>> {
        Ok(self.detections.clone())
    }

    fn class_name(&self, class_id: usize) -> Option<String> {
        self.names.get(&class_id).cloned()
    }

    fn model_name(&self) -> &str {
        "stub"
    }
}

/// Detector whose inference always fails, for the 500 path
struct FailingDetector;

impl FireDetector for FailingDetector {
    fn infer(&self, _image: &DynamicImage) -> anyhow::Result<Vec<RawDetection>> {
        anyhow::bail!("session poisoned")
    }

    fn class_name(&self, _class_id: usize) -> Option<String> {
        None
    }

    fn model_name(&self) -> &str {
        "failing-stub"
    }
}

/// Helper: AppState with a stub detector returning `detections`
async fn setup_state_with_detections(detections: Vec<RawDetection>) -> AppState {
    let state = AppState::new_for_test();
    state
        .set_detector(Arc::new(StubDetector::new(detections)))
        .await;
    state
}

/// Helper: build a POST /detect/base64 request with the given JSON body
fn detect_request(body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/detect/base64")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Helper: read a response body as JSON
async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn approx(value: &serde_json::Value, expected: f64) -> bool {
    value.as_f64().map(|v| (v - expected).abs() < 1e-6).unwrap_or(false)
}

#[tokio::test]
async fn test_uninitialized_detector_returns_503() {
    let app = create_app(AppState::new_for_test());

    let body = format!(r#"{{"image": "{}"}}"#, TINY_PNG_BASE64);
    let response = app.oneshot(detect_request(&body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = response_json(response).await;
    assert!(json["message"]
        .as_str()
        .unwrap()
        .contains("Model not loaded"));
}

#[tokio::test]
async fn test_uninitialized_detector_ignores_payload_content() {
    // 503 wins even when the payload itself is garbage
    let app = create_app(AppState::new_for_test());

    let response = app
        .oneshot(detect_request(r#"{"image": "not-base64!!"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_invalid_base64_returns_400() {
    let state = setup_state_with_detections(vec![]).await;
    let app = create_app(state);

    let response = app
        .oneshot(detect_request(r#"{"image": "not-base64!!"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = response_json(response).await;
    assert_eq!(json["message"], "Invalid image format");
}

#[tokio::test]
async fn test_valid_base64_non_image_returns_400() {
    let state = setup_state_with_detections(vec![]).await;
    let app = create_app(state);

    // "aGVsbG8=" is valid base64 for "hello", not an image container
    let response = app
        .oneshot(detect_request(r#"{"image": "aGVsbG8="}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = response_json(response).await;
    assert_eq!(json["message"], "Invalid image format");
}

#[tokio::test]
async fn test_missing_image_field_returns_400() {
    let state = setup_state_with_detections(vec![]).await;
    let app = create_app(state);

    let response = app.oneshot(detect_request("{}")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = response_json(response).await;
    assert!(json["message"].as_str().unwrap().contains("image"));
}

#[tokio::test]
async fn test_inference_failure_returns_500() {
    let state = AppState::new_for_test();
    state.set_detector(Arc::new(FailingDetector)).await;
    let app = create_app(state);

    let body = format!(r#"{{"image": "{}"}}"#, TINY_PNG_BASE64);
    let response = app.oneshot(detect_request(&body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = response_json(response).await;
    let message = json["message"].as_str().unwrap();
    assert!(message.starts_with("Detection error:"));
    assert!(message.contains("session poisoned"));
}

#[tokio::test]
async fn test_no_detections_is_a_valid_result() {
    let state = setup_state_with_detections(vec![]).await;
    let app = create_app(state);

    let body = format!(r#"{{"image": "{}"}}"#, TINY_PNG_BASE64);
    let response = app.oneshot(detect_request(&body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["fire_detected"], false);
    assert!(approx(&json["highest_confidence"], 0.0));
    assert_eq!(json["detection_count"], 0);
    assert_eq!(json["detections"].as_array().unwrap().len(), 0);
    assert!(approx(&json["threshold"], 0.90));
    assert_eq!(json["image_size"]["width"], 1);
    assert_eq!(json["image_size"]["height"], 1);
    assert!(json["timestamp"].as_str().is_some());
}

#[tokio::test]
async fn test_fire_detection_full_body() {
    let detections = vec![RawDetection::new(0, 0.95, 10.7, 20.2, 50.9, 80.1)];
    let state = setup_state_with_detections(detections).await;
    let app = create_app(state);

    let body = format!(r#"{{"image": "{}"}}"#, TINY_PNG_BASE64);
    let response = app.oneshot(detect_request(&body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["fire_detected"], true);
    assert!(approx(&json["highest_confidence"], 0.95));
    assert_eq!(json["detection_count"], 1);

    let detection = &json["detections"][0];
    assert_eq!(detection["class"], "fire");
    assert!(approx(&detection["confidence"], 0.95));

    // Corners truncate toward zero; width/height come from the integers
    let bbox = &detection["bbox"];
    assert_eq!(bbox["x1"], 10);
    assert_eq!(bbox["y1"], 20);
    assert_eq!(bbox["x2"], 50);
    assert_eq!(bbox["y2"], 80);
    assert_eq!(bbox["width"], 40);
    assert_eq!(bbox["height"], 60);
}

#[tokio::test]
async fn test_fire_below_threshold_tracked_but_not_detected() {
    let detections = vec![RawDetection::new(0, 0.85, 0.0, 0.0, 5.0, 5.0)];
    let state = setup_state_with_detections(detections).await;
    let app = create_app(state);

    let body = format!(r#"{{"image": "{}"}}"#, TINY_PNG_BASE64);
    let response = app.oneshot(detect_request(&body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["fire_detected"], false);
    assert!(approx(&json["highest_confidence"], 0.85));
}

#[tokio::test]
async fn test_mixed_classes_and_output_order() {
    // "person" at 0.99 must not drive the fire decision or confidence
    let detections = vec![
        RawDetection::new(2, 0.99, 0.0, 0.0, 10.0, 10.0),
        RawDetection::new(1, 0.91, 5.0, 5.0, 20.0, 20.0),
    ];
    let state = setup_state_with_detections(detections).await;
    let app = create_app(state);

    let body = format!(r#"{{"image": "{}"}}"#, TINY_PNG_BASE64);
    let response = app.oneshot(detect_request(&body)).await.unwrap();

    let json = response_json(response).await;
    assert_eq!(json["fire_detected"], true);
    assert!(approx(&json["highest_confidence"], 0.91));
    assert_eq!(json["detection_count"], 2);

    // Detector order is preserved on the wire
    let records = json["detections"].as_array().unwrap();
    assert_eq!(records[0]["class"], "person");
    assert_eq!(records[1]["class"], "smoke");
}

#[tokio::test]
async fn test_unknown_class_id_synthesizes_label() {
    let detections = vec![RawDetection::new(7, 0.95, 0.0, 0.0, 5.0, 5.0)];
    let state = setup_state_with_detections(detections).await;
    let app = create_app(state);

    let body = format!(r#"{{"image": "{}"}}"#, TINY_PNG_BASE64);
    let response = app.oneshot(detect_request(&body)).await.unwrap();

    let json = response_json(response).await;
    assert_eq!(json["detections"][0]["class"], "class_7");
    // Synthetic labels never count as fire
    assert_eq!(json["fire_detected"], false);
    assert!(approx(&json["highest_confidence"], 0.0));
}

#[tokio::test]
async fn test_data_url_payload_accepted() {
    let state = setup_state_with_detections(vec![]).await;
    let app = create_app(state);

    let body = format!(
        r#"{{"image": "data:image/png;base64,{}"}}"#,
        TINY_PNG_BASE64
    );
    let response = app.oneshot(detect_request(&body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_detect_route_rejects_get() {
    let state = setup_state_with_detections(vec![]).await;
    let app = create_app(state);

    let request = Request::builder()
        .method(Method::GET)
        .uri("/detect/base64")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
