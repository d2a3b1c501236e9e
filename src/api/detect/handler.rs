// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Fire detection endpoint handler

use axum::{extract::State, Json};
use tracing::{debug, info, warn};

use super::request::DetectRequest;
use super::response::DetectResponse;
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::vision::image_utils::decode_base64_image;
use crate::vision::normalizer::normalize_detections;

/// POST /detect/base64 - Detect fire in a base64-encoded image
///
/// # Request
/// - `image`: Base64-encoded image data, optionally wrapped in a data URL
///
/// # Response
/// - `fire_detected`: whether a fire-relevant detection reached the threshold
/// - `highest_confidence`: best fire-relevant confidence seen (0.0 when none)
/// - `detections`: every detection with class, confidence and pixel bbox
/// - `threshold`, `image_size`, `timestamp`: response context
///
/// # Errors
/// - 503 Service Unavailable: detector capability not loaded (checked
///   before the payload is touched)
/// - 400 Bad Request: missing image field or undecodable image data
/// - 500 Internal Server Error: inference failed
pub async fn detect_base64_handler(
    State(state): State<AppState>,
    Json(request): Json<DetectRequest>,
) -> Result<Json<DetectResponse>, ApiError> {
    // 1. The detector capability must be present before anything else
    let detector = state.detector().await.ok_or_else(|| {
        warn!("Detection requested while no model is loaded");
        ApiError::ServiceUnavailable("Model not loaded. Please check server logs.".to_string())
    })?;

    // 2. Validate request
    if let Err(e) = request.validate() {
        warn!("Detect validation failed: {}", e);
        return Err(e);
    }

    // 3. Decode the base64 image
    let image_data = request.image.as_deref().ok_or_else(|| ApiError::ValidationError {
        field: "image".to_string(),
        message: "image is required".to_string(),
    })?;

    let (image, image_info) = decode_base64_image(image_data).map_err(|e| {
        warn!("Failed to decode request image: {}", e);
        ApiError::InvalidRequest("Invalid image format".to_string())
    })?;

    debug!(
        "Decoded image: {}x{}, {} bytes",
        image_info.width, image_info.height, image_info.size_bytes
    );

    // 4. Run inference
    let raw_detections = detector.infer(&image).map_err(|e| {
        warn!("Detection inference failed: {}", e);
        ApiError::InternalError(format!("Detection error: {}", e))
    })?;

    // 5. Normalize into the response contract
    let outcome = normalize_detections(&raw_detections, |id| detector.class_name(id));

    info!(
        "Detection complete: {} detections, fire={}, highest confidence {:.2} (model: {})",
        outcome.detections.len(),
        outcome.fire_detected,
        outcome.highest_confidence,
        detector.model_name()
    );

    Ok(Json(DetectResponse::new(
        outcome,
        image_info.width,
        image_info.height,
    )))
}
