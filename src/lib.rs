// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod version;
pub mod vision;

// Re-export main types
pub use api::{
    create_app, start_server, ApiError, AppState, DetectRequest, DetectResponse, ErrorResponse,
    HealthResponse, StatusResponse,
};
pub use vision::{
    decode_base64_image, normalize_detections, DetectionOutcome, FireDetector, ImageError,
    RawDetection, YoloFireModel, FIRE_CLASS_NAMES, FIRE_CONFIDENCE_THRESHOLD,
};
