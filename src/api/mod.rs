// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod detect;
pub mod errors;
pub mod handlers;
pub mod http_server;

pub use detect::{
    detect_base64_handler, BoundingBox, DetectRequest, DetectResponse, DetectionRecord,
    ImageSize,
};
pub use errors::{ApiError, ErrorResponse};
pub use handlers::{HealthResponse, StatusResponse};
pub use http_server::{create_app, start_server, AppState, SERVICE_NAME};
