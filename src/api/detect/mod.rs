// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Fire detection endpoint (POST /detect/base64)

pub mod handler;
pub mod request;
pub mod response;

pub use handler::detect_base64_handler;
pub use request::DetectRequest;
pub use response::{BoundingBox, DetectResponse, DetectionRecord, ImageSize};
