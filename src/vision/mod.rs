// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision pipeline for fire detection
//!
//! This module provides:
//! - Request image decoding (base64 / data URL -> pixel grid)
//! - The detector capability boundary and its ONNX Runtime implementation
//! - Normalization of raw detections into the API result shape

pub mod detector;
pub mod image_utils;
pub mod normalizer;
pub mod yolo;

pub use detector::{FireDetector, RawDetection};
pub use image_utils::{decode_base64_image, detect_format, ImageError, ImageInfo};
pub use normalizer::{
    is_fire_class, normalize_detections, DetectionOutcome, NormalizedDetection, PixelBox,
    FIRE_CLASS_NAMES, FIRE_CONFIDENCE_THRESHOLD,
};
pub use yolo::{YoloFireModel, DEFAULT_INPUT_SIZE};
