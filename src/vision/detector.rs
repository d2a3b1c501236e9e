// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detector capability boundary
//!
//! The request pipeline consumes object detection through the
//! [`FireDetector`] trait. Whether an implementation is present in the
//! application state is the "model loaded" condition the API reports;
//! handlers check presence before dispatch.

use image::DynamicImage;

/// One candidate object found by the detector for one image.
///
/// Box corners are in source-image pixel coordinates and may be
/// fractional; `x1 <= x2` and `y1 <= y2`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
    /// Model class index
    pub class_id: usize,
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl RawDetection {
    pub fn new(class_id: usize, confidence: f32, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            class_id,
            confidence,
            x1,
            y1,
            x2,
            y2,
        }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }
}

/// Object-detection capability the request pipeline depends on.
///
/// Implementations are shared read-only across concurrent requests; any
/// serialization the underlying inference engine needs for its hardware
/// is the implementation's concern, not the caller's.
pub trait FireDetector: Send + Sync {
    /// Run inference on a decoded image and return candidate detections
    /// in model output order.
    fn infer(&self, image: &DynamicImage) -> anyhow::Result<Vec<RawDetection>>;

    /// Resolve a class id to its label, if the model carries one.
    fn class_name(&self, class_id: usize) -> Option<String>;

    /// Short model identifier for logging and status reporting.
    fn model_name(&self) -> &str;
}
