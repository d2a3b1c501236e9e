// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection response types
//!
//! Field names here are the wire contract consumed by the monitoring
//! frontend; they stay snake_case and must not be reshuffled.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::vision::normalizer::{DetectionOutcome, FIRE_CONFIDENCE_THRESHOLD};

/// Integer pixel bounding box for one detection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BoundingBox {
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
    pub width: i64,
    pub height: i64,
}

/// One detection on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionRecord {
    /// Resolved class name
    #[serde(rename = "class")]
    pub class_name: String,
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
    /// Bounding box in source-image pixels
    pub bbox: BoundingBox,
}

/// Dimensions of the decoded request image
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

/// Response from POST /detect/base64
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectResponse {
    pub success: bool,
    /// True when a fire-relevant detection reached the threshold
    pub fire_detected: bool,
    /// Highest confidence among fire-relevant detections (0.0 when none)
    pub highest_confidence: f32,
    pub detection_count: usize,
    /// Detections in detector output order
    pub detections: Vec<DetectionRecord>,
    /// Fixed confidence threshold the decision is gated at
    pub threshold: f32,
    pub image_size: ImageSize,
    /// Response construction time, RFC 3339 / ISO-8601 (UTC)
    pub timestamp: String,
}

impl DetectResponse {
    /// Build the wire response from a normalized outcome
    pub fn new(outcome: DetectionOutcome, width: u32, height: u32) -> Self {
        let detections: Vec<DetectionRecord> = outcome
            .detections
            .into_iter()
            .map(|d| DetectionRecord {
                class_name: d.class_name,
                confidence: d.confidence,
                bbox: BoundingBox {
                    x1: d.bbox.x1,
                    y1: d.bbox.y1,
                    x2: d.bbox.x2,
                    y2: d.bbox.y2,
                    width: d.bbox.width,
                    height: d.bbox.height,
                },
            })
            .collect();

        Self {
            success: true,
            fire_detected: outcome.fire_detected,
            highest_confidence: outcome.highest_confidence,
            detection_count: detections.len(),
            detections,
            threshold: FIRE_CONFIDENCE_THRESHOLD,
            image_size: ImageSize { width, height },
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}
