// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection normalization
//!
//! Takes the raw per-box outputs the detector produced for one image and
//! shapes them into the API-facing result: resolved class names, integer
//! pixel boxes, and the fire/no-fire decision. Pure functions of their
//! inputs; nothing here touches the model or the network.

use crate::vision::detector::RawDetection;

/// Confidence cutoff at or above which a fire-relevant detection flips
/// the fire decision.
pub const FIRE_CONFIDENCE_THRESHOLD: f32 = 0.90;

/// Class names that count toward the fire decision, compared lowercased.
///
/// The literal "0" covers models exported with bare numeric labels.
pub const FIRE_CLASS_NAMES: [&str; 4] = ["fire", "flame", "smoke", "0"];

/// Integer pixel box, truncated toward zero from the raw coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBox {
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
    pub width: i64,
    pub height: i64,
}

impl PixelBox {
    /// Truncate raw corner coordinates to integers. Width and height are
    /// computed from the truncated integers, not the float difference.
    pub fn from_corners(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        let (x1, y1, x2, y2) = (x1 as i64, y1 as i64, x2 as i64, y2 as i64);
        Self {
            x1,
            y1,
            x2,
            y2,
            width: x2 - x1,
            height: y2 - y1,
        }
    }
}

/// One detection with its resolved class name and integer box
#[derive(Debug, Clone)]
pub struct NormalizedDetection {
    pub class_name: String,
    pub confidence: f32,
    pub bbox: PixelBox,
}

/// Result of normalizing one image's raw detections
#[derive(Debug, Clone, Default)]
pub struct DetectionOutcome {
    /// Detections in the order the detector produced them
    pub detections: Vec<NormalizedDetection>,
    /// True when a fire-relevant detection reached the threshold
    pub fire_detected: bool,
    /// Highest confidence among fire-relevant detections (0.0 when none)
    pub highest_confidence: f32,
}

/// Whether a class name counts toward the fire decision.
pub fn is_fire_class(class_name: &str) -> bool {
    let lowered = class_name.to_lowercase();
    FIRE_CLASS_NAMES.contains(&lowered.as_str())
}

/// Normalize raw detections for one image.
///
/// Class ids without a lookup entry get the synthetic label `class_<id>`.
/// For fire-relevant detections two updates run independently in a single
/// pass: `highest_confidence` tracks the maximum regardless of the
/// threshold, and `fire_detected` flips when a detection reaches
/// [`FIRE_CONFIDENCE_THRESHOLD`]. Non-fire-relevant detections never
/// influence either, whatever their confidence.
pub fn normalize_detections<F>(raw: &[RawDetection], class_name: F) -> DetectionOutcome
where
    F: Fn(usize) -> Option<String>,
{
    let mut outcome = DetectionOutcome::default();

    for det in raw {
        let name =
            class_name(det.class_id).unwrap_or_else(|| format!("class_{}", det.class_id));

        if is_fire_class(&name) {
            if det.confidence > outcome.highest_confidence {
                outcome.highest_confidence = det.confidence;
            }
            if det.confidence >= FIRE_CONFIDENCE_THRESHOLD {
                outcome.fire_detected = true;
            }
        }

        outcome.detections.push(NormalizedDetection {
            class_name: name,
            confidence: det.confidence,
            bbox: PixelBox::from_corners(det.x1, det.y1, det.x2, det.y2),
        });
    }

    outcome
}
