// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLOv8 fire detection model (ONNX Runtime)
//!
//! Wraps an exported ultralytics detection model (best.onnx). Loading
//! tries CUDA first and falls back to CPU; class names are recovered from
//! the model's `names` metadata entry when the export carries one.
//!
//! # Thread Safety
//! The session sits behind `Arc<Mutex<_>>`; concurrent requests share the
//! model and serialize only around the actual inference call.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use image::{DynamicImage, GenericImageView};
use ndarray::{s, Array, ArrayViewD, Axis, IxDyn};
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::vision::detector::{FireDetector, RawDetection};

/// Model input edge length (ultralytics default export)
pub const DEFAULT_INPUT_SIZE: u32 = 640;

/// Floor below which anchor candidates are discarded before NMS
const CANDIDATE_CONFIDENCE_FLOOR: f32 = 0.25;

/// IoU above which overlapping candidates are suppressed
const NMS_IOU_THRESHOLD: f32 = 0.45;

/// YOLOv8 detection model backed by ONNX Runtime
#[derive(Clone)]
pub struct YoloFireModel {
    /// ONNX Runtime session (wrapped in Arc<Mutex> for thread-safe shared access)
    session: Arc<Mutex<Session>>,
    /// Model input tensor name
    input_name: String,
    /// Class id -> label, from model metadata (may be empty)
    names: HashMap<usize, String>,
    /// Square input edge length the model expects
    input_size: u32,
    /// Short identifier for logging (model file stem)
    model_name: String,
}

impl std::fmt::Debug for YoloFireModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoloFireModel")
            .field("model_name", &self.model_name)
            .field("input_name", &self.input_name)
            .field("input_size", &self.input_size)
            .field("classes", &self.names.len())
            .finish_non_exhaustive()
    }
}

impl YoloFireModel {
    /// Load a detection model with the default input size.
    pub async fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        Self::with_input_size(model_path, DEFAULT_INPUT_SIZE).await
    }

    /// Load a detection model from an exported ONNX file.
    ///
    /// # Errors
    /// Returns error if:
    /// - Model file not found
    /// - ONNX Runtime initialization fails on both CUDA and CPU
    pub async fn with_input_size<P: AsRef<Path>>(model_path: P, input_size: u32) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("Detection model not found: {}", model_path.display());
        }

        info!(
            "Loading fire detection model from {}",
            model_path.display()
        );

        // Try CUDA first to detect whether a GPU is actually available
        let cuda_result = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CUDAExecutionProvider::default().build()])
            .context("Failed to set CUDA execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(4)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path);

        let session = match cuda_result {
            Ok(s) => {
                info!("✅ CUDA execution provider initialized");
                s
            }
            Err(e) => {
                warn!("⚠️  CUDA execution provider failed: {}", e);
                warn!("   Falling back to CPU execution provider");
                Session::builder()
                    .context("Failed to create session builder")?
                    .with_execution_providers([CPUExecutionProvider::default().build()])
                    .context("Failed to set CPU execution provider")?
                    .with_optimization_level(GraphOptimizationLevel::Level3)
                    .context("Failed to set optimization level")?
                    .with_intra_threads(4)
                    .context("Failed to set intra threads")?
                    .commit_from_file(model_path)
                    .context(format!(
                        "Failed to load detection model from {}",
                        model_path.display()
                    ))?
            }
        };

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());

        debug!("Detection model input: {}", input_name);

        // Ultralytics exports carry the class map as custom metadata
        let names = session
            .metadata()
            .ok()
            .and_then(|meta| meta.custom("names").ok().flatten())
            .map(|raw| parse_class_names(&raw))
            .unwrap_or_default();

        if names.is_empty() {
            warn!("⚠️  Model carries no class name metadata; labels fall back to class_<id>");
        } else {
            info!("📋 Model classes: {:?}", names);
        }

        let model_name = model_path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("yolov8")
            .to_string();

        info!("✅ Fire detection model loaded");

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            names,
            input_size,
            model_name,
        })
    }

    /// Class id -> label map recovered from the model export
    pub fn class_names(&self) -> &HashMap<usize, String> {
        &self.names
    }

    pub fn input_size(&self) -> u32 {
        self.input_size
    }

    /// Run detection on a decoded image.
    ///
    /// # Implementation
    /// 1. Aspect-preserving resize into a square gray canvas, CHW f32
    /// 2. ONNX inference
    /// 3. Per-anchor class argmax with a candidate floor, boxes mapped
    ///    back to source pixels, confidence-ordered NMS
    pub fn detect(&self, image: &DynamicImage) -> Result<Vec<RawDetection>> {
        let (input, ratio) = self.preprocess(image);
        let (width0, height0) = (image.width() as f32, image.height() as f32);

        let mut session = self.session.lock().unwrap();

        let input_value = Value::from_array(input).context("Failed to create input tensor")?;
        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("Detection inference failed")?;

        let preds = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        let detections = self.postprocess(preds.view(), ratio, width0, height0);

        debug!(
            "Model produced {} detections for {}x{} image",
            detections.len(),
            image.width(),
            image.height()
        );

        Ok(detections)
    }

    /// Letterbox the image into the model's square input tensor.
    ///
    /// Returns the CHW input array and the resize ratio needed to map
    /// model-space boxes back to source pixels.
    fn preprocess(&self, image: &DynamicImage) -> (Array<f32, IxDyn>, f32) {
        let size = self.input_size as usize;
        let (w0, h0) = image.dimensions();
        let ratio =
            (self.input_size as f32 / w0 as f32).min(self.input_size as f32 / h0 as f32);
        let w_new = ((w0 as f32 * ratio).round() as u32).max(1);
        let h_new = ((h0 as f32 * ratio).round() as u32).max(1);

        let resized =
            image.resize_exact(w_new, h_new, image::imageops::FilterType::Triangle);

        let mut input = Array::ones((1, 3, size, size)).into_dyn();
        input.fill(144.0 / 255.0);
        for (x, y, rgb) in resized.pixels() {
            let (x, y) = (x as usize, y as usize);
            let [r, g, b, _] = rgb.0;
            input[[0, 0, y, x]] = r as f32 / 255.0;
            input[[0, 1, y, x]] = g as f32 / 255.0;
            input[[0, 2, y, x]] = b as f32 / 255.0;
        }

        (input, ratio)
    }

    /// Decode the raw `[1, 4+nc, anchors]` output into pixel-space boxes.
    fn postprocess(
        &self,
        preds: ArrayViewD<f32>,
        ratio: f32,
        width0: f32,
        height0: f32,
    ) -> Vec<RawDetection> {
        const CXYWH_OFFSET: usize = 4;

        let mut candidates: Vec<RawDetection> = Vec::new();

        let Some(batch) = preds.axis_iter(Axis(0)).next() else {
            return candidates;
        };
        let attrs = batch.shape()[0];
        if attrs <= CXYWH_OFFSET {
            return candidates;
        }
        let nc = attrs - CXYWH_OFFSET;

        for pred in batch.axis_iter(Axis(1)) {
            let bbox = pred.slice(s![0..CXYWH_OFFSET]);
            let classes = pred.slice(s![CXYWH_OFFSET..CXYWH_OFFSET + nc]);

            let (class_id, &confidence) = classes
                .into_iter()
                .enumerate()
                .reduce(|max, x| if x.1 > max.1 { x } else { max })
                .unwrap();

            if confidence < CANDIDATE_CONFIDENCE_FLOOR {
                continue;
            }

            // xywh in model space -> xyxy in source pixels, clamped
            let cx = bbox[0] / ratio;
            let cy = bbox[1] / ratio;
            let w = bbox[2] / ratio;
            let h = bbox[3] / ratio;
            let x1 = (cx - w / 2.0).max(0.0).min(width0);
            let y1 = (cy - h / 2.0).max(0.0).min(height0);
            let x2 = (cx + w / 2.0).max(0.0).min(width0);
            let y2 = (cy + h / 2.0).max(0.0).min(height0);

            candidates.push(RawDetection::new(class_id, confidence, x1, y1, x2, y2));
        }

        non_max_suppression(&mut candidates, NMS_IOU_THRESHOLD);
        candidates
    }
}

impl FireDetector for YoloFireModel {
    fn infer(&self, image: &DynamicImage) -> Result<Vec<RawDetection>> {
        self.detect(image)
    }

    fn class_name(&self, class_id: usize) -> Option<String> {
        self.names.get(&class_id).cloned()
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Parse the ultralytics `names` metadata entry, e.g. `{0: 'fire', 1: 'smoke'}`.
fn parse_class_names(raw: &str) -> HashMap<usize, String> {
    let re = Regex::new(r#"(\d+)\s*:\s*['"]([^'"]*)['"]"#).unwrap();
    let mut names = HashMap::new();
    for cap in re.captures_iter(raw) {
        if let Ok(id) = cap[1].parse::<usize>() {
            names.insert(id, cap[2].to_string());
        }
    }
    names
}

/// Confidence-ordered non-maximum suppression over xyxy boxes.
pub fn non_max_suppression(detections: &mut Vec<RawDetection>, iou_threshold: f32) {
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = 0;
    for index in 0..detections.len() {
        let mut drop = false;
        for prev in 0..keep {
            if iou(&detections[prev], &detections[index]) > iou_threshold {
                drop = true;
                break;
            }
        }
        if !drop {
            detections.swap(keep, index);
            keep += 1;
        }
    }
    detections.truncate(keep);
}

fn iou(a: &RawDetection, b: &RawDetection) -> f32 {
    let ix1 = a.x1.max(b.x1);
    let iy1 = a.y1.max(b.y1);
    let ix2 = a.x2.min(b.x2);
    let iy2 = a.y2.min(b.y2);
    let intersection = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
    let union = a.area() + b.area() - intersection;
    if union <= 0.0 {
        0.0
    } else {
        intersection / union
    }
}
