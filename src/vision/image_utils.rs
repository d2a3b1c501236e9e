// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image decoding for detection requests
//!
//! Turns the request-supplied base64 payload (optionally a full data URL)
//! into a decoded pixel grid the detector can consume. Every failure here
//! is client input, surfaced as a 400 by the detect handler.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageFormat};
use thiserror::Error;

/// Maximum accepted image payload after base64 decoding (10MB)
const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

/// Custom error types for request image decoding
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Image data is empty")]
    EmptyData,

    #[error("Invalid base64 encoding: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("Image data is too large: {0} bytes (max: {1} bytes)")]
    TooLarge(usize, usize),

    #[error("Unrecognized image container")]
    UnsupportedFormat,

    #[error("Failed to decode image: {0}")]
    DecodeFailed(String),
}

/// Dimensions and container details captured during decoding
#[derive(Debug, Clone)]
pub struct ImageInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Detected container format
    pub format: ImageFormat,
    /// Decoded payload size in bytes
    pub size_bytes: usize,
}

/// Decode a base64-encoded request image.
///
/// A data-URL wrapper ("data:image/png;base64,....") is tolerated: only the
/// text after the first `,` separator is treated as payload; without a
/// separator the whole string is payload. The decoded bytes must be a
/// recognizable compressed image container (PNG, JPEG, WebP, GIF, BMP or
/// TIFF).
///
/// # Returns
/// * `Ok((DynamicImage, ImageInfo))` - The decoded image and metadata
/// * `Err(ImageError)` - If decoding fails at any stage
///
/// Deterministic: identical payload bytes always produce the same grid.
pub fn decode_base64_image(payload: &str) -> Result<(DynamicImage, ImageInfo), ImageError> {
    // Data-URL convention: payload starts after the first separator
    let encoded = match payload.split_once(',') {
        Some((_prefix, rest)) => rest,
        None => payload,
    };

    if encoded.is_empty() {
        return Err(ImageError::EmptyData);
    }

    let bytes = STANDARD.decode(encoded)?;

    if bytes.is_empty() {
        return Err(ImageError::EmptyData);
    }
    if bytes.len() > MAX_IMAGE_SIZE {
        return Err(ImageError::TooLarge(bytes.len(), MAX_IMAGE_SIZE));
    }

    // Sniff the container from magic bytes, then decode
    let format = detect_format(&bytes)?;

    let img = image::load_from_memory_with_format(&bytes, format)
        .map_err(|e| ImageError::DecodeFailed(e.to_string()))?;

    let info = ImageInfo {
        width: img.width(),
        height: img.height(),
        format,
        size_bytes: bytes.len(),
    };

    Ok((img, info))
}

/// Detect the image container format from magic bytes.
pub fn detect_format(bytes: &[u8]) -> Result<ImageFormat, ImageError> {
    if bytes.len() < 4 {
        return Err(ImageError::UnsupportedFormat);
    }

    match bytes {
        // PNG: 89 50 4E 47 (0x89 P N G)
        [0x89, 0x50, 0x4E, 0x47, ..] => Ok(ImageFormat::Png),

        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Ok(ImageFormat::Jpeg),

        // WebP: RIFF .... WEBP
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Ok(ImageFormat::WebP),

        // GIF: GIF87a or GIF89a
        [0x47, 0x49, 0x46, 0x38, x, ..] if *x == 0x37 || *x == 0x39 => Ok(ImageFormat::Gif),

        // BMP: BM
        [0x42, 0x4D, ..] => Ok(ImageFormat::Bmp),

        // TIFF: II (little-endian) or MM (big-endian)
        [0x49, 0x49, 0x2A, 0x00, ..] | [0x4D, 0x4D, 0x00, 0x2A, ..] => Ok(ImageFormat::Tiff),

        _ => Err(ImageError::UnsupportedFormat),
    }
}
