// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection request types and validation

use serde::{Deserialize, Serialize};

use crate::api::errors::ApiError;

/// Request for fire detection on a base64-encoded image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectRequest {
    /// Base64-encoded image data, optionally a full data URL
    #[serde(default)]
    pub image: Option<String>,
}

impl DetectRequest {
    /// Validate the detection request
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.image.as_ref().map(|s| s.is_empty()).unwrap_or(true) {
            return Err(ApiError::ValidationError {
                field: "image".to_string(),
                message: "image is required".to_string(),
            });
        }

        Ok(())
    }
}
