// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Shared API response types for the status and health endpoints

use serde::{Deserialize, Serialize};

/// Response from GET / (root status)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub service: String,
    pub model_loaded: bool,
    pub timestamp: String,
}

/// Response from GET /health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "healthy" when the detector is loaded, "degraded" otherwise
    pub status: String,
    pub model_loaded: bool,
    pub model_path: String,
    pub model_exists: bool,
}
