// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP server wiring: application state, router, startup

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::detect::detect_base64_handler;
use crate::api::handlers::{HealthResponse, StatusResponse};
use crate::vision::detector::FireDetector;

/// Service name reported by the root status endpoint
pub const SERVICE_NAME: &str = "R.E.S.Q. Fire Detection API";

/// Shared state for request handlers
///
/// The detector capability is either present or absent; handlers check
/// presence before dispatch instead of consulting a global flag. The
/// model path is kept only for health reporting.
#[derive(Clone)]
pub struct AppState {
    detector: Arc<RwLock<Option<Arc<dyn FireDetector>>>>,
    model_path: Arc<str>,
}

impl AppState {
    pub fn new(model_path: impl Into<String>) -> Self {
        let model_path: String = model_path.into();
        Self {
            detector: Arc::new(RwLock::new(None)),
            model_path: model_path.into(),
        }
    }

    pub fn new_for_test() -> Self {
        Self::new("./models/best.onnx")
    }

    /// Install the detector capability once it is loaded
    pub async fn set_detector(&self, detector: Arc<dyn FireDetector>) {
        *self.detector.write().await = Some(detector);
    }

    /// Current detector, if one is loaded
    pub async fn detector(&self) -> Option<Arc<dyn FireDetector>> {
        self.detector.read().await.clone()
    }

    pub async fn model_loaded(&self) -> bool {
        self.detector.read().await.is_some()
    }

    pub fn model_path(&self) -> &str {
        &self.model_path
    }

    pub fn model_exists(&self) -> bool {
        Path::new(self.model_path()).exists()
    }
}

/// Build the application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        // Detection endpoint
        .route("/detect/base64", post(detect_base64_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until the process exits
pub async fn start_server(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("API server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn root_handler(State(state): State<AppState>) -> impl IntoResponse {
    axum::response::Json(StatusResponse {
        status: "online".to_string(),
        service: SERVICE_NAME.to_string(),
        model_loaded: state.model_loaded().await,
        timestamp: Utc::now().to_rfc3339(),
    })
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let model_loaded = state.model_loaded().await;

    axum::response::Json(HealthResponse {
        status: if model_loaded { "healthy" } else { "degraded" }.to_string(),
        model_loaded,
        model_path: state.model_path().to_string(),
        model_exists: state.model_exists(),
    })
}
