// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use resq_fire_node::{
    api::http_server::{start_server, AppState, SERVICE_NAME},
    vision::{yolo::DEFAULT_INPUT_SIZE, YoloFireModel},
};
use std::{env, net::SocketAddr, sync::Arc};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    println!("🚀 Starting {}...\n", SERVICE_NAME);
    println!("📦 BUILD VERSION: {}", resq_fire_node::version::VERSION);
    println!("📅 Build Date: {}", resq_fire_node::version::BUILD_DATE);
    println!();

    // Parse environment variables for configuration
    let api_port = env::var("API_PORT").unwrap_or_else(|_| "8000".to_string());
    let model_path = env::var("MODEL_PATH").unwrap_or_else(|_| "./models/best.onnx".to_string());
    let input_size = env::var("DETECTOR_INPUT_SIZE")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(DEFAULT_INPUT_SIZE);

    let state = AppState::new(&model_path);

    // Load the detection model; a failed load leaves the capability
    // absent and /detect/base64 answers 503 until a restart
    println!("🧠 Loading fire detection model from {}...", model_path);
    match YoloFireModel::with_input_size(&model_path, input_size).await {
        Ok(model) => {
            println!("✅ Model loaded successfully from {}", model_path);
            if !model.class_names().is_empty() {
                println!("📋 Model classes: {:?}", model.class_names());
            }
            state.set_detector(Arc::new(model)).await;
        }
        Err(e) => {
            println!("❌ Error loading model: {}", e);
            println!("⚠️  Serving without a detector; /detect/base64 will return 503");
        }
    }

    let addr: SocketAddr = format!("0.0.0.0:{}", api_port).parse()?;
    println!("🌐 API listening on {}\n", addr);

    start_server(state, addr).await
}
