//! Health check handlers

use axum::{extract::State, Json};
use serde::Serialize;

use flowguard_core::logic::model::BundleMetadata;

use crate::AppState;

#[derive(Serialize)]
pub struct RootResponse {
    message: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: i64,
    model: BundleMetadata,
}

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Backend is running!".to_string(),
    })
}

pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().timestamp(),
        model: state.bundle.metadata().clone(),
    })
}
