//! FlowGuard API Server
//!
//! Upload a CSV of network flows, get back per-flow attack predictions.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     FLOWGUARD API                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐    ┌──────────────────────────────────────┐ │
//! │  │  Axum     │───▶│  spawn_blocking                      │ │
//! │  │  /predict │    │  RawTable -> normalize -> predict    │ │
//! │  └───────────┘    └──────────────────┬───────────────────┘ │
//! │                                      ▼                     │
//! │                        ┌──────────────────────────┐        │
//! │                        │ ModelArtifactBundle (Arc)│        │
//! │                        └──────────────────────────┘        │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod handlers;
mod error;

#[cfg(test)]
mod tests;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use flowguard_core::{ModelArtifactBundle, SchemaRules};

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();

    // Initialize logging (log records from flowguard_core are captured too)
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "flowguard_api=debug,flowguard_core=info,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::Config::from_env();

    tracing::info!("FlowGuard API starting...");
    tracing::info!("Model bundle: {}", config.model_dir.display());
    if config.allow_diagnostic_override {
        tracing::warn!("Diagnostic override is ENABLED; predictions may bypass the model on request");
    }

    // Load the bundle once; a server without a model has nothing to offer
    let engine = config.engine();
    let bundle = ModelArtifactBundle::load(&engine.bundle_paths()?)
        .with_context(|| format!("Failed to load model bundle from {}", config.model_dir.display()))?;
    let rules = engine.load_rules().context("Failed to load schema rules")?;

    // Build application state
    let state = AppState {
        bundle: Arc::new(bundle),
        rules: Arc::new(rules),
        config: config.clone(),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub bundle: Arc<ModelArtifactBundle>,
    pub rules: Arc<SchemaRules>,
    pub config: config::Config,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes();

    Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::check))
        .route("/predict", post(handlers::predict::predict))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
