//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! To change the default model location, only edit this file.

/// Default model bundle directory
///
/// This is the fallback when no environment variable is set.
pub const DEFAULT_MODEL_DIR: &str = "models";

// ============================================
// Bundle file names
// ============================================

pub const SCALER_FILE: &str = "scaler.json";
pub const REDUCER_FILE: &str = "reducer.json";
pub const CLASSIFIER_ONNX_FILE: &str = "classifier.onnx";
pub const CLASSIFIER_JSON_FILE: &str = "classifier.json";
pub const LABEL_ENCODER_FILE: &str = "label_encoder.json";
pub const FEATURE_COLUMNS_FILE: &str = "feature_columns.txt";
pub const MANIFEST_FILE: &str = "manifest.json";

// ============================================
// Prediction explanations
// ============================================

pub const EXPLANATION_MODEL: &str = "Predicted using trained model";
pub const EXPLANATION_OVERRIDE: &str = "Overridden using dominant label from uploaded file";

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "FlowGuard";

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Get model directory from environment or use default
pub fn get_model_dir() -> String {
    std::env::var("FLOWGUARD_MODEL_DIR")
        .unwrap_or_else(|_| DEFAULT_MODEL_DIR.to_string())
}

/// Get schema rules override file, if configured
pub fn get_schema_rules_path() -> Option<String> {
    std::env::var("FLOWGUARD_SCHEMA_RULES")
        .ok()
        .filter(|s| !s.trim().is_empty())
}
