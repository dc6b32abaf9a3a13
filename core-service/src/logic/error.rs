//! Error Taxonomy
//!
//! LoadError / InputError / InferenceError abort the current operation.
//! Alignment and confidence-lookup problems are NOT errors: they are
//! corrected locally and logged (see `features::normalizer` and
//! `model::inference`).

use std::path::PathBuf;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T> = std::result::Result<T, Error>;

// ============================================================================
// LOAD ERRORS (startup, fatal)
// ============================================================================

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid feature schema: {0}")]
    Schema(String),

    #[error("invalid schema rules: {0}")]
    Rules(String),

    #[error("invalid artifact {artifact}: {reason}")]
    Artifact { artifact: &'static str, reason: String },

    #[error("checksum mismatch for {}: expected {expected}, got {actual}", .path.display())]
    Checksum {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("failed to load ONNX model {}: {source}", .path.display())]
    Onnx {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("artifact shape mismatch: {0}")]
    ShapeMismatch(String),
}

// ============================================================================
// INPUT ERRORS (per request, before any model call)
// ============================================================================

#[derive(Debug, Error)]
pub enum InputError {
    #[error("input table has no rows")]
    Empty,

    #[error("input table has no header row")]
    MissingHeader,

    #[error("unreadable CSV input: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row} has {found} fields but the header has {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("table columns do not match the model schema (expected {expected} columns, got {actual})")]
    SchemaMismatch { expected: usize, actual: usize },
}

// ============================================================================
// INFERENCE ERRORS (single taxonomy value, cause attached)
// ============================================================================

/// Pipeline stage that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Scale,
    Reduce,
    Classify,
    Decode,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Scale => "scale",
            Stage::Reduce => "reduce",
            Stage::Classify => "classify",
            Stage::Decode => "decode",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("inference pipeline failure during {stage}: {source}")]
pub struct InferenceError {
    pub stage: Stage,
    #[source]
    pub source: BoxError,
}

impl InferenceError {
    pub fn new(stage: Stage, source: impl Into<BoxError>) -> Self {
        Self {
            stage,
            source: source.into(),
        }
    }
}

// ============================================================================
// EXPORT ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("{records} prediction records for {rows} input rows")]
    RowCountMismatch { rows: usize, records: usize },

    #[error("failed to write predictions: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to write predictions: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// UMBRELLA
// ============================================================================

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inference_error_keeps_cause() {
        let err = InferenceError::new(Stage::Reduce, "width 3 != 4");
        assert_eq!(err.stage, Stage::Reduce);
        assert_eq!(
            err.to_string(),
            "inference pipeline failure during reduce: width 3 != 4"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_umbrella_is_transparent() {
        let err: Error = InputError::Empty.into();
        assert_eq!(err.to_string(), "input table has no rows");
    }
}
