//! Model Module - AI/ML Inference Engine
//!
//! Tách logic inference khỏi data alignment.
//! Dễ dàng swap classifier backend (ONNX, linear, test doubles).

pub mod artifacts;
pub mod classifier;
pub mod bundle;
pub mod inference;

#[cfg(test)]
mod tests;

// Re-export common types
pub use artifacts::{LabelEncoder, PcaReducer, StandardScaler};
pub use classifier::{Classifier, ClassifierOutput, LinearClassifier, OnnxClassifier, RawLabels};
pub use bundle::{BundleMetadata, BundlePaths, ModelArtifactBundle};
pub use inference::{classify, predict, Classification, PredictOptions, PredictionRecord};
