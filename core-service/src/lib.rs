//! FlowGuard Core
//!
//! Network flow classification: CSV flow table -> schema alignment ->
//! scaler -> PCA -> classifier -> label decode + confidence.

pub mod constants;
pub mod logic;

pub use logic::config::EngineConfig;
pub use logic::error::{Error, ExportError, InferenceError, InputError, LoadError, Result, Stage};
pub use logic::features::{normalize, AlignedTable, AlignmentReport, FeatureSchema, RawTable, SchemaRules};
pub use logic::model::{classify, predict, ModelArtifactBundle, PredictOptions, PredictionRecord};
pub use logic::report::{write_predictions_csv, PredictionSummary};
