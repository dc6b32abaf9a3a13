//! Report Module - Aggregation & Export
//!
//! Turns a batch of prediction records into the summary payload the
//! dashboard consumes, and writes predictions back next to the input rows.

pub mod summary;
pub mod export;

pub use summary::{ConfidenceStats, PredictionSummary};
pub use export::write_predictions_csv;
