//! Logic Module - Business Logic & Engines
//!
//! ## Architecture
//! - `features/` - Column normalization (schema, aliases, coercion)
//! - `model/` - Artifact bundle + inference pipeline
//! - `report/` - Aggregation and CSV export of predictions

pub mod config;
pub mod error;

pub mod features;
pub mod model;
pub mod report;
