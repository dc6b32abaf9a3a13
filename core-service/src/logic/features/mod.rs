//! Features Module - Schema Alignment
//!
//! Tách logic căn chỉnh cột khỏi inference.
//! Uploaded flow tables are reshaped here into the exact layout the model
//! was trained on, before any model call.

pub mod layout;
pub mod rules;
pub mod table;
pub mod normalizer;


// Re-export common types
pub use layout::{FeatureSchema, LayoutInfo};
pub use rules::SchemaRules;
pub use table::{AlignedTable, LabelColumn, RawTable};
pub use normalizer::{normalize, AlignmentReport, Normalized};
