//! Engine Configuration
//!
//! Where the bundle lives and which column rules apply. Resolved once at
//! startup; there are no runtime toggles here (the diagnostic override is
//! a per-call option, see `model::PredictOptions`).

use std::path::PathBuf;

use crate::constants;
use crate::logic::error::LoadError;
use crate::logic::features::SchemaRules;
use crate::logic::model::BundlePaths;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Model bundle directory
    pub model_dir: PathBuf,

    /// Optional JSON override of the built-in schema rules
    pub rules_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from(constants::DEFAULT_MODEL_DIR),
            rules_path: None,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            model_dir: PathBuf::from(constants::get_model_dir()),
            rules_path: constants::get_schema_rules_path().map(PathBuf::from),
        }
    }

    pub fn bundle_paths(&self) -> Result<BundlePaths, LoadError> {
        BundlePaths::in_dir(&self.model_dir)
    }

    pub fn load_rules(&self) -> Result<SchemaRules, LoadError> {
        match &self.rules_path {
            Some(path) => SchemaRules::from_json_file(path),
            None => Ok(SchemaRules::default()),
        }
    }
}
