//! Configuration module

use std::env;
use std::path::PathBuf;

use flowguard_core::constants::DEFAULT_MODEL_DIR;
use flowguard_core::EngineConfig;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Model bundle directory
    pub model_dir: PathBuf,

    /// Optional JSON override of the column rules
    pub schema_rules: Option<PathBuf>,

    /// Upload size limit in megabytes
    pub max_upload_mb: usize,

    /// Honor `?diagnostic_override=true` on /predict
    pub allow_diagnostic_override: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8000,
            model_dir: PathBuf::from(DEFAULT_MODEL_DIR),
            schema_rules: None,
            max_upload_mb: 50,
            allow_diagnostic_override: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),

            model_dir: env::var("MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_dir),

            schema_rules: env::var("SCHEMA_RULES")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),

            max_upload_mb: env::var("MAX_UPLOAD_MB")
                .ok()
                .and_then(|m| m.parse().ok())
                .unwrap_or(defaults.max_upload_mb),

            allow_diagnostic_override: env::var("ALLOW_DIAGNOSTIC_OVERRIDE")
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }

    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            model_dir: self.model_dir.clone(),
            rules_path: self.schema_rules.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.max_upload_bytes(), 50 * 1024 * 1024);
        assert!(!config.allow_diagnostic_override);
        assert_eq!(config.engine().model_dir, PathBuf::from(DEFAULT_MODEL_DIR));
        assert!(config.engine().rules_path.is_none());
    }
}
