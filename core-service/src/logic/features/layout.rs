//! Feature Layout - Model Feature Schema
//!
//! **CRITICAL: the schema file controls the model input layout**
//!
//! ## Rules (NEVER break these):
//! 1. One feature name per line, in model order
//! 2. Line order == output column order of the normalizer
//! 3. The schema is fixed for the lifetime of a loaded bundle
//!
//! The schema ships with the model bundle (`feature_columns.txt`) and must
//! come from the same training run as the scaler, reducer and classifier.

use std::collections::HashSet;
use std::path::Path;

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

use crate::logic::error::LoadError;

// ============================================================================
// FEATURE SCHEMA
// ============================================================================

/// Ordered list of feature names the trained model expects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    names: Vec<String>,
    hash: u32,
}

impl FeatureSchema {
    /// Build a schema from names (validated: non-empty, no duplicates)
    pub fn new<I, S>(names: I) -> Result<Self, LoadError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();

        if names.is_empty() {
            return Err(LoadError::Schema("schema lists no features".to_string()));
        }

        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if name.trim().is_empty() {
                return Err(LoadError::Schema("empty feature name".to_string()));
            }
            if !seen.insert(name.as_str()) {
                return Err(LoadError::Schema(format!("duplicate feature name '{}'", name)));
            }
        }

        let hash = compute_layout_hash(&names);
        Ok(Self { names, hash })
    }

    /// Parse the plain-text schema (one name per line, blank lines skipped)
    pub fn parse(content: &str) -> Result<Self, LoadError> {
        Self::new(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty()),
        )
    }

    /// Load `feature_columns.txt`
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let schema = Self::parse(&content)?;
        log::info!(
            "Loaded feature schema from {} ({} features, hash {:08x})",
            path.display(),
            schema.len(),
            schema.layout_hash()
        );
        Ok(schema)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Get feature index by name
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Get feature name by index
    pub fn name_at(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// CRC32 fingerprint of the ordered names
    pub fn layout_hash(&self) -> u32 {
        self.hash
    }

    pub fn info(&self) -> LayoutInfo {
        LayoutInfo {
            feature_count: self.len(),
            layout_hash: self.hash,
            feature_names: self.names.clone(),
        }
    }
}

// ============================================================================
// LAYOUT HASH
// ============================================================================

/// Compute CRC32 hash of an ordered feature list
/// Used to detect layout mismatches in logs / manifests
pub fn compute_layout_hash(names: &[String]) -> u32 {
    let mut hasher = Hasher::new();

    for name in names {
        hasher.update(name.as_bytes());
        hasher.update(&[0]); // Separator
    }

    hasher.finalize()
}

// ============================================================================
// LAYOUT INFO
// ============================================================================

/// Complete layout information for serialization/logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutInfo {
    pub feature_count: usize,
    pub layout_hash: u32,
    pub feature_names: Vec<String>,
}

// ============================================================================
// TESTS
// ============================================================================
