//! Schema Rules - Static Column Configuration
//!
//! Alias table, identifier drop-list and ground-truth label columns.
//! Kept as data (not inline conditionals) so exports with renamed columns
//! can be supported by editing a JSON file instead of pipeline code.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::logic::error::LoadError;

// ============================================================================
// BUILT-IN TABLES
// ============================================================================

/// Alternate / legacy column name -> canonical model feature name
pub const DEFAULT_ALIASES: &[(&str, &str)] = &[
    ("Dst Port", "Destination Port"),
    ("Total Fwd Packet", "Total Fwd Packets"),
    ("Total Bwd packets", "Total Backward Packets"),
    ("Fwd Segment Size Avg", "Avg Fwd Segment Size"),
    ("Bwd Segment Size Avg", "Avg Bwd Segment Size"),
    ("FWD Init Win Bytes", "Init_Win_bytes_forward"),
    ("Bwd Init Win Bytes", "Init_Win_bytes_backward"),
    ("Fwd Act Data Pkts", "act_data_pkt_fwd"),
    ("Fwd Seg Size Min", "min_seg_size_forward"),
    ("Label", "Attack Type"),
    // Identifier spellings, folded so the drop-list catches them
    ("Source Port", "Src Port"),
    ("Source IP", "Src IP"),
    ("Destination IP", "Dst IP"),
];

/// Columns that are never model features
pub const DEFAULT_DROP_COLUMNS: &[&str] = &[
    "Flow ID",
    "Src IP",
    "Src Port",
    "Dst IP",
    "Protocol",
    "Timestamp",
];

/// Ground-truth columns, in lookup precedence
pub const DEFAULT_LABEL_COLUMNS: &[&str] = &["Attack Type", "Label", "label"];

static DEFAULT_RULES: Lazy<SchemaRules> = Lazy::new(|| SchemaRules {
    aliases: DEFAULT_ALIASES
        .iter()
        .map(|(from, to)| (from.to_string(), to.to_string()))
        .collect(),
    drop_columns: DEFAULT_DROP_COLUMNS.iter().map(|s| s.to_string()).collect(),
    label_columns: DEFAULT_LABEL_COLUMNS.iter().map(|s| s.to_string()).collect(),
});

// ============================================================================
// SCHEMA RULES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaRules {
    /// Many-to-one rename table
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,

    /// Identifier / descriptive columns removed before reconciliation
    #[serde(default)]
    pub drop_columns: BTreeSet<String>,

    /// Recognized ground-truth columns (first present wins)
    #[serde(default)]
    pub label_columns: Vec<String>,
}

impl Default for SchemaRules {
    fn default() -> Self {
        DEFAULT_RULES.clone()
    }
}

impl SchemaRules {
    /// Load an override set from JSON
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let rules: SchemaRules = serde_json::from_str(&content).map_err(|source| LoadError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        rules.validate()?;

        log::info!(
            "Loaded schema rules from {} ({} aliases, {} dropped columns)",
            path.display(),
            rules.aliases.len(),
            rules.drop_columns.len()
        );
        Ok(rules)
    }

    /// Aliases must resolve in one hop: a target may not itself be an alias
    /// key that maps somewhere else. This makes renaming idempotent.
    pub fn validate(&self) -> Result<(), LoadError> {
        for (from, to) in &self.aliases {
            if from.trim() != from || to.trim() != to {
                return Err(LoadError::Rules(format!(
                    "alias '{}' -> '{}' has surrounding whitespace",
                    from, to
                )));
            }
            if let Some(next) = self.aliases.get(to) {
                if next != to {
                    return Err(LoadError::Rules(format!(
                        "alias chain '{}' -> '{}' -> '{}'",
                        from, to, next
                    )));
                }
            }
        }
        Ok(())
    }

    /// Canonical name for a (stripped) column name
    pub fn canonical<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases.get(name).map(String::as_str).unwrap_or(name)
    }

    pub fn is_dropped(&self, name: &str) -> bool {
        self.drop_columns.contains(name)
    }

    pub fn is_label(&self, name: &str) -> bool {
        self.label_columns.iter().any(|l| l == name)
    }
}
