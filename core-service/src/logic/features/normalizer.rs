//! Schema Normalizer
//!
//! Reshapes an uploaded table into the exact column list of the model:
//! strip -> rename -> drop identifiers -> reconcile -> coerce.
//!
//! Postcondition: `output.columns() == schema.names()` for every input.
//! Missing / extra columns are corrected and logged, never raised.

use std::collections::HashMap;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::layout::FeatureSchema;
use super::rules::SchemaRules;
use super::table::{AlignedTable, LabelColumn, RawTable};
use crate::logic::error::InputError;

// ============================================================================
// ALIGNMENT REPORT
// ============================================================================

/// What the normalizer corrected
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentReport {
    /// (original, canonical) pairs
    pub renamed: Vec<(String, String)>,
    pub dropped_identifiers: Vec<String>,
    /// Schema columns zero-filled
    pub missing: Vec<String>,
    /// Input columns not in the schema
    pub extra: Vec<String>,
    /// Columns discarded because an earlier column had the same name
    pub duplicates: Vec<String>,
    /// Cells that failed numeric coercion (set to 0)
    pub coerced_cells: usize,
}

impl AlignmentReport {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty() && self.duplicates.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Normalized {
    pub table: AlignedTable,
    pub report: AlignmentReport,
}

// ============================================================================
// NORMALIZE
// ============================================================================

/// Align `raw` to `schema`. Fails only on an empty table.
pub fn normalize(
    raw: &RawTable,
    schema: &FeatureSchema,
    rules: &SchemaRules,
) -> Result<Normalized, InputError> {
    if raw.is_empty() {
        return Err(InputError::Empty);
    }

    let mut report = AlignmentReport::default();

    // 1 + 2: strip + rename; first occurrence of a name wins
    let mut columns: Vec<(String, usize)> = Vec::with_capacity(raw.headers().len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for (source_idx, header) in raw.headers().iter().enumerate() {
        let stripped = header.trim();
        let canonical = rules.canonical(stripped);
        if canonical != stripped {
            report.renamed.push((stripped.to_string(), canonical.to_string()));
        }

        if positions.contains_key(canonical) {
            report.duplicates.push(header.clone());
            continue;
        }
        positions.insert(canonical.to_string(), source_idx);
        columns.push((canonical.to_string(), source_idx));
    }

    let label_hint = capture_label_column(raw, &positions, rules);

    // 3: identifiers out
    columns.retain(|(name, _)| {
        if rules.is_dropped(name) {
            report.dropped_identifiers.push(name.clone());
            false
        } else {
            true
        }
    });

    // 4: reconcile (label columns are captured above, not extra)
    report.extra = columns
        .iter()
        .filter(|(name, _)| !schema.contains(name) && !rules.is_label(name))
        .map(|(name, _)| name.clone())
        .collect();

    let sources: Vec<Option<usize>> = schema
        .names()
        .iter()
        .map(|feature| {
            let source = columns
                .iter()
                .find(|(name, _)| name == feature)
                .map(|(_, idx)| *idx);
            if source.is_none() {
                report.missing.push(feature.clone());
            }
            source
        })
        .collect();

    // 5: coerce
    let mut values = Array2::<f64>::zeros((raw.n_rows(), schema.len()));
    for (i, row) in raw.rows().iter().enumerate() {
        for (j, source) in sources.iter().enumerate() {
            if let Some(idx) = source {
                match coerce(&row[*idx]) {
                    Some(v) => values[[i, j]] = v,
                    None => report.coerced_cells += 1,
                }
            }
        }
    }

    log_report(&report);

    Ok(Normalized {
        table: AlignedTable::new(schema.names().to_vec(), values, label_hint),
        report,
    })
}

/// Numeric coercion: unparsable or non-finite -> None (caller fills 0)
pub fn coerce(cell: &str) -> Option<f64> {
    cell.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

fn capture_label_column(
    raw: &RawTable,
    positions: &HashMap<String, usize>,
    rules: &SchemaRules,
) -> Option<LabelColumn> {
    rules.label_columns.iter().find_map(|name| {
        positions.get(name).map(|&idx| LabelColumn {
            name: name.clone(),
            values: raw.rows().iter().map(|row| row[idx].trim().to_string()).collect(),
        })
    })
}

fn log_report(report: &AlignmentReport) {
    if !report.renamed.is_empty() {
        log::debug!("Renamed columns: {:?}", report.renamed);
    }
    if !report.dropped_identifiers.is_empty() {
        log::debug!("Dropped identifier columns: {:?}", report.dropped_identifiers);
    }
    if !report.duplicates.is_empty() {
        log::warn!("Ignoring duplicate columns: {:?}", report.duplicates);
    }
    if !report.missing.is_empty() {
        log::warn!("Adding missing columns with zeros: {:?}", report.missing);
    }
    if !report.extra.is_empty() {
        log::warn!("Dropping extra columns: {:?}", report.extra);
    }
    if report.coerced_cells > 0 {
        log::warn!("{} non-numeric cells coerced to 0", report.coerced_cells);
    }
}
