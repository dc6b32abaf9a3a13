//! Tabular Input
//!
//! `RawTable` is the uploaded CSV as text cells; `AlignedTable` is the
//! normalizer's output: numeric, columns exactly equal to the schema.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use ndarray::Array2;

use crate::logic::error::InputError;

// ============================================================================
// RAW TABLE
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Build from headers + rows. Short rows are padded with empty cells.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, InputError> {
        if headers.is_empty() {
            return Err(InputError::MissingHeader);
        }

        let width = headers.len();
        let mut padded = Vec::with_capacity(rows.len());
        for (i, mut row) in rows.into_iter().enumerate() {
            if row.len() > width {
                return Err(InputError::RaggedRow {
                    row: i + 1,
                    expected: width,
                    found: row.len(),
                });
            }
            row.resize(width, String::new());
            padded.push(row);
        }

        Ok(Self {
            headers: dedupe_headers(headers),
            rows: padded,
        })
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, InputError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
            return Err(InputError::MissingHeader);
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Self::new(headers, rows)
    }

    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Self, InputError> {
        Self::from_csv_reader(bytes)
    }

    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self, InputError> {
        let file = std::fs::File::open(path.as_ref()).map_err(csv::Error::from)?;
        Self::from_csv_reader(std::io::BufReader::new(file))
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cells of one column, in row order
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| row[idx].as_str()).collect())
    }
}

/// Repeated header names become `name`, `name.1`, `name.2`, ...
/// (flow exporters emit e.g. two `Fwd Header Length` columns)
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::with_capacity(headers.len());

    for header in headers {
        let seen = counts.entry(header.clone()).or_insert(0);
        if *seen == 0 {
            *seen = 1;
            out.push(header);
            continue;
        }

        let mut n = *seen;
        let mut candidate = format!("{}.{}", header, n);
        while out.contains(&candidate) {
            n += 1;
            candidate = format!("{}.{}", header, n);
        }
        *seen = n + 1;
        counts.insert(candidate.clone(), 1);
        out.push(candidate);
    }

    out
}

// ============================================================================
// ALIGNED TABLE
// ============================================================================

/// Ground-truth column captured before normalization strips it
#[derive(Debug, Clone, PartialEq)]
pub struct LabelColumn {
    pub name: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlignedTable {
    columns: Vec<String>,
    values: Array2<f64>,
    label_hint: Option<LabelColumn>,
}

impl AlignedTable {
    pub(crate) fn new(columns: Vec<String>, values: Array2<f64>, label_hint: Option<LabelColumn>) -> Self {
        debug_assert_eq!(columns.len(), values.ncols());
        Self {
            columns,
            values,
            label_hint,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// rows x features, column order == schema order
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn label_hint(&self) -> Option<&LabelColumn> {
        self.label_hint.as_ref()
    }

    /// Text form of the aligned data (Display of f64 round-trips exactly)
    pub fn to_raw(&self) -> RawTable {
        let rows = self
            .values
            .rows()
            .into_iter()
            .map(|row| row.iter().map(|v| v.to_string()).collect())
            .collect();

        RawTable {
            headers: self.columns.clone(),
            rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_csv_bytes() {
        let table = RawTable::from_csv_bytes(b"a,b\n1,2\n3,4\n").unwrap();
        assert_eq!(table.headers(), &["a", "b"]);
        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.column("b").unwrap(), vec!["2", "4"]);
    }

    #[test]
    fn test_duplicate_headers_suffixed() {
        let table = RawTable::from_csv_bytes(
            b"Fwd Header Length,Fwd Header Length,x,x\n1,2,3,4\n",
        )
        .unwrap();
        assert_eq!(
            table.headers(),
            &["Fwd Header Length", "Fwd Header Length.1", "x", "x.1"]
        );
        assert_eq!(table.column("Fwd Header Length.1").unwrap(), vec!["2"]);
    }

    #[test]
    fn test_short_rows_padded() {
        let table = RawTable::from_csv_bytes(b"a,b,c\n1\n1,2,3\n").unwrap();
        assert_eq!(table.rows()[0], vec!["1", "", ""]);
    }

    #[test]
    fn test_long_rows_rejected() {
        let result = RawTable::from_csv_bytes(b"a,b\n1,2,3\n");
        assert!(matches!(result, Err(InputError::RaggedRow { row: 1, expected: 2, found: 3 })));
    }

    #[test]
    fn test_header_only_has_no_rows() {
        let table = RawTable::from_csv_bytes(b"a,b\n").unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_empty_input_has_no_header() {
        assert!(matches!(
            RawTable::from_csv_bytes(b""),
            Err(InputError::MissingHeader)
        ));
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let result = RawTable::from_csv_bytes(b"a,b\n\xff\xfe,1\n");
        assert!(matches!(result, Err(InputError::Csv(_))));
    }
}
