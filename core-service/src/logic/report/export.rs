use std::io::Write;

use crate::logic::error::ExportError;
use crate::logic::features::RawTable;
use crate::logic::model::PredictionRecord;

/// Write the original rows with `Prediction` and `Confidence` appended.
/// Rows are paired with records by position.
/// Returns the number of rows written.
pub fn write_predictions_csv<W: Write>(
    raw: &RawTable,
    records: &[PredictionRecord],
    writer: W,
) -> Result<usize, ExportError> {
    if raw.n_rows() != records.len() {
        return Err(ExportError::RowCountMismatch {
            rows: raw.n_rows(),
            records: records.len(),
        });
    }

    let mut out = csv::Writer::from_writer(writer);

    let mut header: Vec<&str> = raw.headers().iter().map(String::as_str).collect();
    header.push("Prediction");
    header.push("Confidence");
    out.write_record(&header)?;

    for (row, record) in raw.rows().iter().zip(records) {
        let confidence = record
            .confidence_score
            .map(|c| c.to_string())
            .unwrap_or_default();

        let mut fields: Vec<&str> = row.iter().map(String::as_str).collect();
        fields.push(&record.predicted_label);
        fields.push(&confidence);
        out.write_record(&fields)?;
    }

    out.flush()?;
    log::info!("Exported {} predictions", records.len());
    Ok(records.len())
}
