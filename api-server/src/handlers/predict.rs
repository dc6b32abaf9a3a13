//! Prediction handler
//!
//! POST /predict (multipart, field `csv_file`) -> PredictionSummary

use axum::{
    extract::{Multipart, Query, State},
    Json,
};
use serde::Deserialize;

use flowguard_core::{classify, PredictOptions, PredictionSummary, RawTable};

use crate::{AppError, AppResult, AppState};

pub const UPLOAD_FIELD: &str = "csv_file";

#[derive(Debug, Default, Deserialize)]
pub struct PredictQuery {
    #[serde(default)]
    pub diagnostic_override: bool,
}

pub async fn predict(
    State(state): State<AppState>,
    Query(query): Query<PredictQuery>,
    mut multipart: Multipart,
) -> AppResult<Json<PredictionSummary>> {
    if query.diagnostic_override && !state.config.allow_diagnostic_override {
        return Err(AppError::Forbidden(
            "diagnostic override is disabled on this server".to_string(),
        ));
    }

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload.csv").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        tracing::info!("Received {} ({} bytes)", file_name, data.len());
        upload = Some(data);
        break;
    }

    let data = upload.ok_or_else(|| {
        AppError::BadRequest(format!("missing multipart field '{}'", UPLOAD_FIELD))
    })?;

    let options = PredictOptions {
        diagnostic_override: query.diagnostic_override,
    };
    let bundle = state.bundle.clone();
    let rules = state.rules.clone();

    // CPU-bound: parse + inference off the async workers
    let summary = tokio::task::spawn_blocking(move || -> AppResult<PredictionSummary> {
        let raw = RawTable::from_csv_bytes(&data)?;
        let result = classify(&bundle, &raw, &rules, &options)?;
        if !result.report.is_clean() {
            tracing::debug!(
                "Alignment: {} missing, {} extra, {} coerced cells",
                result.report.missing.len(),
                result.report.extra.len(),
                result.report.coerced_cells
            );
        }
        Ok(PredictionSummary::from_records(result.records))
    })
    .await??;

    tracing::info!("Classified {} flows", summary.total_flows);
    Ok(Json(summary))
}
