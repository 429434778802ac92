//! CSV upload endpoint
//!
//! POST /upload-csv/ with a multipart body:
//! - `file`: the CSV file (required, name must end in `.csv`)
//! - `threshold`: optional integer for the above-threshold analysis
//! - `mode`: optional `upsert` (default) or `strict`
//!
//! `threshold` and `mode` may also be given in the query string; multipart
//! fields take precedence.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, Query, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use galamsey_common::ingest::{ingest_csv, IngestMode, IngestOptions, IngestSummary};

use crate::api::stats::parse_threshold;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Optional query parameters for the upload
#[derive(Debug, Default, Deserialize)]
pub struct UploadQuery {
    pub threshold: Option<String>,
    pub mode: Option<String>,
}

/// True when the uploaded file name has a `.csv` extension
pub fn has_csv_extension(filename: &str) -> bool {
    std::path::Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}

/// POST /upload-csv/
pub async fn upload_csv(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<(StatusCode, Json<IngestSummary>)> {
    let mut multipart = multipart?;

    let mut file: Option<(String, Vec<u8>)> = None;
    let mut threshold_field: Option<String> = None;
    let mut mode_field: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                // Reject by name before reading or parsing any content
                if !has_csv_extension(&filename) {
                    return Err(ApiError::BadRequest(
                        "Uploaded file must have a .csv extension".to_string(),
                    ));
                }
                let bytes = field.bytes().await?;
                file = Some((filename, bytes.to_vec()));
            }
            Some("threshold") => threshold_field = Some(field.text().await?),
            Some("mode") => mode_field = Some(field.text().await?),
            _ => {
                tracing::debug!(field = ?name, "Ignoring unknown multipart field");
            }
        }
    }

    let (filename, bytes) = file.ok_or_else(|| {
        ApiError::BadRequest("No file uploaded (expected field 'file')".to_string())
    })?;

    let threshold = match threshold_field.or(query.threshold) {
        Some(raw) if !raw.trim().is_empty() => Some(parse_threshold(Some(raw.as_str()))?),
        _ => None,
    };

    let mode = match mode_field.or(query.mode) {
        Some(raw) => raw.parse::<IngestMode>()?,
        None => IngestMode::default(),
    };

    tracing::info!(
        filename = %filename,
        bytes = bytes.len(),
        ?mode,
        "Received CSV upload"
    );

    let summary = ingest_csv(&state.db, &filename, &bytes, IngestOptions { threshold, mode }).await?;

    Ok((StatusCode::CREATED, Json(summary)))
}

/// Build CSV upload routes
pub fn upload_routes() -> Router<AppState> {
    Router::new().route("/upload-csv/", post(upload_csv))
}
