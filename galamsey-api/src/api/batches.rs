//! Upload batch browsing
//!
//! GET /uploads/, GET /uploads/:id/, DELETE /uploads/:id/

use axum::{
    extract::{rejection::PathRejection, Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::info;

use galamsey_common::db::{batches, sites, SiteRecord, UploadBatch};
use galamsey_common::stats::{self, Analysis};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// GET /uploads/:id/ response
#[derive(Debug, Serialize)]
pub struct BatchDetailResponse {
    pub batch: UploadBatch,
    pub records: Vec<SiteRecord>,
    pub analysis: Analysis,
}

/// DELETE /uploads/:id/ response
#[derive(Debug, Serialize)]
pub struct DeleteBatchResponse {
    pub deleted: u64,
    pub records_deleted: u64,
}

fn batch_not_found(batch_id: i64) -> ApiError {
    ApiError::NotFound(format!("Upload batch {} not found", batch_id))
}

/// GET /uploads/
pub async fn list_batches(State(state): State<AppState>) -> ApiResult<Json<Vec<UploadBatch>>> {
    Ok(Json(batches::list_batches(&state.db).await?))
}

/// GET /uploads/:id/
///
/// Batch metadata, the records it currently owns and their aggregates.
pub async fn get_batch(
    State(state): State<AppState>,
    batch_id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<BatchDetailResponse>> {
    let Path(batch_id) = batch_id?;

    let batch = batches::get_batch(&state.db, batch_id)
        .await?
        .ok_or_else(|| batch_not_found(batch_id))?;
    let records = sites::list_sites_for_batch(&state.db, batch_id).await?;
    let analysis = stats::analyze(&records, None);

    Ok(Json(BatchDetailResponse {
        batch,
        records,
        analysis,
    }))
}

/// DELETE /uploads/:id/
pub async fn delete_batch(
    State(state): State<AppState>,
    batch_id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<DeleteBatchResponse>> {
    let Path(batch_id) = batch_id?;

    let records_deleted = batches::delete_batch(&state.db, batch_id)
        .await?
        .ok_or_else(|| batch_not_found(batch_id))?;

    info!(batch_id, records_deleted, "Upload batch deleted");
    Ok(Json(DeleteBatchResponse {
        deleted: 1,
        records_deleted,
    }))
}

/// Build upload batch routes
pub fn batch_routes() -> Router<AppState> {
    Router::new()
        .route("/uploads/", get(list_batches))
        .route("/uploads/:id/", get(get_batch).delete(delete_batch))
}
