//! Aggregate statistics endpoints
//!
//! All aggregates run over every stored record; per-upload figures are
//! part of the upload response and the batch detail endpoint.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use galamsey_common::db::sites;
use galamsey_common::stats::{self, RegionAverage, RegionTotal, TopRegion};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub(crate) const THRESHOLD_REQUIRED: &str = "Threshold parameter is required";
pub(crate) const THRESHOLD_NOT_INTEGER: &str = "Threshold must be an integer";

/// GET /total-galamsey-sites/ response
#[derive(Debug, Serialize)]
pub struct TotalResponse {
    pub total_galamsey_sites: Option<i64>,
}

/// Query string for the threshold endpoint
#[derive(Debug, Default, Deserialize)]
pub struct ThresholdQuery {
    pub threshold: Option<String>,
}

/// Parse a textual threshold; absent or blank is "required"
pub(crate) fn parse_threshold(raw: Option<&str>) -> ApiResult<i64> {
    let raw = match raw.map(str::trim) {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Err(ApiError::BadRequest(THRESHOLD_REQUIRED.to_string())),
    };
    raw.parse()
        .map_err(|_| ApiError::BadRequest(THRESHOLD_NOT_INTEGER.to_string()))
}

/// Threshold from a JSON body value; `None` when absent or null
fn threshold_from_json(value: Option<&Value>) -> ApiResult<Option<i64>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| ApiError::BadRequest(THRESHOLD_NOT_INTEGER.to_string())),
        Some(Value::String(s)) => parse_threshold(Some(s.as_str())).map(Some),
        Some(_) => Err(ApiError::BadRequest(THRESHOLD_NOT_INTEGER.to_string())),
    }
}

/// GET /total-galamsey-sites/
pub async fn total_sites(State(state): State<AppState>) -> ApiResult<Json<TotalResponse>> {
    let records = sites::list_sites(&state.db).await?;
    Ok(Json(TotalResponse {
        total_galamsey_sites: stats::total_sites(&records),
    }))
}

/// GET /average-galamsey-sites-per-region/
pub async fn average_per_region(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<RegionAverage>>> {
    let records = sites::list_sites(&state.db).await?;
    Ok(Json(stats::average_per_region(&records)))
}

/// GET /region-with-highest-galamsey-sites/
pub async fn highest_region(State(state): State<AppState>) -> ApiResult<Json<TopRegion>> {
    let records = sites::list_sites(&state.db).await?;
    stats::top_region(&records)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("No data available".to_string()))
}

/// GET /regions-above-threshold/?threshold=N
pub async fn regions_above_threshold(
    State(state): State<AppState>,
    Query(query): Query<ThresholdQuery>,
) -> ApiResult<Json<Vec<RegionTotal>>> {
    let threshold = parse_threshold(query.threshold.as_deref())?;
    let records = sites::list_sites(&state.db).await?;
    Ok(Json(stats::regions_above_threshold(&records, threshold)))
}

/// POST /regions-above-threshold/ with `{"threshold": N}`
///
/// A query-string threshold is honoured when the body carries none.
pub async fn regions_above_threshold_post(
    State(state): State<AppState>,
    Query(query): Query<ThresholdQuery>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Vec<RegionTotal>>> {
    let from_body = match payload {
        Ok(Json(body)) => threshold_from_json(body.get("threshold"))?,
        Err(_) if query.threshold.is_some() => None,
        Err(JsonRejection::MissingJsonContentType(_)) => None,
        Err(rejection) => return Err(rejection.into()),
    };

    let threshold = match from_body {
        Some(threshold) => threshold,
        None => parse_threshold(query.threshold.as_deref())?,
    };

    let records = sites::list_sites(&state.db).await?;
    Ok(Json(stats::regions_above_threshold(&records, threshold)))
}

/// Build aggregate statistics routes
pub fn stats_routes() -> Router<AppState> {
    Router::new()
        .route("/total-galamsey-sites/", get(total_sites))
        .route("/average-galamsey-sites-per-region/", get(average_per_region))
        .route("/region-with-highest-galamsey-sites/", get(highest_region))
        .route(
            "/regions-above-threshold/",
            get(regions_above_threshold).post(regions_above_threshold_post),
        )
}
