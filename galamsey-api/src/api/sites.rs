//! Site record CRUD
//!
//! GET, POST and DELETE on `/gsites/`

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use galamsey_common::db::{sites, NewSiteRecord, SiteRecord};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// `id` in the delete body: a single id or a list of ids
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum IdList {
    One(i64),
    Many(Vec<i64>),
}

impl IdList {
    fn into_vec(self) -> Vec<i64> {
        match self {
            IdList::One(id) => vec![id],
            IdList::Many(ids) => ids,
        }
    }
}

/// DELETE /gsites/ request
#[derive(Debug, Deserialize)]
pub struct DeleteSitesRequest {
    pub id: IdList,
}

/// DELETE /gsites/ response
#[derive(Debug, Serialize)]
pub struct DeleteSitesResponse {
    pub deleted: u64,
}

/// GET /gsites/
pub async fn list_sites(State(state): State<AppState>) -> ApiResult<Json<Vec<SiteRecord>>> {
    let records = sites::list_sites(&state.db).await?;
    Ok(Json(records))
}

/// POST /gsites/
///
/// Creates a record with no batch owner. An existing (Town, Region) pair
/// answers 409.
pub async fn create_site(
    State(state): State<AppState>,
    payload: Result<Json<NewSiteRecord>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SiteRecord>)> {
    let Json(payload) = payload?;
    let record = payload.normalized()?;

    let created = sites::insert_site(&state.db, &record).await?;
    info!(
        id = created.id,
        town = %created.town,
        region = %created.region,
        "Site record created"
    );

    Ok((StatusCode::CREATED, Json(created)))
}

/// DELETE /gsites/
///
/// Removes every listed id that exists; 404 when none of them did.
pub async fn delete_sites(
    State(state): State<AppState>,
    payload: Result<Json<DeleteSitesRequest>, JsonRejection>,
) -> ApiResult<Json<DeleteSitesResponse>> {
    let Json(payload) = payload?;
    let ids = payload.id.into_vec();

    if ids.is_empty() {
        return Err(ApiError::BadRequest(
            "id must contain at least one record id".to_string(),
        ));
    }

    let deleted = sites::delete_sites(&state.db, &ids).await?;
    if deleted == 0 {
        return Err(ApiError::NotFound(
            "No records found for the given ids".to_string(),
        ));
    }

    info!(requested = ids.len(), deleted, "Site records deleted");
    Ok(Json(DeleteSitesResponse { deleted }))
}

/// Build site CRUD routes
pub fn site_routes() -> Router<AppState> {
    Router::new().route(
        "/gsites/",
        get(list_sites).post(create_site).delete(delete_sites),
    )
}
