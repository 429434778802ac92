//! Dashboard summary: every record plus the headline aggregates in one call

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use galamsey_common::db::{sites, SiteRecord};
use galamsey_common::stats::{self, RegionAverage};

use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub gsite_data: Vec<SiteRecord>,
    pub total_galamsey_sites: Option<i64>,
    pub average_galamsey_sites_per_region: Vec<RegionAverage>,
}

/// GET /dashboard/
pub async fn dashboard(State(state): State<AppState>) -> ApiResult<Json<DashboardResponse>> {
    let records = sites::list_sites(&state.db).await?;
    let total_galamsey_sites = stats::total_sites(&records);
    let average_galamsey_sites_per_region = stats::average_per_region(&records);

    Ok(Json(DashboardResponse {
        gsite_data: records,
        total_galamsey_sites,
        average_galamsey_sites_per_region,
    }))
}

pub fn dashboard_routes() -> Router<AppState> {
    Router::new().route("/dashboard/", get(dashboard))
}
