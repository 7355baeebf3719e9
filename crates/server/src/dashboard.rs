use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Html,
    Json,
};
use merchpulse_db::reporting::{dashboard_report, DashboardFilter, DashboardReport, RatingBand};
use serde::Deserialize;
use tracing::info;

use crate::app::{bad_request, internal_error, AppState, ErrorBody};

#[derive(Clone, Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub asin: Option<String>,
    pub issue: Option<String>,
    pub rating: Option<String>,
}

impl DashboardQuery {
    pub fn into_filter(self) -> Result<DashboardFilter, String> {
        let rating_band = match self.rating.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
            Some(raw) => Some(raw.parse::<RatingBand>()?),
            None => None,
        };

        Ok(DashboardFilter { asin: self.asin, issue: self.issue, rating_band })
    }
}

pub async fn dashboard_api(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DashboardReport>, (StatusCode, Json<ErrorBody>)> {
    let filter = query.into_filter().map_err(bad_request)?;
    let report = dashboard_report(&state.db_pool, &filter).await.map_err(internal_error)?;

    info!(
        event_name = "dashboard.report_served",
        products = report.products.len(),
        "dashboard report served"
    );

    Ok(Json(report))
}

pub async fn dashboard_page(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Html<String>, (StatusCode, Json<ErrorBody>)> {
    let filter = query.into_filter().map_err(bad_request)?;
    let report = dashboard_report(&state.db_pool, &filter).await.map_err(internal_error)?;
    let page = state.renderer.render_dashboard(&report).map_err(internal_error)?;

    Ok(Html(page))
}
