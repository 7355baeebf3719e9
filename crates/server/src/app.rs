use std::sync::Arc;

use axum::{http::StatusCode, routing::get, Json, Router};
use merchpulse_db::DbPool;
use serde::Serialize;

use crate::pdf::{ReportError, ReportRenderer};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub renderer: Arc<ReportRenderer>,
}

impl AppState {
    pub fn new(db_pool: DbPool) -> Result<Self, ReportError> {
        Ok(Self { db_pool, renderer: Arc::new(ReportRenderer::new()?) })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(crate::dashboard::dashboard_page))
        .route("/api/dashboard", get(crate::dashboard::dashboard_api))
        .route("/export/csv", get(crate::export::export_csv))
        .route("/export/pdf", get(crate::export::export_pdf))
        .with_state(state)
}

#[derive(Clone, Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

pub fn bad_request(message: impl Into<String>) -> (StatusCode, Json<ErrorBody>) {
    (StatusCode::BAD_REQUEST, Json(ErrorBody { error: message.into() }))
}

pub fn internal_error(error: impl std::fmt::Display) -> (StatusCode, Json<ErrorBody>) {
    tracing::error!(event_name = "system.request.failed", error = %error, "request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody { error: "internal server error".to_string() }),
    )
}
