use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use merchpulse_db::reporting::{export_rows, pdf_rows, ExportRow};
use thiserror::Error;
use tracing::info;

use crate::app::{bad_request, internal_error, AppState};
use crate::dashboard::DashboardQuery;

const CSV_HEADERS: [&str; 8] = [
    "ASIN",
    "Product",
    "Avg Rating",
    "Total GMV",
    "Units Sold",
    "Refunds",
    "Top Issue",
    "Suggested Action",
];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv write failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("csv buffer error: {0}")]
    Buffer(String),
}

pub fn write_csv(rows: &[ExportRow]) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADERS)?;

    for row in rows {
        writer.write_record(&[
            row.asin.clone(),
            row.name.clone(),
            format!("{:.2}", row.average_rating),
            format!("{:.2}", row.total_gmv),
            row.units_sold.to_string(),
            format!("{:.2}", row.total_refunds),
            row.top_issue.clone(),
            row.suggested_action.clone(),
        ])?;
    }

    writer.into_inner().map_err(|error| ExportError::Buffer(error.to_string()))
}

pub async fn export_csv(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Response {
    let filter = match query.into_filter() {
        Ok(filter) => filter,
        Err(message) => return bad_request(message).into_response(),
    };

    let rows = match export_rows(&state.db_pool, &filter).await {
        Ok(rows) => rows,
        Err(error) => return internal_error(error).into_response(),
    };

    if rows.is_empty() {
        return (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            "No data available for export.",
        )
            .into_response();
    }

    let bytes = match write_csv(&rows) {
        Ok(bytes) => bytes,
        Err(error) => return internal_error(error).into_response(),
    };

    info!(event_name = "export.csv_served", rows = rows.len(), "csv export served");

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"product_kpis.csv\"".to_string(),
            ),
        ],
        Body::from(bytes),
    )
        .into_response()
}

pub async fn export_pdf(State(state): State<AppState>) -> Response {
    let rows = match pdf_rows(&state.db_pool).await {
        Ok(rows) => rows,
        Err(error) => return internal_error(error).into_response(),
    };

    match state.renderer.generate_report(&rows).await {
        Ok(result) => {
            info!(event_name = "export.pdf_served", rows = rows.len(), "pdf export served");
            result.into_response("product_kpi_report.pdf")
        }
        Err(error) => internal_error(error).into_response(),
    }
}
