//! Printable report rendering.
//!
//! Reports render through HTML templates and convert to PDF via
//! wkhtmltopdf when it is on PATH; otherwise the HTML itself is returned
//! for browser printing.

use std::collections::HashMap;
use std::process::Stdio;

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use merchpulse_db::reporting::{DashboardReport, PdfRow};
use tera::{Context, Tera};
use tokio::process::Command;
use tracing::{error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("template error: {0}")]
    Template(String),
    #[error("conversion error: {0}")]
    Conversion(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Formats a number to 2 decimal places. Usage: `amount | money`
fn tera_money_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let num = match value {
        tera::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        tera::Value::Null => 0.0,
        _ => 0.0,
    };
    Ok(tera::Value::String(format!("{:.2}", num)))
}

pub struct ReportRenderer {
    tera: Tera,
    wkhtmltopdf_path: Option<String>,
}

impl ReportRenderer {
    pub fn new() -> Result<Self, ReportError> {
        let mut tera = Tera::default();
        tera.register_filter("money", tera_money_filter);

        tera.add_raw_template(
            "dashboard.html.tera",
            include_str!("../../../templates/dashboard.html.tera"),
        )
        .map_err(|e| ReportError::Template(e.to_string()))?;
        tera.add_raw_template(
            "kpi_report.html.tera",
            include_str!("../../../templates/kpi_report.html.tera"),
        )
        .map_err(|e| ReportError::Template(e.to_string()))?;

        let wkhtmltopdf_path =
            which::which("wkhtmltopdf").ok().map(|p| p.to_string_lossy().to_string());

        match &wkhtmltopdf_path {
            Some(path) => info!(path = %path, "wkhtmltopdf found"),
            None => {
                warn!("wkhtmltopdf not found in PATH, PDF export will use browser rendering")
            }
        }

        Ok(Self { tera, wkhtmltopdf_path })
    }

    pub fn render_dashboard(&self, report: &DashboardReport) -> Result<String, ReportError> {
        let mut context = Context::new();
        context.insert("kpis", &report.kpis);
        context.insert("gmv_series", &report.gmv_series);
        context.insert("top_return_reasons", &report.top_return_reasons);
        context.insert("products", &report.products);

        self.tera
            .render("dashboard.html.tera", &context)
            .map_err(|e| ReportError::Template(e.to_string()))
    }

    /// Render the printable report. Suggestion text gets sentence-level
    /// line breaks so long action plans stay readable in a narrow cell.
    pub fn render_report_html(&self, rows: &[PdfRow]) -> Result<String, ReportError> {
        let rendered_rows: Vec<serde_json::Value> = rows
            .iter()
            .map(|row| {
                serde_json::json!({
                    "name": row.name,
                    "total_gmv": row.total_gmv,
                    "average_rating": row.average_rating,
                    "return_rate": row.return_rate,
                    "top_issue": row.top_issue,
                    "action_html": row.suggested_action.replace(". ", ".<br/>"),
                })
            })
            .collect();

        let mut context = Context::new();
        context.insert("rows", &rendered_rows);
        context.insert("generated_on", &Utc::now().format("%Y-%m-%d %H:%M UTC").to_string());

        self.tera
            .render("kpi_report.html.tera", &context)
            .map_err(|e| ReportError::Template(e.to_string()))
    }

    pub async fn generate_report(&self, rows: &[PdfRow]) -> Result<PdfResult, ReportError> {
        let html = self.render_report_html(rows)?;

        if let Some(ref wkhtmltopdf) = self.wkhtmltopdf_path {
            match convert_html_to_pdf(&html, wkhtmltopdf).await {
                Ok(pdf_bytes) => Ok(PdfResult::Pdf(pdf_bytes)),
                Err(e) => {
                    warn!(error = %e, "PDF conversion failed, falling back to HTML");
                    Ok(PdfResult::Html(html))
                }
            }
        } else {
            Ok(PdfResult::Html(html))
        }
    }

    #[cfg(test)]
    fn without_wkhtmltopdf() -> Result<Self, ReportError> {
        let mut renderer = Self::new()?;
        renderer.wkhtmltopdf_path = None;
        Ok(renderer)
    }
}

async fn convert_html_to_pdf(html: &str, wkhtmltopdf_path: &str) -> Result<Vec<u8>, ReportError> {
    let temp_dir = std::env::temp_dir();
    let html_path = temp_dir.join(format!("report_{}.html", uuid::Uuid::new_v4()));
    let pdf_path = temp_dir.join(format!("report_{}.pdf", uuid::Uuid::new_v4()));

    tokio::fs::write(&html_path, html).await?;

    let output = Command::new(wkhtmltopdf_path)
        .arg("--page-size")
        .arg("A4")
        .arg("--margin-top")
        .arg("10mm")
        .arg("--margin-bottom")
        .arg("10mm")
        .arg("--margin-left")
        .arg("10mm")
        .arg("--margin-right")
        .arg("10mm")
        .arg("--encoding")
        .arg("utf-8")
        .arg("--enable-local-file-access")
        .arg(&html_path)
        .arg(&pdf_path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        error!(stderr = %stderr, "wkhtmltopdf failed");
        return Err(ReportError::Conversion(stderr.to_string()));
    }

    let pdf_bytes = tokio::fs::read(&pdf_path).await?;

    let _ = tokio::fs::remove_file(&html_path).await;
    let _ = tokio::fs::remove_file(&pdf_path).await;

    info!(size = pdf_bytes.len(), "PDF generated");

    Ok(pdf_bytes)
}

pub enum PdfResult {
    Pdf(Vec<u8>),
    Html(String),
}

impl PdfResult {
    pub fn into_response(self, filename: &str) -> Response {
        match self {
            PdfResult::Pdf(bytes) => (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "application/pdf".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}\"", filename),
                    ),
                ],
                Body::from(bytes),
            )
                .into_response(),
            PdfResult::Html(html) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8".to_string())],
                Body::from(html),
            )
                .into_response(),
        }
    }
}
