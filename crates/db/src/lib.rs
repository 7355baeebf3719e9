pub mod connection;
pub mod ingest;
pub mod migrations;
pub mod reporting;
pub mod repositories;

pub use connection::{connect_with_settings, DbPool};
pub use ingest::{DatasetReload, ReloadError, ReloadSummary};
pub use reporting::{
    DashboardFilter, DashboardReport, ExportRow, PdfRow, RatingBand, ReasonBreakdown,
};
