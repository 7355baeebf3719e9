use std::path::Path;

use crate::commands::CommandResult;
use merchpulse_core::config::{AppConfig, LoadOptions};
use merchpulse_db::reporting::{export_rows, DashboardFilter, ExportRow};
use merchpulse_db::{connect_with_settings, migrations};

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

pub fn run(output: &Path) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "export-csv",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "export-csv",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;
        let rows = export_rows(&pool, &DashboardFilter::default())
            .await
            .map_err(|error| ("repository", error.to_string(), 5u8))?;
        pool.close().await;
        Ok::<_, (&'static str, String, u8)>(rows)
    });

    let rows = match result {
        Ok(rows) => rows,
        Err((error_class, message, exit_code)) => {
            return CommandResult::failure("export-csv", error_class, message, exit_code);
        }
    };

    if let Err(error) = write_csv_file(output, &rows) {
        return CommandResult::failure("export-csv", "io", error, 8);
    }

    CommandResult::success(
        "export-csv",
        format!("wrote {} product rows to {}", rows.len(), output.display()),
    )
}

fn write_csv_file(output: &Path, rows: &[ExportRow]) -> Result<(), String> {
    let mut writer = csv::Writer::from_path(output)
        .map_err(|error| format!("could not open {}: {error}", output.display()))?;

    writer.write_record(CSV_HEADERS).map_err(|error| error.to_string())?;
    for row in rows {
        writer
            .write_record(&[
                row.asin.clone(),
                row.name.clone(),
                format!("{:.2}", row.average_rating),
                format!("{:.2}", row.total_gmv),
                row.units_sold.to_string(),
                format!("{:.2}", row.total_refunds),
                row.top_issue.clone(),
                row.suggested_action.clone(),
            ])
            .map_err(|error| error.to_string())?;
    }

    writer.flush().map_err(|error| error.to_string())
}
