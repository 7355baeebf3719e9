use std::path::PathBuf;

use crate::commands::CommandResult;
use merchpulse_core::config::{AppConfig, LoadOptions};
use merchpulse_db::{connect_with_settings, migrations, DatasetReload, ReloadError};

pub fn run(dataset_override: Option<PathBuf>) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "reload",
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
                "reload",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let dataset_path = dataset_override.unwrap_or_else(|| config.dataset.path.clone());

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

        let summary = DatasetReload::from_path(&pool, &dataset_path).await.map_err(|error| {
            let (error_class, exit_code) = match &error {
                ReloadError::DatasetNotFound { .. } => ("dataset_missing", 6u8),
                ReloadError::DatasetRead { .. } => ("dataset_read", 6),
                ReloadError::DatasetParse { .. } => ("dataset_invalid", 7),
                ReloadError::Repository(_) => ("repository", 5),
            };
            (error_class, error.to_string(), exit_code)
        })?;

        pool.close().await;
        Ok::<_, (&'static str, String, u8)>(summary)
    });

    match result {
        Ok(summary) => CommandResult::success(
            "reload",
            format!(
                "reloaded {} products ({} skipped), {} sales, {} reviews, {} returns; \
                 suggestions: {} generated, {} preserved",
                summary.products_loaded,
                summary.entries_skipped,
                summary.sales_loaded,
                summary.reviews_loaded,
                summary.returns_loaded,
                summary.suggestions_generated,
                summary.suggestions_preserved,
            ),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("reload", error_class, message, exit_code)
        }
    }
}
