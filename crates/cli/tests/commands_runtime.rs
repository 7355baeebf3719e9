use std::env;
use std::fs;
use std::sync::{Mutex, OnceLock};

use merchpulse_cli::commands::{config, doctor, export_csv, migrate, reload};
use serde_json::Value;

const DATASET: &str = r#"{
    "products": [
        {
            "asin": "B00CLI0001",
            "product": "Trail Bottle",
            "sales": [
                {"week": "1", "units_sold": 10, "gmv": 100.0, "refunds": 0.0},
                {"week": "2", "units_sold": 20, "gmv": 300.0, "refunds": 0.0}
            ],
            "reviews": [],
            "returns": [
                {"return_reason": "Late Delivery", "count": 3}
            ]
        }
    ]
}"#;

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("MERCHPULSE_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_with_invalid_database_url() {
    with_env(&[("MERCHPULSE_DATABASE_URL", "postgres://not-sqlite")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn reload_loads_dataset_and_reports_counts() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    let dataset_path = dir.path().join("dataset.json");
    fs::write(&dataset_path, DATASET).expect("write dataset");
    let dataset_str = dataset_path.display().to_string();

    with_env(
        &[
            ("MERCHPULSE_DATABASE_URL", "sqlite::memory:?cache=shared"),
            ("MERCHPULSE_DATASET_PATH", &dataset_str),
        ],
        || {
            let result = reload::run(None);
            assert_eq!(result.exit_code, 0, "expected successful reload: {}", result.output);

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "reload");
            assert_eq!(payload["status"], "ok");

            let message = payload["message"].as_str().unwrap_or("");
            assert!(message.contains("reloaded 1 products"));
            assert!(message.contains("2 sales"));
            assert!(message.contains("1 generated"));
        },
    );
}

#[test]
fn reload_fails_with_dataset_missing_exit_code() {
    with_env(
        &[
            ("MERCHPULSE_DATABASE_URL", "sqlite::memory:"),
            ("MERCHPULSE_DATASET_PATH", "/nonexistent/dataset.json"),
        ],
        || {
            let result = reload::run(None);
            assert_eq!(result.exit_code, 6, "expected dataset-missing failure code");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "reload");
            assert_eq!(payload["status"], "error");
            assert_eq!(payload["error_class"], "dataset_missing");
        },
    );
}

#[test]
fn reload_fails_with_dataset_invalid_on_malformed_json() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    let dataset_path = dir.path().join("broken.json");
    fs::write(&dataset_path, "{not json").expect("write dataset");
    let dataset_str = dataset_path.display().to_string();

    with_env(
        &[
            ("MERCHPULSE_DATABASE_URL", "sqlite::memory:"),
            ("MERCHPULSE_DATASET_PATH", &dataset_str),
        ],
        || {
            let result = reload::run(None);
            assert_eq!(result.exit_code, 7, "expected dataset-invalid failure code");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["error_class"], "dataset_invalid");
        },
    );
}

#[test]
fn export_csv_writes_header_and_rows() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    let dataset_path = dir.path().join("dataset.json");
    fs::write(&dataset_path, DATASET).expect("write dataset");
    let dataset_str = dataset_path.display().to_string();
    let output_path = dir.path().join("product_kpis.csv");

    with_env(
        &[
            ("MERCHPULSE_DATABASE_URL", "sqlite::memory:?cache=shared"),
            ("MERCHPULSE_DATASET_PATH", &dataset_str),
        ],
        || {
            let reload_result = reload::run(None);
            assert_eq!(reload_result.exit_code, 0, "reload should succeed before export");

            let result = export_csv::run(&output_path);
            assert_eq!(result.exit_code, 0, "expected successful export: {}", result.output);

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "export-csv");
            assert_eq!(payload["status"], "ok");

            let contents = fs::read_to_string(&output_path).expect("read exported csv");
            let mut lines = contents.lines();
            assert_eq!(
                lines.next(),
                Some(
                    "ASIN,Product,Avg Rating,Total GMV,Units Sold,Refunds,\
                     Top Issue,Suggested Action"
                )
            );
        },
    );
}

#[test]
fn doctor_json_reports_failed_dataset_presence() {
    with_env(
        &[
            ("MERCHPULSE_DATABASE_URL", "sqlite::memory:"),
            ("MERCHPULSE_DATASET_PATH", "/nonexistent/dataset.json"),
        ],
        || {
            let output = doctor::run(true);
            let payload: Value =
                serde_json::from_str(&output).expect("doctor output should be valid JSON");

            assert_eq!(payload["overall_status"], "fail");
            let checks = payload["checks"].as_array().expect("checks array");
            let dataset_check = checks
                .iter()
                .find(|check| check["name"] == "dataset_presence")
                .expect("dataset presence check");
            assert_eq!(dataset_check["status"], "fail");
        },
    );
}

#[test]
fn config_reports_env_sources() {
    with_env(&[("MERCHPULSE_DATABASE_URL", "sqlite::memory:")], || {
        let output = config::run();

        assert!(output.contains("database.url = sqlite::memory:"));
        assert!(output.contains("env (MERCHPULSE_DATABASE_URL)"));
        assert!(output.contains("dataset.path"));
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "MERCHPULSE_DATABASE_URL",
        "MERCHPULSE_DATABASE_MAX_CONNECTIONS",
        "MERCHPULSE_DATABASE_TIMEOUT_SECS",
        "MERCHPULSE_DATASET_PATH",
        "MERCHPULSE_SERVER_BIND_ADDRESS",
        "MERCHPULSE_SERVER_PORT",
        "MERCHPULSE_LOGGING_LEVEL",
        "MERCHPULSE_LOGGING_FORMAT",
        "MERCHPULSE_LOG_LEVEL",
        "MERCHPULSE_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
