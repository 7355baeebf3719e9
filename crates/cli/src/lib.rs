pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "merchpulse",
    about = "Merchpulse operator CLI",
    long_about = "Operate Merchpulse migrations, dataset reloads, KPI exports, config inspection, and readiness checks.",
    after_help = "Examples:\n  merchpulse reload\n  merchpulse export-csv --output product_kpis.csv\n  merchpulse doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Replace stored KPI data from the JSON dataset document and regenerate suggestions"
    )]
    Reload {
        #[arg(long, help = "Dataset document path (defaults to the configured dataset.path)")]
        dataset: Option<PathBuf>,
    },
    #[command(name = "export-csv", about = "Write the per-product KPI table to a CSV file")]
    ExportCsv {
        #[arg(long, default_value = "product_kpis.csv", help = "Destination file")]
        output: PathBuf,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, dataset presence, and DB connectivity checks")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Reload { dataset } => commands::reload::run(dataset),
        Command::ExportCsv { output } => commands::export_csv::run(&output),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
