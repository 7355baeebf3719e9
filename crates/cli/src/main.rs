use std::process::ExitCode;

fn main() -> ExitCode {
    merchpulse_cli::run()
}
