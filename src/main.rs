use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use trivy_gate::{Cli, GateOutcome, run};

fn main() -> ExitCode {
    // Logs go to stderr; stdout is reserved for the CI output variable.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(GateOutcome::Clean) => ExitCode::SUCCESS,
        Ok(GateOutcome::VulnerabilitiesFound) => ExitCode::from(1),
        Err(e) => {
            eprintln!("trivy-gate: {}", e);
            let mut source = std::error::Error::source(&e);
            while let Some(cause) = source {
                eprintln!("  caused by: {}", cause);
                source = cause.source();
            }
            ExitCode::from(2)
        }
    }
}
