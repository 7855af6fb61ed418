//! Strata CLI - ordered deployment of interdependent infrastructure layers

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use strata_cli::cli::Cli;
use strata_cli::domain::ConfigError;
use strata_cli::output::json::format_error;

/// Log filter: `STRATA_LOG`, then `RUST_LOG`, then a default that `-v` raises.
fn init_tracing(verbose: bool) {
    let fallback = if verbose { "info" } else { "warn" };
    let filter = std::env::var("STRATA_LOG")
        .ok()
        .and_then(|s| EnvFilter::try_new(s).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let json = cli.json;
    init_tracing(cli.verbose);

    match cli.run().await {
        Ok(code) => code,
        Err(e) => {
            if json {
                let code = if e.downcast_ref::<ConfigError>().is_some() {
                    "CONFIG_ERROR"
                } else {
                    "ERROR"
                };
                match format_error(&format!("{e:#}"), code) {
                    Ok(text) => println!("{text}"),
                    Err(_) => eprintln!("Error: {e:#}"),
                }
            } else {
                eprintln!("Error: {e:#}");
            }
            ExitCode::FAILURE
        }
    }
}
