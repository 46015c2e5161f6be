//! Flowhost CLI
//!
//! Validates, registers, and executes generated workflow scripts against the
//! configured store without requiring the surrounding API service.

use flowhost::cli;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    if let Err(e) = cli::run_cli().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
