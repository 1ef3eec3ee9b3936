use anyhow::Result;
use clap::Parser;
use granule_sync::cli::Cli;
use granule_sync::{sync, HttpSession};
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins over `--verbose`; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing(verbose: bool) {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("granule_sync={default_level}")));

    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let request = cli.into_request()?;
    let session = HttpSession::new(&request)?;

    let report = sync::run(&session, &request).await?;
    if !report.is_complete() {
        warn!("Some granules are still missing ({}); run again to retry them", report);
    }

    Ok(())
}
