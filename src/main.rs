//! parceltrack - shipment tracking acquisition via stealth browser automation.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    let cli = parceltrack::cli::parse();

    // Initialize logging based on verbosity
    let default_filter = if cli.verbose {
        "parceltrack=debug"
    } else {
        "parceltrack=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    parceltrack::cli::run(cli).await
}
