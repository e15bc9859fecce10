use clap::Parser;
use docscan::config::{Args, Config};
use docscan::server;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from(args);

    tracing::info!("Starting docscan-server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Binding to {}:{} (cloud OCR: {}, local OCR: {})",
        config.host,
        config.port,
        if config.vision.is_some() { "enabled" } else { "disabled" },
        if config.local_ocr { "enabled" } else { "disabled" }
    );

    server::run(config).await
}
