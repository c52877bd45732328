// src/main.rs

use std::path::PathBuf;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod app;

use app::PipaApp;
use pipa_config::{ConfigLoader, ConfigValidator};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    info!("Starting PIPA assistant front door v{}", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = ConfigLoader::load_or_default(config_path.as_deref())?;
    ConfigValidator::validate(&config)?;

    let mut app = PipaApp::new(config)?;
    app.run().await?;

    info!("PIPA shut down");
    Ok(())
}

fn init_logging() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pipa=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}
