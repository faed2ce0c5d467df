use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tieba_feed::cache::FileCacheStore;
use tieba_feed::config::Config;
use tieba_feed::Pipeline;

const USAGE: &str = "usage: tieba-feed <forum-name> [--force]";

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {e:#}");
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    init_tracing()?;

    let mut forum = std::env::var("FORUM_NAME").unwrap_or_default();
    let mut force_refresh = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--force" | "-f" => force_refresh = true,
            "--help" | "-h" => {
                println!("{USAGE}");
                return Ok(());
            }
            _ => forum = arg,
        }
    }

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!(
        forum = %forum,
        force_refresh,
        base_url = %config.forum_base_url,
        "Configuration loaded"
    );

    let store = FileCacheStore::new(config.cache_dir.clone());
    let pipeline = Pipeline::new(config, Arc::new(store))?;

    let entry = pipeline.get_entry(&forum, force_refresh).await;
    if entry.has_items() {
        info!(page = %pipeline.page_url(&forum), "Entry ready");
    } else {
        info!("No threads available");
    }

    let json = serde_json::to_string_pretty(&entry).context("Failed to serialize entry")?;
    println!("{json}");

    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tieba_feed=debug"));

    // Check if JSON logging is requested
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    // stdout carries the entry JSON, so logs go to stderr
    if use_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }

    Ok(())
}
