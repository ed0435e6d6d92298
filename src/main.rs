/// CricBuddy API
///
/// Co dělá:
///   GET /live-matches      → cricbuzz live-scores (HTTP + scraper)
///   GET /upcoming-matches  → cricbuzz schedule (headless Chrome)
///
/// Spuštění:
///   PORT=3000 cargo run --bin cricbuddy-api

use std::sync::Arc;

use anyhow::{Context, Result};
use cricbuddy::{build_router, AppConfig, AppState};
use cricket_scraper::CricketScraper;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let config = AppConfig::from_env()?;
    info!("Live source: {}", config.scraper.live_url);
    info!("Upcoming source: {}", config.scraper.upcoming_url);
    info!(
        "Failure policy: {}",
        if config.strict_errors { "502 on scrape failure" } else { "empty list on scrape failure" }
    );

    let scraper = CricketScraper::new(config.scraper.clone())?;
    let app = build_router(AppState {
        scraper: Arc::new(scraper),
        strict_errors: config.strict_errors,
    });

    let addr = config.bind_addr();
    let listener = TcpListener::bind(addr).await.context("bind failed")?;
    info!("✅ Server running on http://{}", addr);

    axum::serve(listener, app).await.context("server stopped")?;
    Ok(())
}
