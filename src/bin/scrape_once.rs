//! Jednorázový test obou scraperů bez HTTP serveru
//! Spustit: cargo run --bin scrape-once

use anyhow::{bail, Result};
use cricbuddy::AppConfig;
use cricket_scraper::CricketScraper;
use tokio::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;
    let scraper = CricketScraper::new(config.scraper)?;
    let mut failures = 0;

    info!("🔍 Fetching live matches...");
    let started = Instant::now();
    match scraper.try_fetch_live_matches().await {
        Ok(matches) => {
            info!("Live: {} matches in {:?}", matches.len(), started.elapsed());
            println!("{}", serde_json::to_string_pretty(&matches)?);
        }
        Err(e) => {
            warn!("Live fetch failed: {}", e);
            failures += 1;
        }
    }

    info!("🔍 Fetching upcoming matches (headless Chrome)...");
    let started = Instant::now();
    match scraper.try_fetch_upcoming_matches().await {
        Ok(matches) => {
            info!("Upcoming: {} unique matches in {:?}", matches.len(), started.elapsed());
            println!("{}", serde_json::to_string_pretty(&matches)?);
        }
        Err(e) => {
            warn!("Upcoming fetch failed: {}", e);
            failures += 1;
        }
    }

    if failures > 0 {
        bail!("{} of 2 scrapers failed", failures);
    }
    Ok(())
}
