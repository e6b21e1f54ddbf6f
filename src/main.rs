use anyhow::Result;
use tracing::{error, info, warn};

mod browser;
mod config;
mod export;
mod models;
mod pages;
mod scraper;
mod transform;

use crate::config::ScraperConfig;
use crate::models::ScrapeOutcome;
use crate::scraper::BatScraper;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    info!("Bring a Trailer auction scraper");

    let config = ScraperConfig::from_env();
    let scraper = BatScraper::new(config).await?;
    let outcome = scraper.run().await?;

    report_summary(&outcome);
    Ok(())
}

/// Log the end-of-run summary. Per-URL errors are reported here but
/// never fail the process; only a fatal failure above exits non-zero.
fn report_summary(outcome: &ScrapeOutcome) {
    let stats = &outcome.stats;

    info!("Run summary");
    info!("  Sold:    {}", stats.sold);
    info!("  Bid:     {}", stats.bid);
    info!("  Skipped: {}", stats.skipped);
    info!("  Errors:  {}", stats.errors.len());
    info!("  Total processed: {}", stats.sold + stats.bid);

    if let Some(path) = &outcome.csv_path {
        info!("  Output: {}", path.display());
    } else {
        warn!("No valid auctions collected; no CSV written");
    }

    for (i, err) in stats.errors.iter().enumerate() {
        error!(
            "  {}. {} -> {}",
            i + 1,
            shorten_url(&err.url),
            first_line(&err.message)
        );
    }
}

/// Keep the tail of long URLs; that is where the listing slug lives.
fn shorten_url(url: &str) -> String {
    const MAX: usize = 60;
    if url.len() > MAX {
        // URLs are ASCII in practice; fall back to the full URL if the
        // cut would land mid-character.
        match url.get(url.len() - (MAX - 3)..) {
            Some(tail) => format!("...{tail}"),
            None => url.to_string(),
        }
    } else {
        url.to_string()
    }
}

fn first_line(message: &str) -> String {
    let line = message.lines().next().unwrap_or_default();
    let mut short: String = line.chars().take(80).collect();
    if line.chars().count() > 80 {
        short.push_str("...");
    }
    short
}
