//! Crawl orchestration: session lifecycle, per-URL processing, crash
//! recovery and rate limiting.

use std::time::Duration;

use anyhow::Result;
use tracing::{error, info, warn};

use crate::browser::{BrowserEngine, PageSession, WebDriverEngine, is_transient};
use crate::config::ScraperConfig;
use crate::export::export_to_csv;
use crate::models::{Auction, RunStats, SaleStatus, ScrapeOutcome, UrlError};
use crate::pages::auction::extract_auction;
use crate::pages::results::{CollectOptions, collect_auction_urls};
use crate::transform::{is_valid, should_include, transform};

/// Recreate the browsing session after this many extracted pages to
/// cap memory growth in long runs.
const SESSION_REFRESH_INTERVAL: u32 = 50;

/// Main scraper for Bring a Trailer completed auctions.
pub struct BatScraper {
    config: ScraperConfig,
    engine: Box<dyn BrowserEngine>,
}

/// The one live page plus the refresh bookkeeping that travels with it.
/// Replaced wholesale by [`BatScraper::refresh_session`].
struct SessionState {
    page: Box<dyn PageSession>,
    pages_since_refresh: u32,
}

/// Outcome of processing a single auction URL.
enum Visit {
    Kept(Auction),
    SkippedStatus {
        status: SaleStatus,
        title: Option<String>,
    },
    Incomplete,
}

impl BatScraper {
    /// Create a scraper backed by a real WebDriver browser.
    pub async fn new(config: ScraperConfig) -> Result<Self> {
        info!("Starting BaT scraper");
        info!("  Headless: {}", config.headless);
        info!("  Target auctions: {}", config.auction_count);

        let engine = WebDriverEngine::launch(&config).await?;
        Ok(Self::with_engine(config, Box::new(engine)))
    }

    /// Create a scraper on top of any browsing backend.
    pub fn with_engine(config: ScraperConfig, engine: Box<dyn BrowserEngine>) -> Self {
        Self { config, engine }
    }

    /// Run the crawl to completion. The browsing session and engine are
    /// torn down on every exit path, including a failure to create the
    /// session in the first place.
    pub async fn run(mut self) -> Result<ScrapeOutcome> {
        let result = match self.engine.new_session().await {
            Ok(page) => {
                let mut session = SessionState {
                    page,
                    pages_since_refresh: 0,
                };
                let result = self.crawl(&mut session).await;
                if let Err(e) = session.page.close().await {
                    warn!("Ignoring page close failure: {e:#}");
                }
                result
            }
            Err(e) => Err(e),
        };

        if let Err(e) = self.engine.shutdown().await {
            warn!("Ignoring engine shutdown failure: {e:#}");
        }
        info!("Browser closed");

        result
    }

    async fn crawl(&mut self, session: &mut SessionState) -> Result<ScrapeOutcome> {
        let options = CollectOptions {
            debug_screenshots: self.config.debug_screenshots,
            output_dir: &self.config.output_dir,
        };
        let urls = collect_auction_urls(
            session.page.as_mut(),
            self.config.auction_count,
            &options,
        )
        .await?;

        let mut auctions = Vec::new();
        let mut stats = RunStats::default();

        for (i, url) in urls.iter().enumerate() {
            info!("Processing auction {}/{}", i + 1, urls.len());

            if session.pages_since_refresh >= SESSION_REFRESH_INTERVAL {
                info!("Refreshing browser session");
                self.refresh_session(session).await?;
            }

            let outcome = match visit(session, url).await {
                Ok(visit) => Ok(visit),
                Err(e) if is_transient(&e) => {
                    error!("Page crashed, attempting recovery: {e:#}");
                    self.refresh_session(session).await?;
                    visit(session, url).await
                }
                Err(e) => Err(e),
            };

            match outcome {
                Ok(Visit::Kept(auction)) => {
                    match auction.status {
                        SaleStatus::Sold => stats.sold += 1,
                        _ => stats.bid += 1,
                    }
                    info!("[{}] {}", auction.status.as_str().to_uppercase(), auction.title);
                    auctions.push(auction);
                }
                Ok(Visit::SkippedStatus { status, title }) => {
                    info!(
                        "Skipped ({}): {}",
                        status.as_str(),
                        title.as_deref().unwrap_or(url)
                    );
                    stats.skipped += 1;
                    // Nothing was worth keeping; move straight on
                    // without the between-pages delay.
                    continue;
                }
                Ok(Visit::Incomplete) => {
                    warn!("Skipped (incomplete data): {url}");
                    stats.skipped += 1;
                }
                Err(e) => {
                    error!("Failed to process {url}: {e:#}");
                    stats.errors.push(UrlError {
                        url: url.clone(),
                        message: format!("{e:#}"),
                    });
                    continue;
                }
            }

            if i + 1 < urls.len() {
                tokio::time::sleep(Duration::from_millis(self.config.delay_between_pages_ms))
                    .await;
            }
        }

        let csv_path = if auctions.is_empty() {
            None
        } else {
            Some(export_to_csv(&auctions, &self.config.output_dir)?)
        };

        Ok(ScrapeOutcome {
            auctions,
            stats,
            csv_path,
        })
    }

    /// Replace the page handle and reset the refresh counter in one go.
    async fn refresh_session(&mut self, session: &mut SessionState) -> Result<()> {
        if let Err(e) = session.page.close().await {
            warn!("Ignoring stale page close failure: {e:#}");
        }
        session.page = self.engine.new_session().await?;
        session.pages_since_refresh = 0;
        Ok(())
    }
}

/// Extract, include-check, transform and validate one auction URL.
async fn visit(session: &mut SessionState, url: &str) -> Result<Visit> {
    let raw = extract_auction(session.page.as_mut(), url).await?;
    session.pages_since_refresh += 1;

    if !should_include(&raw) {
        return Ok(Visit::SkippedStatus {
            status: raw.sale_info.status,
            title: raw.title,
        });
    }

    let auction = transform(raw);
    if !is_valid(&auction) {
        return Ok(Visit::Incomplete);
    }

    Ok(Visit::Kept(auction))
}
