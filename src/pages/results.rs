//! URL collection from the completed-auction results listing.
//!
//! The results page lazy-loads listing cards as you scroll and falls
//! back to a "Show More" button once scrolling stops helping. Collection
//! keeps triggering more content until the target count is met, the
//! page has nothing more to give, or the attempt bound trips.

use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{Result, anyhow};
use chrono::Local;
use scraper::{Html, Selector};
use tracing::{info, warn};

use crate::browser::PageSession;

pub const RESULTS_URL: &str =
    "https://bringatrailer.com/auctions/results/?location=US&timeFrame=1Y&result=sold&bidTo=100000";

const LISTING_CARD_CSS: &str = ".auctions-container a.listing-card";
const SHOW_MORE_CSS: &str = "button.auctions-footer-button";

/// Offset that puts the viewport past the hero section, where the
/// completed-auctions grid starts rendering.
const COMPLETED_SECTION_OFFSET: u32 = 1500;

const INITIAL_CARD_WAIT: Duration = Duration::from_secs(30);
const CARD_WAIT: Duration = Duration::from_secs(10);
const SHOW_MORE_WAIT: Duration = Duration::from_secs(2);
const SCROLL_SETTLE_MS: u64 = 1000;
const CLICK_SETTLE_MS: u64 = 1500;

/// Upper bound on load-more attempts so collection terminates even if
/// the page keeps re-rendering the same cards without growing.
const MAX_LOAD_ATTEMPTS: u32 = 60;

static LISTING_CARD: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(LISTING_CARD_CSS).expect("valid selector"));

/// Options that only matter when pagination goes wrong.
#[derive(Debug, Clone)]
pub struct CollectOptions<'a> {
    pub debug_screenshots: bool,
    pub output_dir: &'a Path,
}

/// Navigate to the results listing and collect up to `count` distinct
/// auction URLs, in the order the page presents them.
///
/// Running out of content before `count` is reached is not an error;
/// the caller observes it via the returned length.
pub async fn collect_auction_urls(
    page: &mut dyn PageSession,
    count: usize,
    options: &CollectOptions<'_>,
) -> Result<Vec<String>> {
    info!("Navigating to auction results");
    page.goto(RESULTS_URL).await?;

    if !page.wait_for_selector(LISTING_CARD_CSS, INITIAL_CARD_WAIT).await? {
        return Err(anyhow!("results page never rendered any listing cards"));
    }

    page.scroll_to(COMPLETED_SECTION_OFFSET).await?;
    tokio::time::sleep(Duration::from_millis(SCROLL_SETTLE_MS)).await;
    info!("Scrolled down to the completed auctions section");

    let mut urls = Vec::new();
    let mut seen = HashSet::new();
    let mut attempts = 0;

    while urls.len() < count {
        if !page.wait_for_selector(LISTING_CARD_CSS, CARD_WAIT).await? {
            warn!("Listing cards never appeared; aborting collection");
            break;
        }

        let html = page.content().await?;
        for url in listing_card_urls(&html) {
            if urls.len() >= count {
                break;
            }
            if seen.insert(url.clone()) {
                urls.push(url);
            }
        }

        if urls.len() >= count {
            break;
        }

        attempts += 1;
        if attempts > MAX_LOAD_ATTEMPTS {
            warn!("Gave up loading more auctions after {MAX_LOAD_ATTEMPTS} attempts");
            break;
        }

        if !load_more_auctions(page, options).await? {
            warn!("No more auctions to load; collected {} URLs", urls.len());
            break;
        }
    }

    info!("Collected {} auction URLs", urls.len());
    urls.truncate(count);
    Ok(urls)
}

/// Hrefs of all currently rendered listing cards.
fn listing_card_urls(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    doc.select(&LISTING_CARD)
        .filter_map(|card| card.value().attr("href"))
        .map(|href| {
            if href.starts_with("http") {
                href.to_string()
            } else {
                format!("https://bringatrailer.com{href}")
            }
        })
        .collect()
}

/// Try to make the page render more listing cards, first by scrolling,
/// then via the "Show More" button. Returns whether more content was
/// (probably) loaded.
async fn load_more_auctions(
    page: &mut dyn PageSession,
    options: &CollectOptions<'_>,
) -> Result<bool> {
    let previous_height = page.page_height().await?;
    page.scroll_to_bottom().await?;
    tokio::time::sleep(Duration::from_millis(SCROLL_SETTLE_MS)).await;

    if page.page_height().await? > previous_height {
        return Ok(true);
    }

    if page.click_if_visible(SHOW_MORE_CSS, SHOW_MORE_WAIT).await? {
        tokio::time::sleep(Duration::from_millis(CLICK_SETTLE_MS)).await;
        return Ok(true);
    }

    if options.debug_screenshots {
        let stamp = Local::now().format("%Y-%m-%dT%H-%M-%S");
        let path = options.output_dir.join(format!("debug-no-show-more-{stamp}.png"));
        if let Err(e) = page.screenshot(&path).await {
            warn!("Debug screenshot failed: {e:#}");
        } else {
            info!("Screenshot saved: {}", path.display());
        }
    }

    Ok(false)
}
