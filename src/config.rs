//! Scraper configuration sourced from environment variables

use std::env;
use std::path::PathBuf;

/// Runtime configuration for a scrape run.
///
/// Environment variables:
/// - `AUCTION_COUNT` - number of auctions to scrape (default 3)
/// - `HEADLESS` - set to "false" to run with a visible browser window
/// - `DELAY_MS` - delay between detail-page visits in milliseconds (default 1500)
/// - `OUTPUT_DIR` - destination directory for CSV files (default "./output")
/// - `DEBUG_SCREENSHOTS` - set to "true" to capture screenshots when pagination stalls
/// - `WEBDRIVER_URL` - existing WebDriver endpoint; when unset a local
///   geckodriver is spawned on the default port
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub auction_count: usize,
    pub headless: bool,
    pub delay_between_pages_ms: u64,
    pub output_dir: PathBuf,
    pub debug_screenshots: bool,
    pub webdriver_url: String,
    pub spawn_driver: bool,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            auction_count: 3,
            headless: true,
            delay_between_pages_ms: 1500,
            output_dir: PathBuf::from("./output"),
            debug_screenshots: false,
            webdriver_url: "http://localhost:4444".to_string(),
            spawn_driver: true,
        }
    }
}

impl ScraperConfig {
    /// Build a configuration from the environment, falling back to
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let auction_count = env::var("AUCTION_COUNT")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|&n| n > 0)
            .unwrap_or(defaults.auction_count);

        let headless = env::var("HEADLESS").map_or(defaults.headless, |v| v != "false");

        let delay_between_pages_ms = env::var("DELAY_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.delay_between_pages_ms);

        let output_dir = env::var("OUTPUT_DIR").map_or(defaults.output_dir, PathBuf::from);

        let debug_screenshots = env::var("DEBUG_SCREENSHOTS").is_ok_and(|v| v == "true");

        // An explicit endpoint means someone else manages the driver process.
        let (webdriver_url, spawn_driver) = match env::var("WEBDRIVER_URL") {
            Ok(url) => (url, false),
            Err(_) => (defaults.webdriver_url, true),
        };

        Self {
            auction_count,
            headless,
            delay_between_pages_ms,
            output_dir,
            debug_screenshots,
            webdriver_url,
            spawn_driver,
        }
    }
}
