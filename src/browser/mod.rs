//! Browsing capability used by the crawl loop.
//!
//! The orchestrator and page handlers only speak to these traits; the
//! WebDriver-backed implementation lives in [`webdriver`]. Keeping the
//! seam here lets the pagination and retry logic run against fakes in
//! tests.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

pub mod webdriver;

pub use webdriver::WebDriverEngine;

/// Error-message fragments that indicate the page or session died under
/// us rather than the site misbehaving. "crashed" covers tab crashes,
/// "navigation" covers goto timeouts and WebDriver navigation failures.
pub const TRANSIENT_ERROR_MARKERS: &[&str] = &["crashed", "navigation"];

/// Classify a per-URL failure: transient failures earn one session
/// recreation and retry, everything else is recorded immediately.
pub fn is_transient(err: &anyhow::Error) -> bool {
    let message = format!("{err:#}").to_lowercase();
    TRANSIENT_ERROR_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
}

/// One live page within a browsing session.
///
/// Exactly one page exists at a time and it is exclusively owned by the
/// orchestrator, so all operations take `&mut self`.
#[async_trait]
pub trait PageSession: Send {
    /// Navigate to a URL with a bounded timeout.
    async fn goto(&mut self, url: &str) -> Result<()>;

    /// Wait for at least one element matching `css` to be attached.
    /// Returns `Ok(false)` on timeout; the caller decides whether that
    /// matters.
    async fn wait_for_selector(&mut self, css: &str, timeout: Duration) -> Result<bool>;

    /// Rendered page source for the current document.
    async fn content(&mut self) -> Result<String>;

    async fn scroll_to(&mut self, y: u32) -> Result<()>;

    async fn scroll_to_bottom(&mut self) -> Result<()>;

    /// Current document height, used to detect lazy-loaded content.
    async fn page_height(&mut self) -> Result<i64>;

    /// Click the first element matching `css` if it shows up within
    /// `timeout` and is interactable. Returns whether a click happened.
    async fn click_if_visible(&mut self, css: &str, timeout: Duration) -> Result<bool>;

    /// Capture a screenshot of the current page to `path`.
    async fn screenshot(&mut self, path: &Path) -> Result<()>;

    /// Tear down the page. Callers suppress errors from this.
    async fn close(&mut self) -> Result<()>;
}

/// Factory for page sessions, plus engine-wide teardown.
#[async_trait]
pub trait BrowserEngine: Send {
    async fn new_session(&mut self) -> Result<Box<dyn PageSession>>;

    async fn shutdown(&mut self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn crash_messages_are_transient() {
        assert!(is_transient(&anyhow!("browser tab crashed unexpectedly")));
        assert!(is_transient(&anyhow!("navigation timed out after 60s")));
    }

    #[test]
    fn context_chain_is_searched() {
        let err = anyhow!("tab crashed").context("extracting https://example.com/listing");
        assert!(is_transient(&err));
    }

    #[test]
    fn ordinary_failures_are_not_transient() {
        assert!(!is_transient(&anyhow!("selector matched nothing")));
        assert!(!is_transient(&anyhow!("connection refused")));
    }
}
