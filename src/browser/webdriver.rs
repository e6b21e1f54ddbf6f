//! WebDriver-backed browsing session via fantoccini and geckodriver.

use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::json;
use tracing::{debug, info};

use super::{BrowserEngine, PageSession};
use crate::config::ScraperConfig;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(60);

/// How long to give a freshly spawned geckodriver before connecting.
const DRIVER_STARTUP_WAIT: Duration = Duration::from_millis(500);

/// Engine that owns an optional local geckodriver process and hands out
/// fantoccini sessions against it.
pub struct WebDriverEngine {
    webdriver_url: String,
    headless: bool,
    driver: Option<Child>,
}

impl WebDriverEngine {
    /// Launch the engine. Spawns a local geckodriver unless the
    /// configuration points at an externally managed endpoint.
    pub async fn launch(config: &ScraperConfig) -> Result<Self> {
        let driver = if config.spawn_driver {
            info!("Starting geckodriver");
            let child = Command::new("geckodriver")
                .arg("--port")
                .arg("4444")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()
                .context("failed to spawn geckodriver; is it on PATH?")?;
            tokio::time::sleep(DRIVER_STARTUP_WAIT).await;
            Some(child)
        } else {
            info!("Using external WebDriver at {}", config.webdriver_url);
            None
        };

        Ok(Self {
            webdriver_url: config.webdriver_url.clone(),
            headless: config.headless,
            driver,
        })
    }
}

#[async_trait]
impl BrowserEngine for WebDriverEngine {
    async fn new_session(&mut self) -> Result<Box<dyn PageSession>> {
        let mut firefox = json!({
            "prefs": { "general.useragent.override": USER_AGENT }
        });
        if self.headless {
            firefox["args"] = json!(["-headless"]);
        }

        let mut caps = serde_json::map::Map::new();
        caps.insert("moz:firefoxOptions".to_string(), firefox);

        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(&self.webdriver_url)
            .await
            .with_context(|| format!("failed to connect to WebDriver at {}", self.webdriver_url))?;

        debug!("New browser session created");
        Ok(Box::new(WebDriverPage {
            client: Some(client),
        }))
    }

    async fn shutdown(&mut self) -> Result<()> {
        if let Some(mut child) = self.driver.take() {
            info!("Stopping geckodriver");
            let _ = child.kill();
            let _ = child.wait();
        }
        Ok(())
    }
}

/// A single fantoccini-driven page.
pub struct WebDriverPage {
    client: Option<Client>,
}

impl WebDriverPage {
    fn client(&mut self) -> Result<&mut Client> {
        self.client
            .as_mut()
            .ok_or_else(|| anyhow!("browser session already closed"))
    }
}

#[async_trait]
impl PageSession for WebDriverPage {
    async fn goto(&mut self, url: &str) -> Result<()> {
        let client = self.client()?;
        match tokio::time::timeout(NAVIGATION_TIMEOUT, client.goto(url)).await {
            Ok(result) => result.with_context(|| format!("navigation failed for {url}")),
            Err(_) => Err(anyhow!(
                "navigation timed out after {}s for {url}",
                NAVIGATION_TIMEOUT.as_secs()
            )),
        }
    }

    async fn wait_for_selector(&mut self, css: &str, timeout: Duration) -> Result<bool> {
        let client = self.client()?;
        let found = client
            .wait()
            .at_most(timeout)
            .for_element(Locator::Css(css))
            .await
            .is_ok();
        if !found {
            debug!("Timed out waiting for selector: {css}");
        }
        Ok(found)
    }

    async fn content(&mut self) -> Result<String> {
        self.client()?
            .source()
            .await
            .context("failed to read page source")
    }

    async fn scroll_to(&mut self, y: u32) -> Result<()> {
        self.client()?
            .execute("window.scrollTo(0, arguments[0]);", vec![json!(y)])
            .await
            .context("scroll failed")?;
        Ok(())
    }

    async fn scroll_to_bottom(&mut self) -> Result<()> {
        self.client()?
            .execute("window.scrollTo(0, document.body.scrollHeight);", vec![])
            .await
            .context("scroll to bottom failed")?;
        Ok(())
    }

    async fn page_height(&mut self) -> Result<i64> {
        let value = self
            .client()?
            .execute("return document.body.scrollHeight;", vec![])
            .await
            .context("failed to read page height")?;
        value
            .as_i64()
            .ok_or_else(|| anyhow!("page height was not a number: {value}"))
    }

    async fn click_if_visible(&mut self, css: &str, timeout: Duration) -> Result<bool> {
        let client = self.client()?;
        let element = match client
            .wait()
            .at_most(timeout)
            .for_element(Locator::Css(css))
            .await
        {
            Ok(element) => element,
            Err(_) => return Ok(false),
        };
        match element.click().await {
            Ok(()) => Ok(true),
            Err(e) => {
                debug!("Click on {css} failed: {e}");
                Ok(false)
            }
        }
    }

    async fn screenshot(&mut self, path: &Path) -> Result<()> {
        let png = self
            .client()?
            .screenshot()
            .await
            .context("screenshot failed")?;
        std::fs::write(path, png)
            .with_context(|| format!("failed to write screenshot to {}", path.display()))?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(client) = self.client.take() {
            client.close().await.context("failed to close session")?;
        }
        Ok(())
    }
}
