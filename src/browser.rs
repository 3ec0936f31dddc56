//! Chromium-backed [`PortalSession`] over CDP.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::element::Element;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{CheckError, Result};
use crate::portal;
use crate::session::{CardScan, PortalSession};

/// Fixed identification string; the login flow serves a degraded page to
/// obviously-headless agents.
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/100.0.4896.127 Safari/537.36";

const POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Default)]
pub struct BrowserOptions {
    /// Run with a visible browser window (local debugging).
    pub headful: bool,
}

/// One browser instance with a single page, scoped to one account check.
pub struct CdpSession {
    browser: Browser,
    page: Page,
    event_task: JoinHandle<()>,
}

impl CdpSession {
    /// Launches a Chrome instance configured for unattended operation.
    pub async fn launch(options: &BrowserOptions) -> Result<Self> {
        let mut config = BrowserConfig::builder()
            .no_sandbox()
            .window_size(1920, 1080)
            .arg("--disable-dev-shm-usage")
            .arg(format!("--user-agent={USER_AGENT}"));
        if options.headful {
            config = config.with_head();
        }
        let config = config.build().map_err(CheckError::Launch)?;

        debug!(target = "e5check", "launching browser...");
        let (browser, mut events) = Browser::launch(config)
            .await
            .map_err(|err| CheckError::Launch(err.to_string()))?;

        // Drain CDP events for the lifetime of the session.
        let event_task = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser.new_page("about:blank").await?;
        debug!(target = "e5check", "browser session started");

        Ok(Self {
            browser,
            page,
            event_task,
        })
    }

    async fn find(&self, selector: &str) -> Result<Element> {
        self.page
            .find_element(selector)
            .await
            .map_err(|_| CheckError::ElementNotFound {
                selector: selector.to_string(),
            })
    }
}

#[async_trait]
impl PortalSession for CdpSession {
    async fn goto(&self, url: &str) -> Result<()> {
        self.page
            .goto(url)
            .await
            .map(|_| ())
            .map_err(|err| CheckError::Navigation {
                url: url.to_string(),
                source: anyhow::Error::new(err),
            })
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.page.find_element(selector).await.is_ok() {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(CheckError::Timeout {
                    ms: timeout.as_millis() as u64,
                    condition: selector.to_string(),
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn is_present(&self, selector: &str) -> bool {
        self.page.find_element(selector).await.is_ok()
    }

    async fn fill(&self, selector: &str, text: &str) -> Result<()> {
        let element = self.find(selector).await?;
        element.click().await?;
        element.type_str(text).await?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.find(selector).await?.click().await?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn save_screenshot(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(true)
            .build();

        self.page
            .save_screenshot(params, path)
            .await
            .map(|_| ())
            .map_err(|err| CheckError::Screenshot {
                path: path.to_path_buf(),
                source: anyhow::Error::new(err),
            })
    }

    async fn scan_cards(&self) -> Result<Vec<CardScan>> {
        // A failure here is a torn-down page, not an empty listing; let the
        // walk surface it instead of reporting a clean miss.
        let elements = self.page.find_elements(portal::CARD).await?;

        let mut cards = Vec::with_capacity(elements.len());
        for element in &elements {
            cards.push(CardScan {
                title: child_text(element, portal::CARD_TITLE).await,
                body_texts: child_texts(element, portal::CARD_TEXT).await,
                expiry_field: child_text(element, portal::CARD_EXPIRY_FIELD).await,
            });
        }
        Ok(cards)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let CdpSession {
            mut browser,
            page: _,
            event_task,
        } = *self;

        if let Err(err) = browser.close().await {
            warn!(target = "e5check", error = %err, "browser close failed, killing process");
            let _ = browser.kill().await;
        } else {
            let _ = browser.wait().await;
        }
        event_task.abort();
        debug!(target = "e5check", "browser session terminated");
        Ok(())
    }
}

async fn child_text(parent: &Element, selector: &str) -> Option<String> {
    let child = parent.find_element(selector).await.ok()?;
    child
        .inner_text()
        .await
        .ok()
        .flatten()
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

async fn child_texts(parent: &Element, selector: &str) -> Vec<String> {
    let mut texts = Vec::new();
    for child in parent.find_elements(selector).await.unwrap_or_default() {
        if let Ok(Some(text)) = child.inner_text().await {
            let text = text.trim();
            if !text.is_empty() {
                texts.push(text.to_string());
            }
        }
    }
    texts
}
