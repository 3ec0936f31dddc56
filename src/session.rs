//! Abstraction over the browser session used by the account walk.
//!
//! The walk only needs a handful of page operations, so they live behind a
//! trait: the real implementation is [`crate::browser::CdpSession`], and
//! [`crate::testing::MockPortal`] exercises the walk without a browser.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// One scraped subscription card: its title text plus the texts probed for
/// expiry information.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardScan {
    /// Text of the card's title element, if one was found.
    pub title: Option<String>,
    /// Texts of the card's generic body elements (primary expiry probe).
    pub body_texts: Vec<String>,
    /// Text of the card's dedicated expiry field (fallback probe).
    pub expiry_field: Option<String>,
}

/// Browser operations the account walk is written against.
#[async_trait]
pub trait PortalSession: Send + Sync {
    /// Navigates the page to `url`.
    async fn goto(&self, url: &str) -> Result<()>;

    /// Waits until an element matching `selector` is present, polling up to
    /// `timeout`. Returns [`crate::error::CheckError::Timeout`] on expiry.
    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<()>;

    /// Single presence probe without waiting.
    async fn is_present(&self, selector: &str) -> bool;

    /// Types `text` into the first element matching `selector`.
    async fn fill(&self, selector: &str, text: &str) -> Result<()>;

    /// Clicks the first element matching `selector`.
    async fn click(&self, selector: &str) -> Result<()>;

    /// Returns the current page URL.
    async fn current_url(&self) -> Result<String>;

    /// Writes a full-page PNG screenshot to `path`.
    async fn save_screenshot(&self, path: &Path) -> Result<()>;

    /// Scrapes all subscription cards currently on the page, in DOM order.
    async fn scan_cards(&self) -> Result<Vec<CardScan>>;

    /// Closes the session and releases the browser.
    async fn close(self: Box<Self>) -> Result<()>;
}
