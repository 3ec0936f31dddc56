//! Mock portal session for exercising the account walk without a browser.
//!
//! Configure failures with the `with_*` builders, run the walk, then assert
//! on the recorded [`MockAction`] sequence and teardown count via the shared
//! [`MockState`] handle (which outlives the consumed session).
//!
//! # Example
//!
//! ```
//! use e5check::testing::MockPortal;
//!
//! let portal = MockPortal::new().with_missing("#i0116");
//! let state = portal.state();
//! // ... run the walk against `portal`, then:
//! // assert_eq!(state.close_count(), 1);
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{CheckError, Result};
use crate::notify::Notify;
use crate::session::{CardScan, PortalSession};

/// Action recorded by [`MockPortal`] for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockAction {
    Goto { url: String },
    WaitFor { selector: String },
    IsPresent { selector: String },
    Fill { selector: String, text: String },
    Click { selector: String },
    Screenshot { path: PathBuf },
    ScanCards,
    Close,
}

/// Shared record of everything a [`MockPortal`] did.
#[derive(Debug, Default)]
pub struct MockState {
    actions: Mutex<Vec<MockAction>>,
    close_count: Mutex<usize>,
}

impl MockState {
    /// All recorded actions, in order.
    pub fn actions(&self) -> Vec<MockAction> {
        self.actions.lock().unwrap().clone()
    }

    /// How many times the session was closed. The walk must make this
    /// exactly one on every path.
    pub fn close_count(&self) -> usize {
        *self.close_count.lock().unwrap()
    }

    fn record(&self, action: MockAction) {
        self.actions.lock().unwrap().push(action);
    }
}

/// Scriptable [`PortalSession`] double.
#[derive(Default)]
pub struct MockPortal {
    state: Arc<MockState>,
    /// Selectors whose waits time out and whose fill/click fail.
    missing: HashSet<String>,
    /// Selectors whose waits succeed but whose clicks fail.
    click_failing: HashSet<String>,
    /// Selectors reported present by the single-probe `is_present`.
    present: HashSet<String>,
    url: String,
    cards: Vec<CardScan>,
    scan_failing: bool,
}

impl MockPortal {
    pub fn new() -> Self {
        Self {
            url: "about:blank".to_string(),
            ..Self::default()
        }
    }

    /// Makes waits on `selector` time out and interactions with it fail.
    pub fn with_missing(mut self, selector: &str) -> Self {
        self.missing.insert(selector.to_string());
        self
    }

    /// Makes waits on `selector` succeed but clicks on it fail, like a
    /// button that is in the DOM yet refuses interaction.
    pub fn with_click_failing(mut self, selector: &str) -> Self {
        self.click_failing.insert(selector.to_string());
        self
    }

    /// Makes `scan_cards` fail, like a page torn down mid-scrape.
    pub fn with_scan_failing(mut self) -> Self {
        self.scan_failing = true;
        self
    }

    /// Makes the single-probe `is_present` report `selector` as displayed.
    pub fn with_present(mut self, selector: &str) -> Self {
        self.present.insert(selector.to_string());
        self
    }

    /// Sets the URL reported by `current_url`.
    pub fn with_url(mut self, url: &str) -> Self {
        self.url = url.to_string();
        self
    }

    /// Sets the cards returned by `scan_cards`.
    pub fn with_cards(mut self, cards: Vec<CardScan>) -> Self {
        self.cards = cards;
        self
    }

    /// Handle to the recorded state; stays valid after `close()` consumes
    /// the session.
    pub fn state(&self) -> Arc<MockState> {
        Arc::clone(&self.state)
    }
}

#[async_trait]
impl PortalSession for MockPortal {
    async fn goto(&self, url: &str) -> Result<()> {
        self.state.record(MockAction::Goto {
            url: url.to_string(),
        });
        Ok(())
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<()> {
        self.state.record(MockAction::WaitFor {
            selector: selector.to_string(),
        });
        if self.missing.contains(selector) {
            return Err(CheckError::Timeout {
                ms: timeout.as_millis() as u64,
                condition: selector.to_string(),
            });
        }
        Ok(())
    }

    async fn is_present(&self, selector: &str) -> bool {
        self.state.record(MockAction::IsPresent {
            selector: selector.to_string(),
        });
        self.present.contains(selector)
    }

    async fn fill(&self, selector: &str, text: &str) -> Result<()> {
        self.state.record(MockAction::Fill {
            selector: selector.to_string(),
            text: text.to_string(),
        });
        if self.missing.contains(selector) {
            return Err(CheckError::ElementNotFound {
                selector: selector.to_string(),
            });
        }
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.state.record(MockAction::Click {
            selector: selector.to_string(),
        });
        if self.missing.contains(selector) || self.click_failing.contains(selector) {
            return Err(CheckError::ElementNotFound {
                selector: selector.to_string(),
            });
        }
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.url.clone())
    }

    async fn save_screenshot(&self, path: &Path) -> Result<()> {
        self.state.record(MockAction::Screenshot {
            path: path.to_path_buf(),
        });
        Ok(())
    }

    async fn scan_cards(&self) -> Result<Vec<CardScan>> {
        self.state.record(MockAction::ScanCards);
        if self.scan_failing {
            return Err(CheckError::ElementNotFound {
                selector: crate::portal::CARD.to_string(),
            });
        }
        Ok(self.cards.clone())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.state.record(MockAction::Close);
        *self.state.close_count.lock().unwrap() += 1;
        Ok(())
    }
}

/// Recording [`Notify`] double for orchestrator tests.
#[derive(Default)]
pub struct MockNotifier {
    sent: Mutex<Vec<(String, String)>>,
    failing: bool,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every delivery fail, like an unreachable webhook.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// All `(title, body)` deliveries, in order.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notify for MockNotifier {
    async fn send(&self, title: &str, body: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
        if self.failing {
            return Err(CheckError::Notify("mock delivery failure".to_string()));
        }
        Ok(())
    }
}
