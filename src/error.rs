use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CheckError>;

#[derive(Debug, Error)]
pub enum CheckError {
    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("navigation failed: {url}")]
    Navigation {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("timeout after {ms}ms waiting for: {condition}")]
    Timeout { ms: u64, condition: String },

    #[error("element not found: {selector}")]
    ElementNotFound { selector: String },

    #[error("screenshot failed: {path}")]
    Screenshot {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("notification delivery failed: {0}")]
    Notify(String),

    #[error(transparent)]
    Cdp(#[from] chromiumoxide::error::CdpError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CheckError {
    /// True for the bounded-wait expiry of a walk state.
    pub fn is_timeout(&self) -> bool {
        matches!(self, CheckError::Timeout { .. })
    }
}
