//! Notification delivery.
//!
//! Resolution order: PushPlus token, generic JSON webhook, stdout fallback.
//! Delivery problems never fail the run; the orchestrator logs and moves on.

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::error::{CheckError, Result};

const PUSHPLUS_ENDPOINT: &str = "https://www.pushplus.plus/send";

pub const PUSHPLUS_TOKEN_ENV: &str = "PUSH_PLUS_TOKEN";
pub const WEBHOOK_ENV: &str = "E5CHECK_WEBHOOK";

/// The out-of-band `send(title, body)` contract the orchestrator is written
/// against; [`crate::testing::MockNotifier`] records deliveries for tests.
#[async_trait]
pub trait Notify: Send + Sync {
    async fn send(&self, title: &str, body: &str) -> Result<()>;
}

/// The configured delivery channel.
pub enum Notifier {
    PushPlus { token: String },
    Webhook { url: String },
    /// No channel configured: print the title and body to stdout.
    Stdout,
}

#[derive(Serialize)]
struct PushPlusPayload<'a> {
    token: &'a str,
    title: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    title: &'a str,
    body: &'a str,
}

impl Notifier {
    /// Picks a channel from the environment.
    pub fn from_env() -> Self {
        if let Ok(token) = std::env::var(PUSHPLUS_TOKEN_ENV) {
            if !token.trim().is_empty() {
                return Notifier::PushPlus { token };
            }
        }
        if let Ok(url) = std::env::var(WEBHOOK_ENV) {
            if !url.trim().is_empty() {
                return Notifier::Webhook { url };
            }
        }
        debug!(
            target = "e5check",
            "no notification channel configured, will print to stdout"
        );
        Notifier::Stdout
    }
}

#[async_trait]
impl Notify for Notifier {
    async fn send(&self, title: &str, body: &str) -> Result<()> {
        match self {
            Notifier::PushPlus { token } => {
                post_json(
                    PUSHPLUS_ENDPOINT,
                    &PushPlusPayload {
                        token,
                        title,
                        content: body,
                    },
                )
                .await
            }
            Notifier::Webhook { url } => post_json(url, &WebhookPayload { title, body }).await,
            Notifier::Stdout => {
                println!("--- {title} ---");
                println!("{body}");
                println!("--- end notification ---");
                Ok(())
            }
        }
    }
}

async fn post_json<T: Serialize>(url: &str, payload: &T) -> Result<()> {
    let client = reqwest::Client::new();
    let response = client
        .post(url)
        .json(payload)
        .send()
        .await
        .map_err(|err| CheckError::Notify(err.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(CheckError::Notify(format!("{url} returned {status}")));
    }
    debug!(target = "e5check", %url, "notification delivered");
    Ok(())
}
