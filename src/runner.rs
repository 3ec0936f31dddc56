//! Run orchestrator: credentials in, one sequential walk per account, one
//! aggregated notification out. Nothing here aborts the run; every failure
//! is scoped to its account and reported.

use std::time::Duration;

use tracing::{error, info, warn};

use crate::accounts;
use crate::browser::{BrowserOptions, CdpSession};
use crate::cli::Cli;
use crate::notify::{Notifier, Notify};
use crate::report::Report;
use crate::walk::{self, WalkOptions};

pub const ACCOUNTS_ENV: &str = "MS_E5_ACCOUNTS";
const REPORT_TITLE: &str = "Microsoft 365 subscription expiry check";

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Raw credential string; falls back to [`ACCOUNTS_ENV`] when `None`.
    pub accounts: Option<String>,
    pub walk: WalkOptions,
    pub browser: BrowserOptions,
    /// Inter-account pacing bounds (jitter against abuse detection).
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl From<Cli> for RunOptions {
    fn from(cli: Cli) -> Self {
        Self {
            accounts: cli.accounts,
            walk: WalkOptions {
                target: cli.target,
                element_timeout: Duration::from_secs(cli.timeout_secs),
                kmsi_timeout: Duration::from_secs(cli.kmsi_timeout_secs),
                screenshot_dir: cli.screenshot_dir,
                paced: true,
            },
            browser: BrowserOptions {
                headful: cli.headful,
            },
            min_delay: Duration::from_secs(cli.min_delay_secs),
            max_delay: Duration::from_secs(cli.max_delay_secs),
        }
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            accounts: None,
            walk: WalkOptions::default(),
            browser: BrowserOptions::default(),
            min_delay: Duration::from_secs(20),
            max_delay: Duration::from_secs(40),
        }
    }
}

/// Runs the whole check with the environment-configured notifier. Never
/// returns an error: failures are communicated through log lines and the
/// notification payload.
pub async fn run(options: RunOptions) {
    run_with(options, &Notifier::from_env()).await;
}

/// [`run`] with an explicit notification collaborator.
pub async fn run_with(options: RunOptions, notifier: &dyn Notify) {
    let raw = options
        .accounts
        .clone()
        .or_else(|| std::env::var(ACCOUNTS_ENV).ok())
        .unwrap_or_default();
    if raw.trim().is_empty() {
        error!(
            target = "e5check",
            "no accounts configured, set {ACCOUNTS_ENV} (email-password&email2-password2...)"
        );
        deliver(
            notifier,
            &format!("configuration error: {ACCOUNTS_ENV} is missing or empty"),
        )
        .await;
        return;
    }

    let parsed = accounts::parse_accounts(&raw);
    info!(
        target = "e5check",
        valid = parsed.accounts.len(),
        seen = parsed.total_seen,
        "accounts parsed"
    );

    let mut report = Report::new();
    if parsed.accounts.is_empty() {
        report.error(format!(
            "no valid account entries among {} configured",
            parsed.total_seen
        ));
    }

    let last = parsed.accounts.len().saturating_sub(1);
    for (index, account) in parsed.accounts.iter().enumerate() {
        info!(target = "e5check", account = %account.email, "starting check");

        match CdpSession::launch(&options.browser).await {
            Ok(session) => {
                let account_report =
                    walk::check_account(Box::new(session), account, &options.walk).await;
                report.extend(account_report);
            }
            Err(err) => {
                // Terminal for this account only.
                error!(target = "e5check", account = %account.email, error = %err, "browser launch failed");
                report.push(format!("checking account: {}", account.email));
                report.error(format!("browser session could not be started: {err}"));
                report.push(format!("check complete: {}", account.email));
            }
        }

        if index < last {
            let delay = jitter(options.min_delay, options.max_delay);
            info!(
                target = "e5check",
                secs = delay.as_secs(),
                "pausing before next account"
            );
            tokio::time::sleep(delay).await;
        }
    }

    let body = report.render();
    println!("{body}");
    deliver(notifier, &body).await;
}

async fn deliver(notifier: &dyn Notify, body: &str) {
    if let Err(err) = notifier.send(REPORT_TITLE, body).await {
        warn!(target = "e5check", error = %err, "notification delivery failed");
    }
}

/// Uniform random duration in `[min, max]`; degenerate bounds collapse to
/// `min`.
fn jitter(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    min + Duration::from_secs_f64(fastrand::f64() * (max - min).as_secs_f64())
}
