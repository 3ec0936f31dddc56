//! The per-account walk: sign in, dismiss the "stay signed in?" prompt,
//! open the subscriptions listing, and extract the target's expiry text.
//!
//! Every wait is bounded; every timeout or missing element is logged into
//! the account's [`Report`] (usually with a diagnostic screenshot) and ends
//! the walk for that account only. The session is torn down exactly once on
//! every exit path.

use std::path::PathBuf;
use std::time::Duration;

use tracing::{info, warn};

use crate::accounts::Account;
use crate::error::Result;
use crate::portal;
use crate::report::Report;
use crate::session::PortalSession;

/// Tunable knobs for one account walk.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Subscription name to look for (case-sensitive substring).
    pub target: String,
    /// Bounded wait applied to login and navigation elements.
    pub element_timeout: Duration,
    /// Shorter wait for the optional "stay signed in?" prompt.
    pub kmsi_timeout: Duration,
    /// Where diagnostic screenshots are written.
    pub screenshot_dir: PathBuf,
    /// Insert randomized pauses between steps; disabled in tests.
    pub paced: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            target: "Microsoft 365 E5".to_string(),
            element_timeout: Duration::from_secs(45),
            kmsi_timeout: Duration::from_secs(20),
            screenshot_dir: PathBuf::from("."),
            paced: true,
        }
    }
}

/// Outcome of the optional "stay signed in?" interstitial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KmsiOutcome {
    /// The prompt appeared and its "No" button was clicked.
    Handled,
    /// The prompt never appeared within its timeout (normal for tenants
    /// that disable it).
    Absent,
    /// The prompt appeared but could not be dismissed.
    Error,
}

/// Runs the full walk for one account.
///
/// Guarantees exactly one session teardown regardless of where the walk
/// stops, then appends the completion marker line.
pub async fn check_account(
    session: Box<dyn PortalSession>,
    account: &Account,
    options: &WalkOptions,
) -> Report {
    let mut report = Report::new();
    report.push(format!("checking account: {}", account.email));

    if let Err(err) = walk(session.as_ref(), account, options, &mut report).await {
        // Handled failures early-return Ok; anything surfacing here is
        // unexpected and must not take down the rest of the run.
        warn!(target = "e5check", account = %account.email, error = %err, "walk aborted");
        report.error(format!("unexpected error during check: {err}"));
    }

    if let Err(err) = session.close().await {
        warn!(target = "e5check", account = %account.email, error = %err, "session teardown failed");
    }

    report.push(format!("check complete: {}", account.email));
    report
}

async fn walk(
    session: &dyn PortalSession,
    account: &Account,
    options: &WalkOptions,
    report: &mut Report,
) -> Result<()> {
    // --- Navigate to the login page ---
    if let Err(err) = session.goto(portal::LOGIN_URL).await {
        report.error(format!("could not open the login page: {err}"));
        return Ok(());
    }

    // --- Enter email ---
    if let Err(err) = submit_email(session, account, options).await {
        report.error(format!(
            "email input not found or timed out, the page may have changed: {err}"
        ));
        screenshot(session, options, "email_input", &account.email).await;
        return Ok(());
    }
    report.info("entered email, clicked next");

    pause(options, 3.0, 5.0).await;

    // --- Enter password ---
    if let Err(err) = submit_password(session, account, options).await {
        if session.is_present(portal::PASSWORD_INPUT).await {
            report.error("still on the password page, wrong password or stalled sign-in flow");
        } else {
            report.error(format!("password input or sign-in button not found: {err}"));
        }
        screenshot(session, options, "password_input", &account.email).await;
        return Ok(());
    }
    report.info("entered password, clicked sign in");

    // --- Handle "Stay signed in?" ---
    match dismiss_kmsi(session, options).await {
        KmsiOutcome::Handled => report.info("dismissed 'stay signed in?' prompt"),
        KmsiOutcome::Absent => {
            report.info("no 'stay signed in?' prompt within timeout, continuing");
            verify_portal_domain(session, account, options, report).await;
        }
        KmsiOutcome::Error => {
            // The prompt is optional; log, capture state, and continue.
            report.error("could not dismiss the 'stay signed in?' prompt");
            screenshot(session, options, "kmsi_button", &account.email).await;
        }
    }

    // --- Open the subscriptions listing ---
    pause(options, 4.0, 7.0).await;
    if let Err(err) = open_listing(session, options).await {
        report.error(format!(
            "subscriptions page did not render, sign-in failed or the page changed: {err}"
        ));
        screenshot(session, options, "nav_subscriptions", &account.email).await;
        return Ok(());
    }
    report.info("subscriptions page rendered");
    pause(options, 2.0, 4.0).await;

    // --- Locate the target subscription and extract its expiry ---
    if let Err(err) = session.wait_for(portal::CARD, options.element_timeout).await {
        report.error(format!("no subscription cards appeared: {err}"));
        screenshot(session, options, "subscription_cards", &account.email).await;
        return Ok(());
    }

    let cards = session.scan_cards().await?;
    info!(target = "e5check", account = %account.email, cards = cards.len(), "scanned subscription cards");
    match portal::find_expiry(&cards, &options.target) {
        Some(expiry) => report.info(format!("{}: {expiry}", options.target)),
        None => report.info(format!(
            "{}: expiry not found ({} cards scanned)",
            options.target,
            cards.len()
        )),
    }

    Ok(())
}

async fn submit_email(
    session: &dyn PortalSession,
    account: &Account,
    options: &WalkOptions,
) -> Result<()> {
    session
        .wait_for(portal::EMAIL_INPUT, options.element_timeout)
        .await?;
    session.fill(portal::EMAIL_INPUT, &account.email).await?;
    session
        .wait_for(portal::SUBMIT_BUTTON, options.element_timeout)
        .await?;
    session.click(portal::SUBMIT_BUTTON).await
}

async fn submit_password(
    session: &dyn PortalSession,
    account: &Account,
    options: &WalkOptions,
) -> Result<()> {
    session
        .wait_for(portal::PASSWORD_INPUT, options.element_timeout)
        .await?;
    // Let the field settle before typing; the page animates in.
    pause(options, 0.5, 0.5).await;
    session
        .fill(portal::PASSWORD_INPUT, &account.password)
        .await?;
    session
        .wait_for(portal::SUBMIT_BUTTON, options.element_timeout)
        .await?;
    session.click(portal::SUBMIT_BUTTON).await
}

async fn dismiss_kmsi(session: &dyn PortalSession, options: &WalkOptions) -> KmsiOutcome {
    match session
        .wait_for(portal::KMSI_NO_BUTTON, options.kmsi_timeout)
        .await
    {
        Ok(()) => match session.click(portal::KMSI_NO_BUTTON).await {
            Ok(()) => KmsiOutcome::Handled,
            Err(err) => {
                warn!(target = "e5check", error = %err, "KMSI dismiss click failed");
                KmsiOutcome::Error
            }
        },
        Err(err) if err.is_timeout() => KmsiOutcome::Absent,
        Err(err) => {
            warn!(target = "e5check", error = %err, "KMSI wait failed");
            KmsiOutcome::Error
        }
    }
}

/// Best-effort check that we actually landed inside the portal when no KMSI
/// prompt showed up; a foreign URL usually means the sign-in silently failed.
async fn verify_portal_domain(
    session: &dyn PortalSession,
    account: &Account,
    options: &WalkOptions,
    report: &mut Report,
) {
    match session.current_url().await {
        Ok(url) if portal::is_portal_url(&url) => {}
        Ok(url) => {
            warn!(target = "e5check", account = %account.email, %url, "current URL is outside the admin portal");
            report.error(
                "no KMSI prompt and the current URL is not the admin center, sign-in may have failed",
            );
            screenshot(session, options, "post_login_url", &account.email).await;
        }
        Err(err) => {
            warn!(target = "e5check", account = %account.email, error = %err, "could not read current URL");
        }
    }
}

async fn open_listing(session: &dyn PortalSession, options: &WalkOptions) -> Result<()> {
    session.goto(portal::SUBSCRIPTIONS_URL).await?;
    session
        .wait_for(portal::LISTING_MARKER, options.element_timeout)
        .await
}

/// Writes a diagnostic screenshot named by failure category and account.
/// Purely a side effect; failures are logged and swallowed.
async fn screenshot(
    session: &dyn PortalSession,
    options: &WalkOptions,
    category: &str,
    email: &str,
) {
    let path = options
        .screenshot_dir
        .join(format!("error_{category}_{email}.png"));
    if let Err(err) = session.save_screenshot(&path).await {
        warn!(target = "e5check", path = %path.display(), error = %err, "screenshot failed");
    }
}

async fn pause(options: &WalkOptions, min_secs: f64, max_secs: f64) {
    if !options.paced {
        return;
    }
    let secs = min_secs + fastrand::f64() * (max_secs - min_secs);
    tokio::time::sleep(Duration::from_secs_f64(secs)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::CardScan;
    use crate::testing::{MockAction, MockPortal};

    fn account() -> Account {
        let parsed = crate::accounts::parse_accounts("a@x.com-pw1");
        parsed.accounts.into_iter().next().unwrap()
    }

    fn options() -> WalkOptions {
        WalkOptions {
            element_timeout: Duration::from_millis(10),
            kmsi_timeout: Duration::from_millis(10),
            screenshot_dir: PathBuf::from("/tmp/e5check-test"),
            paced: false,
            ..WalkOptions::default()
        }
    }

    fn e5_card(expiry: &str) -> CardScan {
        CardScan {
            title: Some("Microsoft 365 E5".to_string()),
            body_texts: vec!["25 licenses".to_string(), expiry.to_string()],
            expiry_field: None,
        }
    }

    #[tokio::test]
    async fn happy_path_records_expiry_and_tears_down_once() {
        let portal = MockPortal::new()
            .with_url(portal::SUBSCRIPTIONS_URL)
            .with_cards(vec![e5_card("Expires 9/30/2026")]);
        let state = portal.state();

        let report = check_account(Box::new(portal), &account(), &options()).await;

        assert_eq!(state.close_count(), 1);
        let body = report.render();
        assert!(body.contains("Microsoft 365 E5: Expires 9/30/2026"), "{body}");
        assert!(body.starts_with("checking account: a@x.com"));
        assert!(body.ends_with("check complete: a@x.com"));
        assert!(!body.contains("!!"), "{body}");
    }

    #[tokio::test]
    async fn missing_email_input_aborts_with_screenshot() {
        let portal = MockPortal::new().with_missing(portal::EMAIL_INPUT);
        let state = portal.state();

        let report = check_account(Box::new(portal), &account(), &options()).await;

        assert_eq!(state.close_count(), 1);
        let body = report.render();
        assert!(body.contains("!! email input not found"), "{body}");
        assert!(body.ends_with("check complete: a@x.com"));

        let actions = state.actions();
        assert!(actions.iter().any(|a| matches!(
            a,
            MockAction::Screenshot { path } if path.to_string_lossy().contains("error_email_input_a@x.com")
        )));
        // The walk never reached the password step.
        assert!(!actions.iter().any(|a| matches!(
            a,
            MockAction::Fill { selector, .. } if selector == portal::PASSWORD_INPUT
        )));
    }

    #[tokio::test]
    async fn stalled_password_page_is_reported_distinctly() {
        // The wait for the password input times out, but the input is still
        // displayed: the wrong-password / stalled-flow case.
        let portal = MockPortal::new()
            .with_missing(portal::PASSWORD_INPUT)
            .with_present(portal::PASSWORD_INPUT);
        let state = portal.state();

        let report = check_account(Box::new(portal), &account(), &options()).await;

        let body = report.render();
        assert!(
            body.contains("wrong password or stalled sign-in flow"),
            "{body}"
        );
        assert!(state.actions().iter().any(|a| matches!(
            a,
            MockAction::Screenshot { path } if path.to_string_lossy().contains("error_password_input")
        )));
        assert_eq!(state.close_count(), 1);
    }

    #[tokio::test]
    async fn absent_kmsi_on_portal_domain_is_not_an_error() {
        let portal = MockPortal::new()
            .with_missing(portal::KMSI_NO_BUTTON)
            .with_url("https://admin.microsoft.com/Adminportal/Home")
            .with_cards(vec![e5_card("Expires 9/30/2026")]);

        let report = check_account(Box::new(portal), &account(), &options()).await;

        let body = report.render();
        assert!(body.contains("no 'stay signed in?' prompt"), "{body}");
        assert!(!body.contains("!!"), "{body}");
        assert!(body.contains("Expires 9/30/2026"));
    }

    #[tokio::test]
    async fn absent_kmsi_off_portal_domain_warns_and_continues() {
        let portal = MockPortal::new()
            .with_missing(portal::KMSI_NO_BUTTON)
            .with_url("https://login.microsoftonline.com/common")
            .with_cards(vec![e5_card("Expires 9/30/2026")]);
        let state = portal.state();

        let report = check_account(Box::new(portal), &account(), &options()).await;

        let body = report.render();
        assert!(body.contains("sign-in may have failed"), "{body}");
        assert!(state.actions().iter().any(|a| matches!(
            a,
            MockAction::Screenshot { path } if path.to_string_lossy().contains("error_post_login_url")
        )));
        // Non-fatal: the walk still reaches extraction.
        assert!(body.contains("Expires 9/30/2026"), "{body}");
    }

    #[tokio::test]
    async fn listing_marker_timeout_aborts_before_extraction() {
        let portal = MockPortal::new().with_missing(portal::LISTING_MARKER);
        let state = portal.state();

        let report = check_account(Box::new(portal), &account(), &options()).await;

        let body = report.render();
        assert!(body.contains("subscriptions page did not render"), "{body}");
        assert_eq!(state.close_count(), 1);
        assert!(
            !state
                .actions()
                .iter()
                .any(|a| matches!(a, MockAction::ScanCards))
        );
    }

    #[tokio::test]
    async fn matching_card_without_expiry_records_not_found() {
        let portal = MockPortal::new().with_cards(vec![CardScan {
            title: Some("Microsoft 365 E5".to_string()),
            body_texts: vec!["25 licenses".to_string()],
            expiry_field: None,
        }]);

        let report = check_account(Box::new(portal), &account(), &options()).await;

        let body = report.render();
        assert!(body.contains("expiry not found"), "{body}");
        assert!(!body.contains("!!"), "{body}");
    }

    #[tokio::test]
    async fn undismissable_kmsi_prompt_is_logged_and_walk_continues() {
        // The prompt's "No" button is in the DOM but the click on it fails.
        let portal = MockPortal::new()
            .with_click_failing(portal::KMSI_NO_BUTTON)
            .with_cards(vec![e5_card("Expires 9/30/2026")]);
        let state = portal.state();

        let report = check_account(Box::new(portal), &account(), &options()).await;

        let body = report.render();
        assert!(
            body.contains("!! could not dismiss the 'stay signed in?' prompt"),
            "{body}"
        );
        assert!(state.actions().iter().any(|a| matches!(
            a,
            MockAction::Screenshot { path } if path.to_string_lossy().contains("error_kmsi_button_a@x.com")
        )));
        // The prompt is optional: the walk still reaches extraction.
        assert!(body.contains("Expires 9/30/2026"), "{body}");
        assert_eq!(state.close_count(), 1);
    }

    #[tokio::test]
    async fn card_scan_failure_surfaces_as_unexpected_error() {
        let portal = MockPortal::new().with_scan_failing();
        let state = portal.state();

        let report = check_account(Box::new(portal), &account(), &options()).await;

        let body = report.render();
        assert!(body.contains("unexpected error during check"), "{body}");
        assert!(!body.contains("expiry not found"), "{body}");
        assert_eq!(state.close_count(), 1);
        assert!(body.ends_with("check complete: a@x.com"));
    }

    #[tokio::test]
    async fn kmsi_handled_clicks_the_no_button() {
        let portal = MockPortal::new()
            .with_url(portal::SUBSCRIPTIONS_URL)
            .with_cards(vec![e5_card("Expires 9/30/2026")]);
        let state = portal.state();

        let report = check_account(Box::new(portal), &account(), &options()).await;

        assert!(state.actions().iter().any(|a| matches!(
            a,
            MockAction::Click { selector } if selector == portal::KMSI_NO_BUTTON
        )));
        assert!(report.render().contains("dismissed 'stay signed in?'"));
    }
}
