//! Headless checker for Microsoft 365 subscription expiry dates.
//!
//! For each configured account the checker drives a headless Chrome session
//! through the admin center sign-in flow, opens the subscriptions listing,
//! scrapes the expiry text of the target subscription, and aggregates the
//! results into one report delivered via [`notify::Notifier`].

pub mod accounts;
pub mod browser;
pub mod cli;
pub mod error;
pub mod logging;
pub mod notify;
pub mod portal;
pub mod report;
pub mod runner;
pub mod session;
pub mod testing;
pub mod walk;
