//! Credential parsing for the `email-password&email2-password2...` format
//! fed through the `MS_E5_ACCOUNTS` secret.

use std::fmt;

use tracing::warn;

/// One portal credential pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    pub email: String,
    pub password: String,
}

// Keep passwords out of debug logs.
impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Parse result: valid pairs in configuration order, plus how many
/// non-empty segments were seen in total (including skipped ones).
#[derive(Debug, Default)]
pub struct ParsedAccounts {
    pub accounts: Vec<Account>,
    pub total_seen: usize,
}

/// Splits `raw` on `&` into segments and each segment once on the first `-`
/// into (email, password). Malformed segments are skipped with a warning,
/// never treated as fatal.
pub fn parse_accounts(raw: &str) -> ParsedAccounts {
    let mut parsed = ParsedAccounts::default();

    for (index, segment) in raw.split('&').enumerate() {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        parsed.total_seen += 1;

        let Some((email, password)) = segment.split_once('-') else {
            warn!(
                target = "e5check",
                index, "accounts entry has no `-` separator, skipping"
            );
            continue;
        };

        let email = email.trim();
        let password = password.trim();
        if email.is_empty() || password.is_empty() {
            warn!(
                target = "e5check",
                index, "accounts entry with empty email or password, skipping"
            );
            continue;
        }

        parsed.accounts.push(Account {
            email: email.to_string(),
            password: password.to_string(),
        });
    }

    parsed
}
