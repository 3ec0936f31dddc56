//! Admin center URLs, element selectors, and the expiry extraction rule.

use url::Url;

use crate::session::CardScan;

pub const LOGIN_URL: &str = "https://admin.microsoft.com/";
pub const SUBSCRIPTIONS_URL: &str =
    "https://admin.microsoft.com/Adminportal/Home?source=applauncher#/subscriptions";
pub const PORTAL_DOMAIN: &str = "admin.microsoft.com";

/// Sign-in flow element ids (stable across the AAD login pages).
pub const EMAIL_INPUT: &str = "#i0116";
pub const PASSWORD_INPUT: &str = "#i0118";
/// "Next" on the email page and "Sign in" on the password page share an id.
pub const SUBMIT_BUTTON: &str = "#idSIButton9";
/// The "No" button of the "Stay signed in?" prompt.
pub const KMSI_NO_BUTTON: &str = "#idBtn_Back";

/// Present once the "Your products" listing has rendered.
pub const LISTING_MARKER: &str = "div[data-is-scrollable='true']";
pub const CARD: &str = "div[class*='card']";
pub const CARD_TITLE: &str = "h3, [class*='title']";
pub const CARD_TEXT: &str = "span";
/// More specific expiry field, probed when no body span carries a marker.
pub const CARD_EXPIRY_FIELD: &str = "[class*='expir'], [data-automationid='expiryDate']";

/// The listing renders in the tenant's locale; accept both variants.
pub const EXPIRY_MARKERS: [&str; 2] = ["Expires", "到期"];

pub fn contains_expiry_marker(text: &str) -> bool {
    EXPIRY_MARKERS.iter().any(|marker| text.contains(marker))
}

/// Whether `url` is inside the admin portal (used to sanity-check the
/// post-login state when no KMSI prompt appeared).
pub fn is_portal_url(url: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h == PORTAL_DOMAIN))
        .unwrap_or(false)
}

/// Scans `cards` in order for the target subscription's expiry text.
///
/// A card qualifies when its title contains `target` (case-sensitive
/// substring). Within a qualifying card the body texts are probed for an
/// expiry marker first; if none carries one, the dedicated expiry field is
/// taken as-is. The first card that yields text wins and scanning stops; a
/// qualifying card with no expiry text does not stop the scan, since later
/// cards may also match the name.
pub fn find_expiry(cards: &[CardScan], target: &str) -> Option<String> {
    for card in cards {
        let Some(title) = &card.title else { continue };
        if !title.contains(target) {
            continue;
        }

        if let Some(text) = card.body_texts.iter().find(|t| contains_expiry_marker(t)) {
            return Some(text.trim().to_string());
        }
        if let Some(field) = &card.expiry_field {
            let field = field.trim();
            if !field.is_empty() {
                return Some(field.to_string());
            }
        }
    }
    None
}
