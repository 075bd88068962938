//! Block and challenge detection over rendered page snapshots.
//!
//! Runs after navigation and before extraction: a page showing one of these
//! indicators yields zero events for reasons retrying alone cannot fix, so
//! the attempt is aborted as blocked instead of being misread as "no data".

use std::fmt;

use scraper::{Html, Selector};

/// A page-level signal that access was denied or challenged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockIndicator {
    Captcha,
    Challenge,
    AccessDenied,
    ErrorBanner,
}

impl fmt::Display for BlockIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BlockIndicator::Captcha => "CAPTCHA widget",
            BlockIndicator::Challenge => "challenge page",
            BlockIndicator::AccessDenied => "access denied",
            BlockIndicator::ErrorBanner => "error banner",
        };
        f.write_str(label)
    }
}

/// CSS probes for widget-level indicators. The content-ready wait in
/// `navigate` polls for these same selectors.
const SELECTOR_INDICATORS: &[(&str, BlockIndicator)] = &[
    ("iframe[src*=\"recaptcha\"]", BlockIndicator::Captcha),
    (".g-recaptcha", BlockIndicator::Captcha),
    ("iframe[src*=\"hcaptcha\"]", BlockIndicator::Captcha),
    ("#challenge-running", BlockIndicator::Challenge),
    ("#cf-challenge-running", BlockIndicator::Challenge),
    (".page-error-banner", BlockIndicator::ErrorBanner),
];

/// Marker strings for indicators that render as plain text.
const TEXT_INDICATORS: &[(&str, BlockIndicator)] = &[
    ("Access Denied", BlockIndicator::AccessDenied),
    ("Attention Required!", BlockIndicator::Challenge),
    ("Checking your browser before accessing", BlockIndicator::Challenge),
    ("verify you are a human", BlockIndicator::Captcha),
];

pub(crate) fn indicator_selectors() -> impl Iterator<Item = &'static str> {
    SELECTOR_INDICATORS.iter().map(|(selector, _)| *selector)
}

/// Scan a rendered snapshot for known blocking signals.
pub fn scan(html: &str) -> Option<BlockIndicator> {
    let document = Html::parse_document(html);

    for (selector, indicator) in SELECTOR_INDICATORS {
        if let Ok(selector) = Selector::parse(selector) {
            if document.select(&selector).next().is_some() {
                return Some(*indicator);
            }
        }
    }

    for (marker, indicator) in TEXT_INDICATORS {
        if html.contains(marker) {
            return Some(*indicator);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_page_passes() {
        let html = r#"<html><body><div class="event">Delivered</div></body></html>"#;
        assert_eq!(scan(html), None);
    }

    #[test]
    fn recaptcha_iframe_is_flagged() {
        let html = r#"<html><body>
            <iframe src="https://www.google.com/recaptcha/api2/anchor?k=x"></iframe>
        </body></html>"#;
        assert_eq!(scan(html), Some(BlockIndicator::Captcha));
    }

    #[test]
    fn cloudflare_challenge_is_flagged() {
        let html = r#"<html><body><div id="challenge-running"></div></body></html>"#;
        assert_eq!(scan(html), Some(BlockIndicator::Challenge));
    }

    #[test]
    fn access_denied_text_is_flagged() {
        let html = "<html><head><title>Access Denied</title></head><body></body></html>";
        assert_eq!(scan(html), Some(BlockIndicator::AccessDenied));
    }

    #[test]
    fn widget_indicators_win_over_text() {
        // Both present: the selector pass runs first.
        let html = r#"<html><body>
            <div class="g-recaptcha"></div>
            <p>Access Denied</p>
        </body></html>"#;
        assert_eq!(scan(html), Some(BlockIndicator::Captcha));
    }
}
