//! Scrape pipeline error taxonomy.
//!
//! `Launch`, `Navigation`, `Blocked` and `Extraction` are attempt-scoped:
//! the retry loop converts them into retry decisions and they never reach a
//! caller directly. Only `Validation` (raised before any attempt starts) and
//! `Exhausted` (raised after all attempts are spent) are surfaced.

use thiserror::Error;

use crate::scrape::detect::BlockIndicator;

#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Missing or malformed caller input; no browser session was created.
    #[error("invalid tracking number: {0}")]
    Validation(String),

    /// The browser engine failed to start (or a session could not be set up).
    #[error("browser launch failed: {0}")]
    Launch(String),

    /// Both the primary and the fallback page load failed.
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// A bot-detection indicator was observed on the rendered page.
    #[error("blocked by target site: {0}")]
    Blocked(BlockIndicator),

    /// Structural failure reading the rendered page state.
    #[error("page extraction failed: {0}")]
    Extraction(String),

    /// All attempts spent without usable tracking data.
    #[error("no tracking data after {attempts} attempt(s): {reason}")]
    Exhausted { attempts: u32, reason: String },
}

impl ScrapeError {
    /// Whether this failure is scoped to a single attempt and should be
    /// converted into a retry decision rather than surfaced.
    pub fn is_attempt_error(&self) -> bool {
        matches!(
            self,
            ScrapeError::Launch(_)
                | ScrapeError::Navigation(_)
                | ScrapeError::Blocked(_)
                | ScrapeError::Extraction(_)
        )
    }
}
