//! Retry-driven scrape pipeline.
//!
//! Drives up to `max_attempts` independent attempts for a tracking number.
//! Each attempt launches one browser session, applies the stealth layer and
//! request filter, navigates, checks for block indicators, extracts, and
//! releases the session on every exit path before the retry delay starts.

pub mod detect;
pub mod extract;

mod artifacts;
mod filter;
mod navigate;
mod session;
mod stealth;

pub use artifacts::{ArtifactSink, FsArtifactSink, NoopSink};
pub use session::Session;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::page::ScreenshotParams;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::error::ScrapeError;
use crate::models::TrackingReport;

/// Bounds for one retry sequence.
#[derive(Debug, Clone, Copy)]
struct RetryPolicy {
    max_attempts: u32,
    retry_delay: Duration,
    /// Hard stop for the whole sequence; attempts are skipped once passed.
    deadline: Option<tokio::time::Instant>,
}

/// The scrape pipeline entry point.
///
/// Holds only read-only configuration and process-wide limits, so one
/// instance serves any number of concurrent requests.
pub struct Scraper {
    settings: Arc<Settings>,
    limiter: Arc<Semaphore>,
    artifacts: Arc<dyn ArtifactSink>,
}

impl Scraper {
    pub fn new(settings: Arc<Settings>) -> Self {
        let artifacts: Arc<dyn ArtifactSink> = match settings.scrape.artifacts_dir {
            Some(ref dir) => Arc::new(FsArtifactSink::new(dir.clone())),
            None => Arc::new(NoopSink),
        };
        Self::with_artifact_sink(settings, artifacts)
    }

    pub fn with_artifact_sink(settings: Arc<Settings>, artifacts: Arc<dyn ArtifactSink>) -> Self {
        let limiter = Arc::new(Semaphore::new(settings.scrape.max_concurrent_sessions));
        Self {
            settings,
            limiter,
            artifacts,
        }
    }

    /// Scrape tracking data for one tracking number.
    ///
    /// Surfaces only `Validation` (bad input, no session was created) and
    /// `Exhausted` (all attempts spent); attempt-level failures are folded
    /// into the retry decision.
    pub async fn track(&self, tracking_number: &str) -> Result<TrackingReport, ScrapeError> {
        let tracking_number = tracking_number.trim();
        if tracking_number.is_empty() {
            return Err(ScrapeError::Validation(
                "tracking number is required".to_string(),
            ));
        }

        // Cap simultaneous browser sessions across all requests.
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| ScrapeError::Launch("session limiter closed".to_string()))?;

        let url = self.settings.scrape.tracking_url_for(tracking_number);
        let deadline = self
            .settings
            .scrape
            .overall_deadline()
            .map(|d| tokio::time::Instant::now() + d);
        let policy = RetryPolicy {
            max_attempts: self.settings.scrape.max_attempts,
            retry_delay: self.settings.scrape.retry_delay(),
            deadline,
        };

        info!(%tracking_number, "starting scrape");
        run_with_retries(policy, |attempt| {
            self.run_attempt(attempt, tracking_number, &url, deadline)
        })
        .await
    }

    /// One bounded attempt: session launch through extraction, with the
    /// single unconditional teardown point for the attempt's session.
    async fn run_attempt(
        &self,
        number: u32,
        tracking_number: &str,
        url: &str,
        deadline: Option<tokio::time::Instant>,
    ) -> Result<TrackingReport, ScrapeError> {
        info!(attempt = number, "opening browser session");
        let session = Session::launch(&self.settings.browser).await?;

        let outcome = match deadline {
            Some(deadline) => {
                match tokio::time::timeout_at(
                    deadline,
                    self.drive(&session, number, tracking_number, url),
                )
                .await
                {
                    Ok(outcome) => outcome,
                    Err(_) => Err(ScrapeError::Exhausted {
                        attempts: number,
                        reason: "overall deadline exceeded".to_string(),
                    }),
                }
            }
            None => self.drive(&session, number, tracking_number, url).await,
        };

        session.close().await;
        outcome
    }

    async fn drive(
        &self,
        session: &Session,
        attempt: u32,
        tracking_number: &str,
        url: &str,
    ) -> Result<TrackingReport, ScrapeError> {
        let page = session.page();

        stealth::prepare(page, &self.settings.browser).await?;
        filter::install(page, &self.settings.browser.blocked_resources).await?;
        navigate::goto(page, url, &self.settings.browser).await?;
        navigate::wait_for_content(page, &self.settings.browser).await;

        let html = page
            .content()
            .await
            .map_err(|e| ScrapeError::Extraction(format!("page snapshot: {e}")))?;

        self.capture_artifacts(session, attempt, tracking_number, &html)
            .await;

        if let Some(indicator) = detect::scan(&html) {
            return Err(ScrapeError::Blocked(indicator));
        }

        let report = extract::extract_report(&html);
        debug!(
            attempt,
            events = report.tracking_details.len(),
            "extraction finished"
        );
        Ok(report)
    }

    async fn capture_artifacts(
        &self,
        session: &Session,
        attempt: u32,
        tracking_number: &str,
        html: &str,
    ) {
        if !self.artifacts.enabled() {
            return;
        }

        self.artifacts
            .record_html(tracking_number, attempt, html)
            .await;

        match session
            .page()
            .screenshot(ScreenshotParams::builder().build())
            .await
        {
            Ok(png) => {
                self.artifacts
                    .record_screenshot(tracking_number, attempt, &png)
                    .await;
            }
            Err(e) => debug!("screenshot capture failed: {e}"),
        }
    }
}

/// The attempt state machine: `Running(n)` until an attempt yields events
/// (success), an exhaustion condition is met (failure), or a terminal error
/// surfaces. Attempt-level errors and empty results trigger a delayed retry.
async fn run_with_retries<F, Fut>(policy: RetryPolicy, mut attempt: F) -> Result<TrackingReport, ScrapeError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<TrackingReport, ScrapeError>>,
{
    let mut last_failure: Option<String> = None;

    for number in 1..=policy.max_attempts {
        if let Some(deadline) = policy.deadline {
            if tokio::time::Instant::now() >= deadline {
                warn!("overall deadline reached before attempt {number}; giving up");
                return Err(ScrapeError::Exhausted {
                    attempts: number - 1,
                    reason: "overall deadline exceeded".to_string(),
                });
            }
        }

        match attempt(number).await {
            Ok(report) if !report.tracking_details.is_empty() => {
                info!(
                    attempt = number,
                    events = report.tracking_details.len(),
                    "scrape succeeded"
                );
                return Ok(report);
            }
            Ok(_) => {
                warn!(attempt = number, "no tracking events on rendered page");
                last_failure = None;
            }
            Err(e) if e.is_attempt_error() => {
                warn!(attempt = number, "attempt failed: {e}");
                last_failure = Some(e.to_string());
            }
            // Terminal errors (deadline exceeded mid-attempt) skip the
            // remaining attempts.
            Err(e) => return Err(e),
        }

        if number < policy.max_attempts {
            debug!("retrying in {:?}", policy.retry_delay);
            tokio::time::sleep(policy.retry_delay).await;
        }
    }

    Err(ScrapeError::Exhausted {
        attempts: policy.max_attempts,
        reason: last_failure.unwrap_or_else(|| "no tracking events found".to_string()),
    })
}
