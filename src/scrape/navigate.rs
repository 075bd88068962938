//! Two-phase navigation with a bounded content-readiness wait.
//!
//! Primary load waits for the full load cycle under its own timeout; on any
//! failure the fallback re-dispatches the navigation and settles for a
//! parsed DOM. Only both phases failing is a navigation error. The
//! content-ready wait afterwards is best-effort: partial or late-rendered
//! content is still worth attempting to read.

use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::Page;
use tracing::{debug, trace, warn};

use crate::config::BrowserEngineConfig;
use crate::error::ScrapeError;

use super::detect;

/// Resolves once the DOM is at least parsed, with its own in-page fallback
/// in case DOMContentLoaded never fires.
const READY_STATE_SCRIPT: &str = r#"
    new Promise((resolve) => {
        if (document.readyState === 'complete' || document.readyState === 'interactive') {
            resolve(document.readyState);
        } else {
            document.addEventListener('DOMContentLoaded', () => resolve(document.readyState));
            setTimeout(() => resolve('timeout'), 10000);
        }
    })
"#;

/// Drive the page to `url`, trying the strict load first and the looser
/// parsed-DOM wait second.
pub async fn goto(page: &Page, url: &str, config: &BrowserEngineConfig) -> Result<(), ScrapeError> {
    debug!("Navigating to {}", url);

    let primary_timeout = Duration::from_secs(config.nav_timeout_secs);
    match tokio::time::timeout(primary_timeout, primary_load(page, url)).await {
        Ok(Ok(())) => {
            debug!("primary navigation settled");
            return Ok(());
        }
        Ok(Err(e)) => warn!("primary navigation failed: {e}"),
        Err(_) => warn!(
            "primary navigation timed out after {}s",
            config.nav_timeout_secs
        ),
    }

    let fallback_timeout = Duration::from_secs(config.fallback_timeout_secs);
    tokio::time::timeout(fallback_timeout, fallback_load(page, url))
        .await
        .map_err(|_| {
            ScrapeError::Navigation(format!(
                "fallback load timed out after {}s",
                config.fallback_timeout_secs
            ))
        })??;

    debug!("fallback navigation settled");
    Ok(())
}

async fn primary_load(page: &Page, url: &str) -> Result<(), ScrapeError> {
    page.goto(url)
        .await
        .map_err(|e| ScrapeError::Navigation(format!("goto: {e}")))?;
    page.wait_for_navigation()
        .await
        .map_err(|e| ScrapeError::Navigation(format!("load wait: {e}")))?;
    Ok(())
}

/// Re-dispatch the navigation and wait only for a parsed DOM.
async fn fallback_load(page: &Page, url: &str) -> Result<(), ScrapeError> {
    let params = NavigateParams::builder()
        .url(url)
        .build()
        .map_err(|e| ScrapeError::Navigation(format!("invalid URL: {e}")))?;
    page.execute(params)
        .await
        .map_err(|e| ScrapeError::Navigation(format!("navigate dispatch: {e}")))?;

    match page.evaluate(READY_STATE_SCRIPT.to_string()).await {
        Ok(result) => {
            let state: String = result
                .into_value()
                .unwrap_or_else(|_| "unknown".to_string());
            debug!("Page ready state: {}", state);
        }
        Err(e) => {
            // Script execution can fail on non-HTML responses; the snapshot
            // may still be readable.
            debug!("could not check ready state: {e}");
        }
    }

    Ok(())
}

/// Bounded wait for a content signal: either the tracking payload or a
/// known block indicator. Expiry never fails the attempt.
pub async fn wait_for_content(page: &Page, config: &BrowserEngineConfig) {
    let deadline =
        tokio::time::Instant::now() + Duration::from_secs(config.content_ready_timeout_secs);
    let probe = content_probe();

    while tokio::time::Instant::now() < deadline {
        match page.evaluate(probe.clone()).await {
            Ok(result) => {
                if result.into_value::<bool>().unwrap_or(false) {
                    debug!("content signal present");
                    return;
                }
            }
            Err(e) => trace!("content probe failed: {e}"),
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }

    debug!(
        "content signal did not appear within {}s; extracting anyway",
        config.content_ready_timeout_secs
    );
}

fn content_probe() -> String {
    let mut selectors: Vec<&str> = vec![".event", ".parcel-attributes"];
    selectors.extend(detect::indicator_selectors());
    format!("!!document.querySelector({:?})", selectors.join(", "))
}
