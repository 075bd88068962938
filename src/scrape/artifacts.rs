//! Diagnostic artifact capture.
//!
//! The pipeline records a page snapshot and screenshot per attempt through
//! an injected sink; recording is opportunistic and a failing sink never
//! affects the scrape outcome.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, warn};

/// Capability for persisting per-attempt diagnostics.
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    /// Whether capture work (e.g. screenshots) is worth doing at all.
    fn enabled(&self) -> bool {
        true
    }

    /// Record the rendered HTML snapshot for one attempt.
    async fn record_html(&self, tracking_number: &str, attempt: u32, html: &str);

    /// Record a page screenshot for one attempt.
    async fn record_screenshot(&self, tracking_number: &str, attempt: u32, png: &[u8]);
}

/// Discards everything; used when no artifacts directory is configured.
pub struct NoopSink;

#[async_trait]
impl ArtifactSink for NoopSink {
    fn enabled(&self) -> bool {
        false
    }

    async fn record_html(&self, _tracking_number: &str, _attempt: u32, _html: &str) {}

    async fn record_screenshot(&self, _tracking_number: &str, _attempt: u32, _png: &[u8]) {}
}

/// Writes per-attempt artifacts under `<root>/<tracking number>/`.
pub struct FsArtifactSink {
    root: PathBuf,
}

impl FsArtifactSink {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    async fn write(&self, tracking_number: &str, file_name: &str, bytes: &[u8]) {
        let dir = self.root.join(sanitize(tracking_number));
        if let Err(e) = tokio::fs::create_dir_all(&dir).await {
            warn!("failed to create artifact dir {}: {e}", dir.display());
            return;
        }

        let path = dir.join(file_name);
        match tokio::fs::write(&path, bytes).await {
            Ok(()) => debug!(path = %path.display(), "wrote artifact"),
            Err(e) => warn!("failed to write artifact {}: {e}", path.display()),
        }
    }
}

#[async_trait]
impl ArtifactSink for FsArtifactSink {
    async fn record_html(&self, tracking_number: &str, attempt: u32, html: &str) {
        let name = format!("attempt-{attempt:02}.html");
        self.write(tracking_number, &name, html.as_bytes()).await;
    }

    async fn record_screenshot(&self, tracking_number: &str, attempt: u32, png: &[u8]) {
        let name = format!("attempt-{attempt:02}.png");
        self.write(tracking_number, &name, png).await;
    }
}

/// Tracking numbers come from the outside world; keep them path-safe.
fn sanitize(tracking_number: &str) -> String {
    tracking_number
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
