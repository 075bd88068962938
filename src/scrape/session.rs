//! Browser session lifecycle: one engine plus one page per attempt.
//!
//! A `Session` is exclusively owned by the attempt that launched it and is
//! never reused. `close()` may be called from any number of exit paths; the
//! teardown runs at most once.

use std::path::PathBuf;
use std::time::Duration;

use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::BrowserEngineConfig;
use crate::error::ScrapeError;

/// Common Chrome executable paths to check.
const CHROME_PATHS: &[&str] = &[
    // Linux
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    // macOS
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    // Common install locations
    "/opt/google/chrome/google-chrome",
];

struct Engine {
    browser: Browser,
    handler: JoinHandle<()>,
    /// Connected to an externally owned browser rather than a child process.
    remote: bool,
}

/// One live browser engine and its page, scoped to a single attempt.
pub struct Session {
    page: Page,
    engine: Mutex<Option<Engine>>,
}

impl Session {
    /// Launch a fresh engine (or connect to a configured remote one) and
    /// open its page. Fails with `ScrapeError::Launch`, which is fatal to
    /// the current attempt only.
    pub async fn launch(config: &BrowserEngineConfig) -> Result<Self, ScrapeError> {
        let launch_timeout = Duration::from_secs(config.launch_timeout_secs);

        let (mut browser, handler, remote) = match config.remote_url {
            Some(ref url) => {
                let (browser, handler) = connect_remote(url, launch_timeout).await?;
                (browser, handler, true)
            }
            None => {
                let (browser, handler) = launch_local(config, launch_timeout).await?;
                (browser, handler, false)
            }
        };

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                if !remote {
                    if let Err(close_err) = browser.close().await {
                        warn!("failed to close browser after page error: {close_err}");
                    }
                }
                handler.abort();
                return Err(ScrapeError::Launch(format!("failed to open page: {e}")));
            }
        };

        Ok(Self {
            page,
            engine: Mutex::new(Some(Engine {
                browser,
                handler,
                remote,
            })),
        })
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Release the engine. Idempotent: callable from the success path and
    /// from cleanup paths without error.
    pub async fn close(&self) {
        let Some(mut engine) = self.engine.lock().await.take() else {
            debug!("session already closed");
            return;
        };

        if engine.remote {
            // The remote engine is shared infrastructure; drop our tab only.
            if let Err(e) = self.page.clone().close().await {
                debug!("failed to close remote page: {e}");
            }
        } else if let Err(e) = engine.browser.close().await {
            warn!("failed to close browser cleanly: {e}");
        }
        engine.handler.abort();
        debug!("session closed");
    }
}

async fn launch_local(
    config: &BrowserEngineConfig,
    launch_timeout: Duration,
) -> Result<(Browser, JoinHandle<()>), ScrapeError> {
    let chrome_path = match config.executable {
        Some(ref path) => path.clone(),
        None => find_chrome()?,
    };

    info!(
        "Launching browser (headless={}) from {}",
        config.headless,
        chrome_path.display()
    );

    let mut builder = BrowserConfig::builder().chrome_executable(chrome_path);

    // with_head means NOT headless, confusingly
    if !config.headless {
        builder = builder.with_head();
    }

    if let Some(ref proxy) = config.proxy {
        builder = builder.arg(format!("--proxy-server={}", proxy));
    }

    builder = builder
        .arg("--no-sandbox") // Required for containerized execution
        .arg("--disable-setuid-sandbox")
        .arg("--disable-gpu")
        .arg("--disable-software-rasterizer")
        .arg("--disable-dev-shm-usage")
        .arg("--disable-extensions")
        .arg("--disable-background-networking")
        .arg("--disable-sync")
        .arg("--disable-default-apps")
        .arg("--disable-blink-features=AutomationControlled")
        .arg("--no-first-run")
        .arg("--no-default-browser-check");

    for arg in &config.chrome_args {
        builder = builder.arg(arg);
    }

    let browser_config = builder
        .build()
        .map_err(|e| ScrapeError::Launch(format!("failed to build browser config: {e}")))?;

    let (browser, mut handler) = tokio::time::timeout(launch_timeout, Browser::launch(browser_config))
        .await
        .map_err(|_| {
            ScrapeError::Launch(format!(
                "engine did not start within {}s",
                launch_timeout.as_secs()
            ))
        })?
        .map_err(|e| ScrapeError::Launch(e.to_string()))?;

    let handler_task = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if event.is_err() {
                break;
            }
        }
    });

    Ok((browser, handler_task))
}

/// Connect to a remote Chrome instance, resolving the WebSocket endpoint
/// through the `/json/version` endpoint when given a bare host URL.
async fn connect_remote(
    url: &str,
    launch_timeout: Duration,
) -> Result<(Browser, JoinHandle<()>), ScrapeError> {
    info!("Connecting to remote browser at {}", url);

    let ws_url = if url.contains("/devtools/browser/") {
        url.to_string()
    } else {
        resolve_ws_url(url, launch_timeout).await?
    };

    let (browser, mut handler) = Browser::connect(&ws_url)
        .await
        .map_err(|e| ScrapeError::Launch(format!("failed to connect to remote browser: {e}")))?;

    let handler_task = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if event.is_err() {
                break;
            }
        }
    });

    Ok((browser, handler_task))
}

/// Swap the WebSocket scheme for HTTP and append the DevTools version path.
fn version_probe_url(url: &str) -> String {
    let http_url = url
        .replace("ws://", "http://")
        .replace("wss://", "https://");
    format!("{}/json/version", http_url.trim_end_matches('/'))
}

async fn resolve_ws_url(url: &str, timeout: Duration) -> Result<String, ScrapeError> {
    let version_url = version_probe_url(url);

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ScrapeError::Launch(e.to_string()))?;

    let resp: serde_json::Value = client
        .get(&version_url)
        .send()
        .await
        .map_err(|e| ScrapeError::Launch(format!("failed to reach remote browser: {e}")))?
        .json()
        .await
        .map_err(|e| ScrapeError::Launch(format!("failed to parse browser version info: {e}")))?;

    resp.get("webSocketDebuggerUrl")
        .and_then(|v| v.as_str())
        .map(String::from)
        .ok_or_else(|| ScrapeError::Launch("no webSocketDebuggerUrl in response".to_string()))
}

/// Find a Chrome executable on this host.
fn find_chrome() -> Result<PathBuf, ScrapeError> {
    for path in CHROME_PATHS {
        let p = std::path::Path::new(path);
        if p.exists() {
            debug!("Found Chrome at: {}", path);
            return Ok(p.to_path_buf());
        }
    }

    for cmd in &[
        "google-chrome",
        "google-chrome-stable",
        "chromium",
        "chromium-browser",
    ] {
        if let Ok(output) = std::process::Command::new("which").arg(cmd).output() {
            if output.status.success() {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path.is_empty() {
                    debug!("Found Chrome in PATH: {}", path);
                    return Ok(PathBuf::from(path));
                }
            }
        }
    }

    Err(ScrapeError::Launch(
        "Chrome/Chromium not found; install it or set browser.executable".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ws_resolution_rejects_unreachable_host() {
        // Port 9 (discard) is not a DevTools endpoint.
        let err = resolve_ws_url("ws://127.0.0.1:9", Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Launch(_)));
    }

    #[test]
    fn version_probe_swaps_scheme_and_appends_path() {
        assert_eq!(
            version_probe_url("ws://localhost:9222"),
            "http://localhost:9222/json/version"
        );
        assert_eq!(
            version_probe_url("wss://browser.internal/"),
            "https://browser.internal/json/version"
        );
    }
}
