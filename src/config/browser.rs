//! Browser engine configuration types.

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Sub-resource categories the request filter may abort during page load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockedResource {
    Image,
    Stylesheet,
    Font,
    Media,
}

/// Browser engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserEngineConfig {
    /// Run in headless mode (default: true).
    /// Set to false for debugging or if headless detection is an issue.
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Proxy server URL (e.g., "socks5://127.0.0.1:1080").
    #[serde(default)]
    pub proxy: Option<String>,

    /// Path to the Chrome/Chromium binary. Discovered from common install
    /// locations when unset.
    #[serde(default)]
    pub executable: Option<PathBuf>,

    /// Remote Chrome DevTools URL (e.g., "ws://localhost:9222").
    /// If set, connects to an existing browser instead of launching one.
    #[serde(default)]
    pub remote_url: Option<String>,

    /// Additional Chrome arguments.
    #[serde(default)]
    pub chrome_args: Vec<String>,

    /// Engine start timeout in seconds.
    #[serde(default = "default_launch_timeout")]
    pub launch_timeout_secs: u64,

    /// Primary page load timeout in seconds (full load wait).
    #[serde(default = "default_nav_timeout")]
    pub nav_timeout_secs: u64,

    /// Fallback page load timeout in seconds (parsed-DOM wait).
    #[serde(default = "default_fallback_timeout")]
    pub fallback_timeout_secs: u64,

    /// Bounded wait for the tracking payload (or a block indicator) to
    /// appear after navigation; expiry never fails the attempt.
    #[serde(default = "default_content_ready_timeout")]
    pub content_ready_timeout_secs: u64,

    /// Sub-resource categories aborted during page load.
    #[serde(default = "default_blocked_resources")]
    pub blocked_resources: Vec<BlockedResource>,

    /// User agent pool; one entry is picked per session.
    #[serde(default = "default_user_agents")]
    pub user_agents: Vec<String>,

    /// Accept-Language preference advertised to the target site.
    #[serde(default = "default_accept_language")]
    pub accept_language: String,
}

impl Default for BrowserEngineConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            proxy: None,
            executable: None,
            remote_url: None,
            chrome_args: Vec::new(),
            launch_timeout_secs: default_launch_timeout(),
            nav_timeout_secs: default_nav_timeout(),
            fallback_timeout_secs: default_fallback_timeout(),
            content_ready_timeout_secs: default_content_ready_timeout(),
            blocked_resources: default_blocked_resources(),
            user_agents: default_user_agents(),
            accept_language: default_accept_language(),
        }
    }
}

impl BrowserEngineConfig {
    /// Apply environment variable overrides.
    ///
    /// - `PARCELTRACK_PROXY` - Proxy server for browser traffic
    /// - `BROWSER_URL` - Remote Chrome DevTools URL
    /// - `CHROME_EXECUTABLE` - Chrome/Chromium binary path
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(proxy) = env::var("PARCELTRACK_PROXY") {
            if !proxy.is_empty() {
                self.proxy = Some(proxy);
            }
        }
        if let Ok(url) = env::var("BROWSER_URL") {
            if !url.is_empty() {
                self.remote_url = Some(url);
            }
        }
        if let Ok(path) = env::var("CHROME_EXECUTABLE") {
            if !path.is_empty() {
                self.executable = Some(PathBuf::from(path));
            }
        }
        self
    }
}

fn default_headless() -> bool {
    true
}

fn default_launch_timeout() -> u64 {
    30
}

fn default_nav_timeout() -> u64 {
    60
}

fn default_fallback_timeout() -> u64 {
    30
}

fn default_content_ready_timeout() -> u64 {
    15
}

fn default_blocked_resources() -> Vec<BlockedResource> {
    vec![
        BlockedResource::Image,
        BlockedResource::Stylesheet,
        BlockedResource::Font,
        BlockedResource::Media,
    ]
}

fn default_user_agents() -> Vec<String> {
    vec![
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36".to_string(),
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36".to_string(),
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36".to_string(),
    ]
}

fn default_accept_language() -> String {
    "en-US,en;q=0.9".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Tests that modify environment variables must be serialized
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn defaults_block_heavy_resources() {
        let config = BrowserEngineConfig::default();
        assert!(config.headless);
        assert_eq!(config.blocked_resources.len(), 4);
        assert!(config.blocked_resources.contains(&BlockedResource::Image));
        assert!(config.blocked_resources.contains(&BlockedResource::Media));
        assert!(!config.user_agents.is_empty());
    }

    #[test]
    fn env_overrides_apply() {
        let _guard = ENV_MUTEX.lock().unwrap();

        std::env::set_var("PARCELTRACK_PROXY", "socks5://127.0.0.1:1080");
        std::env::set_var("BROWSER_URL", "ws://localhost:9222");
        std::env::set_var("CHROME_EXECUTABLE", "/usr/bin/chromium");

        let config = BrowserEngineConfig::default().with_env_overrides();
        assert_eq!(config.proxy.as_deref(), Some("socks5://127.0.0.1:1080"));
        assert_eq!(config.remote_url.as_deref(), Some("ws://localhost:9222"));
        assert_eq!(
            config.executable,
            Some(PathBuf::from("/usr/bin/chromium"))
        );

        std::env::remove_var("PARCELTRACK_PROXY");
        std::env::remove_var("BROWSER_URL");
        std::env::remove_var("CHROME_EXECUTABLE");
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let _guard = ENV_MUTEX.lock().unwrap();

        std::env::set_var("PARCELTRACK_PROXY", "");
        let config = BrowserEngineConfig::default().with_env_overrides();
        assert!(config.proxy.is_none());
        std::env::remove_var("PARCELTRACK_PROXY");
    }

    #[test]
    fn blocked_resources_parse_lowercase() {
        let parsed: Vec<BlockedResource> =
            serde_json::from_str(r#"["image", "font"]"#).unwrap();
        assert_eq!(
            parsed,
            vec![BlockedResource::Image, BlockedResource::Font]
        );
    }
}
