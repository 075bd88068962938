//! Application settings.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use super::BrowserEngineConfig;

/// Config file consulted when no explicit path is given.
const DEFAULT_CONFIG_FILE: &str = "parceltrack.toml";

/// Retry policy and pipeline limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Number of independent attempts before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay between attempts in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Optional hard deadline for the whole retry sequence, in seconds.
    /// Expiry cancels the in-flight attempt and skips the rest.
    #[serde(default)]
    pub overall_deadline_secs: Option<u64>,

    /// Cap on simultaneous browser sessions across all requests.
    #[serde(default = "default_max_sessions")]
    pub max_concurrent_sessions: usize,

    /// Base URL the tracking number is appended to.
    #[serde(default = "default_tracking_url")]
    pub tracking_url: String,

    /// Directory for per-attempt diagnostic artifacts (HTML snapshots,
    /// screenshots). Disabled when unset.
    #[serde(default)]
    pub artifacts_dir: Option<PathBuf>,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            overall_deadline_secs: None,
            max_concurrent_sessions: default_max_sessions(),
            tracking_url: default_tracking_url(),
            artifacts_dir: None,
        }
    }
}

impl ScrapeConfig {
    /// Apply environment variable overrides.
    ///
    /// - `PARCELTRACK_MAX_ATTEMPTS` - Retry limit
    /// - `PARCELTRACK_RETRY_DELAY_MS` - Delay between attempts
    /// - `PARCELTRACK_ARTIFACTS_DIR` - Diagnostic artifact directory
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(attempts) = env_parse("PARCELTRACK_MAX_ATTEMPTS") {
            self.max_attempts = attempts;
        }
        if let Some(delay) = env_parse("PARCELTRACK_RETRY_DELAY_MS") {
            self.retry_delay_ms = delay;
        }
        if let Ok(dir) = env::var("PARCELTRACK_ARTIFACTS_DIR") {
            if !dir.is_empty() {
                self.artifacts_dir = Some(PathBuf::from(dir));
            }
        }
        self
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn overall_deadline(&self) -> Option<Duration> {
        self.overall_deadline_secs.map(Duration::from_secs)
    }

    /// Build the page URL for one tracking number.
    pub fn tracking_url_for(&self, tracking_number: &str) -> String {
        format!(
            "{}/{}",
            self.tracking_url.trim_end_matches('/'),
            urlencoding::encode(tracking_number)
        )
    }
}

/// HTTP server bind settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub scrape: ScrapeConfig,
    #[serde(default)]
    pub browser: BrowserEngineConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Settings {
    /// Load settings from a TOML file (explicit path, or `parceltrack.toml`
    /// in the working directory when present), then apply environment
    /// overrides. The result is read-only for the rest of the process.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };

        settings.scrape = settings.scrape.with_env_overrides();
        settings.browser = settings.browser.with_env_overrides();

        url::Url::parse(&settings.scrape.tracking_url)
            .with_context(|| format!("invalid tracking_url: {}", settings.scrape.tracking_url))?;

        Ok(settings)
    }

    fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    2000
}

fn default_max_sessions() -> usize {
    4
}

fn default_tracking_url() -> String {
    "https://parcelsapp.com/en/tracking".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn defaults_match_observed_policy() {
        let config = ScrapeConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.retry_delay(), Duration::from_millis(2000));
        assert!(config.overall_deadline().is_none());
        assert!(config.artifacts_dir.is_none());
    }

    #[test]
    fn tracking_url_is_escaped() {
        let config = ScrapeConfig::default();
        assert_eq!(
            config.tracking_url_for("AB 123/4"),
            "https://parcelsapp.com/en/tracking/AB%20123%2F4"
        );
    }

    #[test]
    fn tracking_url_tolerates_trailing_slash() {
        let config = ScrapeConfig {
            tracking_url: "https://parcelsapp.com/en/tracking/".into(),
            ..Default::default()
        };
        assert_eq!(
            config.tracking_url_for("ABC123"),
            "https://parcelsapp.com/en/tracking/ABC123"
        );
    }

    #[test]
    fn load_reads_toml_and_env() {
        let _guard = ENV_MUTEX.lock().unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[scrape]
max_attempts = 5

[server]
port = 9000
"#
        )
        .unwrap();

        std::env::set_var("PARCELTRACK_RETRY_DELAY_MS", "250");
        let settings = Settings::load(Some(file.path())).unwrap();
        std::env::remove_var("PARCELTRACK_RETRY_DELAY_MS");

        assert_eq!(settings.scrape.max_attempts, 5);
        assert_eq!(settings.scrape.retry_delay_ms, 250);
        assert_eq!(settings.server.port, 9000);
        // untouched sections keep their defaults
        assert!(settings.browser.headless);
    }

    #[test]
    fn load_rejects_invalid_tracking_url() {
        let _guard = ENV_MUTEX.lock().unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[scrape]
tracking_url = "not a url"
"#
        )
        .unwrap();

        assert!(Settings::load(Some(file.path())).is_err());
    }
}
