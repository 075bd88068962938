//! Stealth evasion applied before any page script runs.
//!
//! Script set based on puppeteer-extra-plugin-stealth techniques; injected
//! via `Page.addScriptToEvaluateOnNewDocument` so the overrides are in place
//! before the target site's own scripts can probe for automation signals.

use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::Page;
use rand::seq::SliceRandom;
use tracing::debug;

use crate::config::BrowserEngineConfig;
use crate::error::ScrapeError;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36";

const STEALTH_SCRIPTS: &[&str] = &[
    // Remove webdriver property
    r#"
    Object.defineProperty(navigator, 'webdriver', {
        get: () => undefined,
        configurable: true
    });
    "#,
    // Fix chrome object
    r#"
    window.chrome = {
        runtime: {},
        loadTimes: function() {},
        csi: function() {},
        app: {}
    };
    "#,
    // Fix permissions
    r#"
    const originalQuery = window.navigator.permissions.query;
    window.navigator.permissions.query = (parameters) => (
        parameters.name === 'notifications' ?
        Promise.resolve({ state: Notification.permission }) :
        originalQuery(parameters)
    );
    "#,
    // Fix plugins (make it look like regular Chrome)
    r#"
    Object.defineProperty(navigator, 'plugins', {
        get: () => [
            { name: 'Chrome PDF Plugin', filename: 'internal-pdf-viewer', description: 'Portable Document Format' },
            { name: 'Chrome PDF Viewer', filename: 'mhjfbmdgcfjbbpaeojofohoefgiehjai', description: '' },
            { name: 'Native Client', filename: 'internal-nacl-plugin', description: '' }
        ],
        configurable: true
    });
    "#,
    // Fix languages
    r#"
    Object.defineProperty(navigator, 'languages', {
        get: () => ['en-US', 'en'],
        configurable: true
    });
    "#,
    // Fix platform (if on Linux, keep it; don't pretend to be Windows)
    r#"
    if (!navigator.platform.includes('Win')) {
        Object.defineProperty(navigator, 'platform', {
            get: () => 'Linux x86_64',
            configurable: true
        });
    }
    "#,
    // Remove automation-related properties
    r#"
    delete window.cdc_adoQpoasnfa76pfcZLmcfl_Array;
    delete window.cdc_adoQpoasnfa76pfcZLmcfl_Promise;
    delete window.cdc_adoQpoasnfa76pfcZLmcfl_Symbol;
    "#,
    // Fix WebGL vendor/renderer (common detection vector)
    r#"
    const getParameter = WebGLRenderingContext.prototype.getParameter;
    WebGLRenderingContext.prototype.getParameter = function(parameter) {
        if (parameter === 37445) {
            return 'Intel Inc.';
        }
        if (parameter === 37446) {
            return 'Intel Iris OpenGL Engine';
        }
        return getParameter.call(this, parameter);
    };
    "#,
];

/// Apply the user agent, language preference and evasion scripts to a fresh
/// page, before any navigation happens.
pub async fn prepare(page: &Page, config: &BrowserEngineConfig) -> Result<(), ScrapeError> {
    let user_agent = pick_user_agent(&config.user_agents);
    debug!(%user_agent, "configuring session identity");

    let override_params = SetUserAgentOverrideParams::builder()
        .user_agent(user_agent)
        .accept_language(config.accept_language.clone())
        .build()
        .map_err(|e| ScrapeError::Launch(format!("user agent override: {e}")))?;
    page.set_user_agent(override_params)
        .await
        .map_err(|e| ScrapeError::Launch(format!("user agent override: {e}")))?;

    for script in STEALTH_SCRIPTS {
        let params = AddScriptToEvaluateOnNewDocumentParams::builder()
            .source(*script)
            .build()
            .map_err(|e| ScrapeError::Launch(format!("stealth script: {e}")))?;
        page.evaluate_on_new_document(params)
            .await
            .map_err(|e| ScrapeError::Launch(format!("stealth injection: {e}")))?;
    }

    Ok(())
}

fn pick_user_agent(pool: &[String]) -> String {
    pool.choose(&mut rand::thread_rng())
        .cloned()
        .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_pool_falls_back_to_default() {
        assert_eq!(pick_user_agent(&[]), DEFAULT_USER_AGENT);
    }

    #[test]
    fn single_entry_pool_is_deterministic() {
        let pool = vec!["custom-agent/1.0".to_string()];
        assert_eq!(pick_user_agent(&pool), "custom-agent/1.0");
    }

    #[test]
    fn selection_stays_inside_the_pool() {
        let pool: Vec<String> = (0..5).map(|i| format!("agent-{i}")).collect();
        for _ in 0..20 {
            assert!(pool.contains(&pick_user_agent(&pool)));
        }
    }

    #[test]
    fn scripts_cover_the_core_evasions() {
        let joined = STEALTH_SCRIPTS.concat();
        assert!(joined.contains("webdriver"));
        assert!(joined.contains("plugins"));
        assert!(joined.contains("languages"));
        assert!(joined.contains("permissions"));
    }
}
