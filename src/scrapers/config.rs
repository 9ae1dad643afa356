//! Scraper configuration and browser engine selection.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::browser::{BrowserEngineConfig, BrowserEngineType};

/// Listing pages to paginate over. `{page}` is replaced with the page number;
/// without a placeholder the number is appended.
pub const DEFAULT_BASE_URL: &str = "https://www.rottentomatoes.com/browse/movies_at_home/?page=";

/// Settings for the list and detail scrape stages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScraperConfig {
    /// Listing URL template.
    pub base_url: String,
    /// Number of listing pages, visited as `0..page_count`.
    pub page_count: u32,
    /// Maximum concurrent page loads (fetch permits).
    pub concurrency: usize,
    /// Per-page timeout for listing pages, in seconds.
    pub list_timeout: u64,
    /// Per-page timeout for detail pages, in seconds.
    pub detail_timeout: u64,
    /// Time to let a listing page settle after navigation, in milliseconds.
    pub list_settle_ms: u64,
    /// Time to let a detail page settle after navigation, in milliseconds.
    pub detail_settle_ms: u64,
    /// Maximum time to wait for a selector to appear, in seconds.
    pub wait_timeout: u64,
    /// Detail candidates per batch.
    pub batch_size: usize,
    /// Pause between detail batches, in milliseconds.
    pub batch_delay_ms: u64,
    /// Skip listing candidates whose normalized title was already seen.
    pub dedup_titles: bool,
    /// Browser engine settings.
    pub browser: BrowserConfig,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            page_count: 8,
            concurrency: 3,
            list_timeout: 60,
            detail_timeout: 30,
            list_settle_ms: 1000,
            detail_settle_ms: 2000,
            wait_timeout: 10,
            batch_size: 10,
            batch_delay_ms: 1000,
            dedup_titles: true,
            browser: BrowserConfig::default(),
        }
    }
}

impl ScraperConfig {
    pub fn list_timeout(&self) -> Duration {
        Duration::from_secs(self.list_timeout)
    }

    pub fn detail_timeout(&self) -> Duration {
        Duration::from_secs(self.detail_timeout)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout)
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    /// URL of listing page `page`.
    pub fn list_page_url(&self, page: u32) -> String {
        list_page_url(&self.base_url, page)
    }
}

/// Expand a listing URL template for one page number.
pub fn list_page_url(template: &str, page: u32) -> String {
    if template.contains("{page}") {
        template.replace("{page}", &page.to_string())
    } else {
        format!("{}{}", template, page)
    }
}

/// Browser settings as written in the config file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BrowserConfig {
    /// Engine: "chromium" (headless Chrome) or "http" (plain GET, no JS).
    pub engine: String,
    /// Run Chrome without a visible window.
    pub headless: bool,
    /// Connect to an already-running Chrome DevTools endpoint instead of launching one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,
    /// Proxy server for all page loads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    /// Extra Chrome command line arguments.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub chrome_args: Vec<String>,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            engine: "chromium".to_string(),
            headless: true,
            remote_url: None,
            proxy: None,
            chrome_args: Vec::new(),
            viewport_width: 1280,
            viewport_height: 800,
        }
    }
}

impl BrowserConfig {
    /// Convert to BrowserEngineConfig.
    pub fn to_engine_config(&self, user_agent: &str) -> BrowserEngineConfig {
        let engine = match self.engine.to_lowercase().as_str() {
            "http" | "static" => BrowserEngineType::Http,
            "chromium" | "chrome" => BrowserEngineType::Chromium,
            _ => BrowserEngineType::Chromium,
        };

        BrowserEngineConfig {
            engine,
            headless: self.headless,
            remote_url: self.remote_url.clone(),
            proxy: self.proxy.clone(),
            chrome_args: self.chrome_args.clone(),
            viewport: (self.viewport_width, self.viewport_height),
            user_agent: user_agent.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_page_url_appends_or_substitutes() {
        assert_eq!(
            list_page_url("https://example.com/browse?page=", 3),
            "https://example.com/browse?page=3"
        );
        assert_eq!(
            list_page_url("https://example.com/browse/{page}/all", 0),
            "https://example.com/browse/0/all"
        );
    }

    #[test]
    fn test_browser_config_to_engine_config() {
        let config = BrowserConfig {
            engine: "chromium".to_string(),
            headless: false,
            proxy: Some("socks5://127.0.0.1:1080".to_string()),
            ..Default::default()
        };

        let engine_config = config.to_engine_config("moviepipe-test");
        assert!(matches!(engine_config.engine, BrowserEngineType::Chromium));
        assert!(!engine_config.headless);
        assert_eq!(
            engine_config.proxy,
            Some("socks5://127.0.0.1:1080".to_string())
        );
        assert_eq!(engine_config.viewport, (1280, 800));
        assert_eq!(engine_config.user_agent, "moviepipe-test");
    }

    #[test]
    fn test_browser_engine_type_parsing() {
        let http = BrowserConfig {
            engine: "HTTP".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            http.to_engine_config("ua").engine,
            BrowserEngineType::Http
        ));

        // Unknown defaults to Chromium
        let unknown = BrowserConfig {
            engine: "unknown".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            unknown.to_engine_config("ua").engine,
            BrowserEngineType::Chromium
        ));
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: ScraperConfig =
            serde_json::from_str(r#"{"page_count": 2, "browser": {"engine": "http"}}"#).unwrap();
        assert_eq!(config.page_count, 2);
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.browser.engine, "http");
        assert!(config.browser.headless);
    }
}
