//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Page fetching and retry behavior
    #[serde(default)]
    pub scraper: ScraperConfig,

    /// Optional rendering service used instead of plain HTTP
    #[serde(default)]
    pub renderer: RendererConfig,

    /// CSS selectors for quotation markup
    #[serde(default)]
    pub selectors: QuoteSelectors,

    /// Filesystem locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Report rendering settings
    #[serde(default)]
    pub report: ReportConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.scraper.user_agent.trim().is_empty() {
            return Err(AppError::validation("scraper.user_agent is empty"));
        }
        if self.scraper.timeout_secs == 0 {
            return Err(AppError::validation("scraper.timeout_secs must be > 0"));
        }
        if self.scraper.max_attempts == 0 {
            return Err(AppError::validation("scraper.max_attempts must be > 0"));
        }
        url::Url::parse(&self.scraper.start_url)
            .map_err(|e| AppError::validation(format!("scraper.start_url: {e}")))?;
        if let Some(endpoint) = &self.renderer.endpoint {
            url::Url::parse(endpoint)
                .map_err(|e| AppError::validation(format!("renderer.endpoint: {e}")))?;
        }
        self.selectors.validate()?;
        if self.report.sample_size == 0 {
            return Err(AppError::validation("report.sample_size must be > 0"));
        }
        if self.paths.database.as_os_str().is_empty() {
            return Err(AppError::validation("paths.database is empty"));
        }
        Ok(())
    }
}

/// Page fetching and retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// First page of the paginated listing
    #[serde(default = "defaults::start_url")]
    pub start_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Per-navigation timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Attempts per page before giving up on it
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    /// Fixed wait between attempts in seconds
    #[serde(default = "defaults::backoff")]
    pub backoff_secs: u64,

    /// Stop after this many pages (unbounded if unset)
    #[serde(default)]
    pub max_pages: Option<usize>,
}

impl ScraperConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            start_url: defaults::start_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_attempts: defaults::max_attempts(),
            backoff_secs: defaults::backoff(),
            max_pages: None,
        }
    }
}

/// Browserless-style rendering service.
///
/// When `endpoint` is set, pages are fetched through `{endpoint}/content`
/// and failure captures include an image from `{endpoint}/screenshot`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RendererConfig {
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub token: Option<String>,
}

/// CSS selectors for the quotation listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteSelectors {
    #[serde(default = "defaults::quote_selector")]
    pub quote: String,

    #[serde(default = "defaults::text_selector")]
    pub text: String,

    #[serde(default = "defaults::author_selector")]
    pub author: String,

    #[serde(default = "defaults::author_link_selector")]
    pub author_link: String,

    #[serde(default = "defaults::tag_selector")]
    pub tag: String,

    #[serde(default = "defaults::next_selector")]
    pub next: String,
}

impl QuoteSelectors {
    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("quote", &self.quote),
            ("text", &self.text),
            ("author", &self.author),
            ("author_link", &self.author_link),
            ("tag", &self.tag),
            ("next", &self.next),
        ] {
            scraper::Selector::parse(value).map_err(|e| {
                AppError::selector(format!("selectors.{name} = {value}"), format!("{e:?}"))
            })?;
        }
        Ok(())
    }
}

impl Default for QuoteSelectors {
    fn default() -> Self {
        Self {
            quote: defaults::quote_selector(),
            text: defaults::text_selector(),
            author: defaults::author_selector(),
            author_link: defaults::author_link_selector(),
            tag: defaults::tag_selector(),
            next: defaults::next_selector(),
        }
    }
}

/// Filesystem locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "defaults::database")]
    pub database: PathBuf,

    /// Root for per-run failure artifacts
    #[serde(default = "defaults::failure_dir")]
    pub failure_dir: PathBuf,

    #[serde(default = "defaults::reports_dir")]
    pub reports_dir: PathBuf,

    #[serde(default = "defaults::exports_dir")]
    pub exports_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            database: defaults::database(),
            failure_dir: defaults::failure_dir(),
            reports_dir: defaults::reports_dir(),
            exports_dir: defaults::exports_dir(),
        }
    }
}

/// Report rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// How many new quotations the run report samples
    #[serde(default = "defaults::sample_size")]
    pub sample_size: usize,

    /// Entries listed per section of `summary.md`
    #[serde(default = "defaults::top_n")]
    pub top_n: usize,

    /// Entries kept per ranking in `stats.json`
    #[serde(default = "defaults::stats_limit")]
    pub stats_limit: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            sample_size: defaults::sample_size(),
            top_n: defaults::top_n(),
            stats_limit: defaults::stats_limit(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Scraper defaults
    pub fn start_url() -> String {
        "https://quotes.toscrape.com/".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; quote-pulse/0.1)".into()
    }
    pub fn timeout() -> u64 {
        10
    }
    pub fn max_attempts() -> u32 {
        3
    }
    pub fn backoff() -> u64 {
        2
    }

    // Selector defaults (quotes.toscrape.com markup)
    pub fn quote_selector() -> String {
        "div.quote".into()
    }
    pub fn text_selector() -> String {
        "span.text".into()
    }
    pub fn author_selector() -> String {
        "small.author".into()
    }
    pub fn author_link_selector() -> String {
        "span a[href*='/author/']".into()
    }
    pub fn tag_selector() -> String {
        "a.tag".into()
    }
    pub fn next_selector() -> String {
        "li.next a".into()
    }

    // Path defaults
    pub fn database() -> PathBuf {
        PathBuf::from("data/quotes.db")
    }
    pub fn failure_dir() -> PathBuf {
        PathBuf::from("artifacts/failures")
    }
    pub fn reports_dir() -> PathBuf {
        PathBuf::from("reports")
    }
    pub fn exports_dir() -> PathBuf {
        PathBuf::from("exports")
    }

    // Report defaults
    pub fn sample_size() -> usize {
        10
    }
    pub fn top_n() -> usize {
        10
    }
    pub fn stats_limit() -> usize {
        100
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.scraper.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_attempts() {
        let mut config = Config::default();
        config.scraper.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_selector() {
        let mut config = Config::default();
        config.selectors.next = "[[invalid".to_string();
        assert!(matches!(config.validate(), Err(AppError::Selector { .. })));
    }

    #[test]
    fn validate_rejects_bad_renderer_endpoint() {
        let mut config = Config::default();
        config.renderer.endpoint = Some("not a url".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [scraper]
            max_pages = 3
            backoff_secs = 0

            [paths]
            database = "/tmp/q.db"
            "#,
        )
        .unwrap();

        assert_eq!(config.scraper.max_pages, Some(3));
        assert_eq!(config.scraper.backoff(), Duration::ZERO);
        assert_eq!(config.scraper.max_attempts, 3);
        assert_eq!(config.paths.database, PathBuf::from("/tmp/q.db"));
        assert_eq!(config.paths.reports_dir, PathBuf::from("reports"));
        assert_eq!(config.selectors.next, "li.next a");
    }

    #[test]
    fn sample_config_is_valid() {
        let config: Config = toml::from_str(include_str!("../../quote-pulse.toml")).unwrap();
        assert!(config.validate().is_ok());
        assert!(config.renderer.endpoint.is_none());
        assert_eq!(config.report.stats_limit, 100);
    }

    #[test]
    fn load_or_default_falls_back_on_missing_file() {
        let config = Config::load_or_default("/definitely/not/here.toml");
        assert_eq!(config.scraper.start_url, "https://quotes.toscrape.com/");
    }
}
