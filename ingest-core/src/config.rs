//! Extraction and fetch configuration.
//!
//! Locale label tables and URL patterns are data so new locales or sites can
//! be supported without code changes. The compiled defaults target Cookpad VN.

use std::env;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default cap on items collected by the heading-anchored section search.
pub const DEFAULT_MAX_SECTION_ITEMS: usize = 50;

/// Default delay between requests to the same host.
pub const DEFAULT_RATE_LIMIT_MS: u64 = 1000;

/// Default number of retries for transport errors and retryable statuses.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Base delay between retries; attempt `n` waits `n` times this.
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; recipe-ingest/0.1; +https://github.com/recipe-ingest)";

/// HTTP statuses the fetcher retries before handing the response over.
pub const RETRY_STATUSES: &[u16] = &[429, 500, 502, 503, 504];

/// On-disk/serialized form of the extraction settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractSettings {
    /// Heading prefixes that introduce the ingredient list, in priority order
    pub ingredient_labels: Vec<String>,
    /// Heading prefixes that introduce the instruction list, in priority order
    pub instruction_labels: Vec<String>,
    /// Labels next to which the servings text appears
    pub servings_labels: Vec<String>,
    /// Stripped from the end of `<title>` when it is used as the recipe name
    pub title_suffix_pattern: String,
    /// Final URLs after a redirect must match this to count as a recipe page
    pub target_url_pattern: String,
    pub max_section_items: usize,
}

impl Default for ExtractSettings {
    fn default() -> Self {
        Self {
            ingredient_labels: vec![
                "Nguyên Liệu".to_string(),
                "Nguyên liệu".to_string(),
                "Ingredients".to_string(),
            ],
            instruction_labels: vec![
                "Hướng dẫn cách làm".to_string(),
                "Cách làm".to_string(),
                "Directions".to_string(),
                "Instructions".to_string(),
            ],
            servings_labels: vec!["Khẩu phần".to_string(), "Servings".to_string()],
            title_suffix_pattern: r"\s*\|\s*Cookpad.*$".to_string(),
            target_url_pattern: r"^https?://(www\.)?cookpad\.com/vn/(cong-thuc|recipes)/\d+"
                .to_string(),
            max_section_items: DEFAULT_MAX_SECTION_ITEMS,
        }
    }
}

/// Validated extraction configuration with compiled patterns.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    settings: ExtractSettings,
    title_suffix: Regex,
    target_url: Regex,
}

static DEFAULT_CONFIG: LazyLock<ExtractConfig> = LazyLock::new(|| {
    ExtractConfig::new(ExtractSettings::default()).expect("Invalid default extract config")
});

impl ExtractConfig {
    pub fn new(settings: ExtractSettings) -> Result<Self, ConfigError> {
        let title_suffix = Regex::new(&settings.title_suffix_pattern).map_err(|source| {
            ConfigError::InvalidPattern {
                field: "title_suffix_pattern",
                source,
            }
        })?;
        let target_url = Regex::new(&settings.target_url_pattern).map_err(|source| {
            ConfigError::InvalidPattern {
                field: "target_url_pattern",
                source,
            }
        })?;
        Ok(Self {
            settings,
            title_suffix,
            target_url,
        })
    }

    /// Process-wide default configuration, compiled once.
    pub fn default_ref() -> &'static ExtractConfig {
        &DEFAULT_CONFIG
    }

    /// Load settings from a JSON file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let settings: ExtractSettings = serde_json::from_str(&content)?;
        Self::new(settings)
    }

    /// Load from `INGEST_EXTRACT_CONFIG` if set, otherwise use the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        match env::var("INGEST_EXTRACT_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path)),
            Err(_) => Ok(Self::default_ref().clone()),
        }
    }

    pub fn ingredient_labels(&self) -> &[String] {
        &self.settings.ingredient_labels
    }

    pub fn instruction_labels(&self) -> &[String] {
        &self.settings.instruction_labels
    }

    pub fn servings_labels(&self) -> &[String] {
        &self.settings.servings_labels
    }

    pub fn max_section_items(&self) -> usize {
        self.settings.max_section_items
    }

    /// Strip the trailing site name from a page title.
    pub fn strip_title_suffix(&self, title: &str) -> String {
        self.title_suffix.replace(title, "").trim().to_string()
    }

    /// Whether a URL has the shape of a recipe page.
    pub fn is_target_url(&self, url: &str) -> bool {
        self.target_url.is_match(url)
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self::default_ref().clone()
    }
}

/// Fetch layer settings.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub rate_limit: Duration,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            rate_limit: Duration::from_millis(DEFAULT_RATE_LIMIT_MS),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl FetchConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional:
    /// - `INGEST_RATE_LIMIT_MS`: delay between requests to one host (default: 1000)
    /// - `INGEST_TIMEOUT_SECS`: request timeout (default: 30)
    /// - `INGEST_MAX_RETRIES`: retries for transport errors and 429/5xx (default: 5)
    /// - `INGEST_RETRY_BACKOFF_MS`: base retry delay, grows linearly (default: 500)
    /// - `INGEST_USER_AGENT`: User-Agent header
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let rate_limit = env::var("INGEST_RATE_LIMIT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.rate_limit);

        let timeout = env::var("INGEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);

        let max_retries = env::var("INGEST_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_retries);

        let retry_backoff = env::var("INGEST_RETRY_BACKOFF_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.retry_backoff);

        let user_agent = env::var("INGEST_USER_AGENT").unwrap_or(defaults.user_agent);

        Self {
            rate_limit,
            timeout,
            max_retries,
            retry_backoff,
            user_agent,
        }
    }
}
