use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::PathBuf;
use url::Url;

use crate::document::LayoutConfig;
use crate::errors::ConfigError;

/// Application configuration module
/// This module handles the application configuration: document layout,
/// retrieval settings, the fetch cache and logging.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Page, spacing and style settings for generated documents
    #[serde(default)]
    pub document: LayoutConfig,

    /// How scripts are retrieved
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Fetch cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// A Cargo table query returning script entries for a name
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CargoQuery {
    /// Cargo table name
    pub table: String,

    /// Field matched against the requested name
    pub name_field: String,

    /// Field holding the entry title
    pub title_field: String,

    /// Field holding the script page name
    pub target_field: String,

    /// Optional `order_by` clause
    #[serde(default)]
    pub order_by: Option<String>,

    /// Maximum rows requested
    #[serde(default = "default_query_limit")]
    pub limit: u32,
}

impl CargoQuery {
    fn validate(&self, field: &str) -> Result<(), ConfigError> {
        for (name, value) in [
            ("table", &self.table),
            ("name_field", &self.name_field),
            ("title_field", &self.title_field),
            ("target_field", &self.target_field),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::invalid(format!("{}.{}", field, name), "must not be empty"));
            }
        }
        if self.limit == 0 {
            return Err(ConfigError::invalid(format!("{}.limit", field), "must be at least 1"));
        }
        Ok(())
    }
}

impl Default for CargoQuery {
    fn default() -> Self {
        Self {
            table: "char_memory".to_string(),
            name_field: "_pageName".to_string(),
            title_field: "storySetName".to_string(),
            target_field: "storyTxt".to_string(),
            order_by: None,
            limit: default_query_limit(),
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FetchConfig {
    /// Wiki home; script pages live under `<home_url>w/<page>`
    #[serde(default = "default_home_url")]
    pub home_url: String,

    /// MediaWiki API endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Query listing a character's records
    #[serde(default)]
    pub character_query: CargoQuery,

    /// Query listing a chapter's scripts; without one, a chapter name is a single script page
    #[serde(default)]
    pub chapter_query: Option<CargoQuery>,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries after the first attempt
    #[serde(default = "default_retry_count")]
    pub max_retries: u32,

    /// Base delay for exponential backoff
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Pause after every HTTP request
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Names loaded at the same time
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,

    /// Read scripts from this directory instead of the wiki
    #[serde(default)]
    pub source_dir: Option<PathBuf>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            home_url: default_home_url(),
            api_url: default_api_url(),
            user_agent: default_user_agent(),
            character_query: CargoQuery::default(),
            chapter_query: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            request_delay_ms: default_request_delay_ms(),
            concurrent_requests: default_concurrent_requests(),
            source_dir: None,
        }
    }
}

/// Fetch cache configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CacheConfig {
    /// Persist fetched text between runs
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Database file; defaults to the user data directory
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: default_true(), path: None }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Upper bound for `fetch.concurrent_requests`
const MAX_CONCURRENT_REQUESTS: usize = 16;

/// Upper bound for `fetch.max_retries`
const MAX_RETRIES: u32 = 10;

fn default_home_url() -> String {
    "https://prts.wiki/".to_string()
}

fn default_api_url() -> String {
    "https://prts.wiki/api.php".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64)".to_string()
}

fn default_query_limit() -> u32 {
    5000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_request_delay_ms() -> u64 {
    500
}

fn default_concurrent_requests() -> usize {
    1
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Validate the configuration for consistency and required values
    ///
    /// The `document` section is validated when it is deserialized.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.fetch.validate()
    }
}

impl FetchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [("fetch.home_url", &self.home_url), ("fetch.api_url", &self.api_url)] {
            Url::parse(value).map_err(|e| ConfigError::invalid(field, format!("'{}' is not a URL: {}", value, e)))?;
        }

        if !self.home_url.ends_with('/') {
            return Err(ConfigError::invalid("fetch.home_url", "must end with '/'"));
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::invalid("fetch.timeout_secs", "must be at least 1"));
        }

        if self.max_retries > MAX_RETRIES {
            return Err(ConfigError::invalid(
                "fetch.max_retries",
                format!("{} exceeds the maximum of {}", self.max_retries, MAX_RETRIES),
            ));
        }

        if self.concurrent_requests == 0 || self.concurrent_requests > MAX_CONCURRENT_REQUESTS {
            return Err(ConfigError::invalid(
                "fetch.concurrent_requests",
                format!("{} is outside 1..={}", self.concurrent_requests, MAX_CONCURRENT_REQUESTS),
            ));
        }

        self.character_query.validate("fetch.character_query")?;
        if let Some(query) = &self.chapter_query {
            query.validate("fetch.chapter_query")?;
        }

        Ok(())
    }
}
