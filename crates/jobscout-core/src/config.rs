//! Configuration management for JobScout.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Desktop Chrome user agent sent by default to avoid basic bot rejection.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Upper bound accepted for `crawl.max_pages`.
const MAX_PAGES_LIMIT: u32 = 1000;

/// Main application configuration.
///
/// This is loaded from `~/.config/jobscout/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Page fetching settings
    pub fetch: FetchConfig,
    /// Headless browser settings
    pub browser: BrowserConfig,
    /// Crawl loop settings
    pub crawl: CrawlConfig,
    /// LLM extraction settings
    pub llm: LlmConfig,
    /// Output destinations
    pub output: OutputConfig,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit path.
    ///
    /// Unlike [`AppConfig::load`], a missing file is an error.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            });
        }

        tracing::debug!("Loading config from {}", path.display());
        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `JOBSCOUT_MAX_PAGES`: Override the pagination bound
    /// - `JOBSCOUT_HEADLESS`: Override browser headless mode (true/false)
    /// - `JOBSCOUT_USER_AGENT`: Override the request user agent
    /// - `JOBSCOUT_LLM_PROVIDER`: Override the LLM provider
    pub fn load_with_env(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => Self::load()?,
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup function.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("JOBSCOUT_MAX_PAGES") {
            if let Ok(max_pages) = val.parse() {
                self.crawl.max_pages = max_pages;
                tracing::debug!("Override crawl.max_pages from env: {}", max_pages);
            }
        }

        if let Some(val) = lookup("JOBSCOUT_HEADLESS") {
            if let Ok(headless) = val.parse() {
                self.browser.headless = headless;
                tracing::debug!("Override browser.headless from env: {}", headless);
            }
        }

        if let Some(val) = lookup("JOBSCOUT_USER_AGENT") {
            if !val.trim().is_empty() {
                tracing::debug!("Override fetch.user_agent from env");
                self.fetch.user_agent = val;
            }
        }

        if let Some(val) = lookup("JOBSCOUT_LLM_PROVIDER") {
            if !val.trim().is_empty() {
                tracing::debug!("Override llm.provider from env: {}", val);
                self.llm.provider = val;
            }
        }
    }

    /// Check values that would make a run misbehave.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.crawl.max_pages > MAX_PAGES_LIMIT {
            return Err(ConfigError::InvalidValue {
                field: "crawl.max_pages".to_string(),
                reason: format!("must be at most {MAX_PAGES_LIMIT}, got {}", self.crawl.max_pages),
            });
        }

        if self.crawl.concurrent_requests == 0 {
            return Err(ConfigError::InvalidValue {
                field: "crawl.concurrent_requests".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        if self.fetch.user_agent.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "fetch.user_agent".to_string(),
                reason: "cannot be empty".to_string(),
            });
        }

        if !(0.0..1.0).contains(&self.llm.overlap_rate) {
            return Err(ConfigError::InvalidValue {
                field: "llm.overlap_rate".to_string(),
                reason: format!("must be in [0.0, 1.0), got {}", self.llm.overlap_rate),
            });
        }

        if self.llm.chunk_token_threshold == 0 {
            return Err(ConfigError::InvalidValue {
                field: "llm.chunk_token_threshold".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    /// Write configuration as TOML to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        tracing::debug!("Saving config to {}", path.display());
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/jobscout/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("com", "jobscout", "jobscout").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

/// Page fetching settings shared by the HTTP and browser fetchers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// User agent string
    pub user_agent: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Retries for transient failures (0 = degrade without retrying)
    pub max_retries: u32,
    /// Base delay between retries in milliseconds
    pub retry_delay_ms: u64,
    /// Extra request headers
    pub headers: BTreeMap<String, String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 30,
            max_retries: 0,
            retry_delay_ms: 2000,
            headers: BTreeMap::new(),
        }
    }
}

/// Headless browser settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    pub headless: bool,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// Navigation timeout in seconds
    pub navigation_timeout_secs: u64,
    /// Pick a random desktop fingerprint instead of `fetch.user_agent`
    pub randomize_fingerprint: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1920,
            window_height: 1080,
            navigation_timeout_secs: 120,
            randomize_fingerprint: false,
        }
    }
}

/// Crawl loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Maximum number of "next page" continuations to follow
    pub max_pages: u32,
    /// Items processed per listing page (`None` = all)
    pub max_items_per_page: Option<usize>,
    /// Detail pages fetched concurrently
    pub concurrent_requests: usize,
    /// Delay before each continuation page in milliseconds
    pub page_delay_ms: u64,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_pages: 10,
            max_items_per_page: Some(10),
            concurrent_requests: 8,
            page_delay_ms: 0,
        }
    }
}

/// LLM extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider: `openai` (any OpenAI-compatible API) or `ollama`
    pub provider: String,
    /// Model name
    pub model: String,
    /// API base URL
    pub base_url: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Temperature for completions
    pub temperature: f32,
    /// Maximum tokens per completion
    pub max_tokens: u32,
    /// Approximate token budget per HTML chunk
    pub chunk_token_threshold: usize,
    /// Fraction of each chunk repeated at the start of the next
    pub overlap_rate: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "llama3-8b-8192".to_string(),
            base_url: "https://api.groq.com/openai/v1".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
            temperature: 0.1,
            max_tokens: 2000,
            chunk_token_threshold: 3500,
            overlap_rate: 0.15,
            timeout_secs: 120,
        }
    }
}

impl LlmConfig {
    /// Read the API key from the configured environment variable.
    #[must_use]
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

/// Output file format for record files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One JSON object per line
    #[default]
    Jsonl,
    /// Pretty-printed JSON array
    Json,
}

/// Output destinations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Records file written by the selector crawl
    pub records_path: PathBuf,
    /// Records file written by the LLM extraction
    pub llm_records_path: PathBuf,
    /// Error artifact path
    pub error_log_path: PathBuf,
    /// Format of the selector crawl records file
    pub format: OutputFormat,
    /// Characters of raw output kept in error artifacts
    pub error_excerpt_chars: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            records_path: PathBuf::from("jobs.jsonl"),
            llm_records_path: PathBuf::from("jobs_output.txt"),
            error_log_path: PathBuf::from("jobs_error_log.txt"),
            format: OutputFormat::Jsonl,
            error_excerpt_chars: 2000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.crawl.max_pages, 10);
        assert_eq!(config.crawl.max_items_per_page, Some(10));
        assert_eq!(config.fetch.max_retries, 0);
        assert!(config.fetch.user_agent.starts_with("Mozilla/5.0"));
        assert!(config.browser.headless);
        assert_eq!(config.llm.chunk_token_threshold, 3500);
        assert_eq!(config.output.error_excerpt_chars, 2000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("[fetch]"));
        assert!(toml_str.contains("[crawl]"));
        assert!(toml_str.contains("[llm]"));

        let parsed: AppConfig = toml::from_str(&toml_str).expect("parse serialized config");
        assert_eq!(parsed.crawl.max_pages, config.crawl.max_pages);
        assert_eq!(parsed.output.format, OutputFormat::Jsonl);
    }

    #[test]
    fn test_config_load_from_file() {
        let tmp = TempDir::new().expect("create temp dir");
        let config_path = tmp.path().join("config.toml");

        let mut config = AppConfig::default();
        config.crawl.max_pages = 3;
        config.fetch.headers.insert("Accept-Language".to_string(), "en-PH".to_string());

        let contents = toml::to_string_pretty(&config).expect("serialize config");
        fs::write(&config_path, contents).expect("write config file");

        let loaded = AppConfig::load_from(&config_path).expect("load config");
        assert_eq!(loaded.crawl.max_pages, 3);
        assert_eq!(
            loaded.fetch.headers.get("Accept-Language").map(String::as_str),
            Some("en-PH")
        );
    }

    #[test]
    fn test_save_to_then_load() {
        let temp_dir = TempDir::new().expect("create temp dir");
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = AppConfig::default();
        config.crawl.max_pages = 3;
        config.llm.provider = "ollama".to_string();
        config.save_to(&path).expect("save config");

        let loaded = AppConfig::load_from(&path).expect("load config");
        assert_eq!(loaded.crawl.max_pages, 3);
        assert_eq!(loaded.llm.provider, "ollama");
        assert_eq!(loaded.fetch.user_agent, DEFAULT_USER_AGENT);
    }

    #[test]
    fn test_load_from_missing_file() {
        let result = AppConfig::load_from(Path::new("/nonexistent/jobscout/config.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound { .. })));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("JOBSCOUT_MAX_PAGES", "2"),
            ("JOBSCOUT_HEADLESS", "false"),
            ("JOBSCOUT_USER_AGENT", "TestAgent/1.0"),
            ("JOBSCOUT_LLM_PROVIDER", "ollama"),
        ]);

        let mut config = AppConfig::default();
        config.apply_env_overrides(|key| vars.get(key).map(ToString::to_string));

        assert_eq!(config.crawl.max_pages, 2);
        assert!(!config.browser.headless);
        assert_eq!(config.fetch.user_agent, "TestAgent/1.0");
        assert_eq!(config.llm.provider, "ollama");
    }

    #[test]
    fn test_env_overrides_ignore_garbage() {
        let mut config = AppConfig::default();
        config.apply_env_overrides(|key| match key {
            "JOBSCOUT_MAX_PAGES" => Some("many".to_string()),
            "JOBSCOUT_USER_AGENT" => Some("  ".to_string()),
            _ => None,
        });

        assert_eq!(config.crawl.max_pages, 10);
        assert!(config.fetch.user_agent.starts_with("Mozilla/5.0"));
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[crawl]
max_pages = 2

[output]
format = "json"
"#;

        let config: AppConfig = toml::from_str(toml_str).expect("parse partial config");
        assert_eq!(config.crawl.max_pages, 2);
        assert_eq!(config.output.format, OutputFormat::Json);
        // These should be defaults
        assert_eq!(config.crawl.concurrent_requests, 8);
        assert!(config.browser.headless);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.crawl.concurrent_requests = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.llm.overlap_rate = 1.5;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.crawl.max_pages = 5000;
        assert!(config.validate().is_err());
    }
}
