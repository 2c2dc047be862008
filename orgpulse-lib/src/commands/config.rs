use crate::Result;
use crate::github::ClientSettings;
use camino::{Utf8Path, Utf8PathBuf};
use core::time::Duration;
use ohno::{IntoAppError, app_err};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use url::Url;

/// The default configuration TOML content, embedded from `default_config.toml`
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../../default_config.toml");

/// Name of the configuration file looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "orgpulse.toml";

const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Base URL of the GitHub REST API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Remaining requests at or below which the client waits for a reset
    #[serde(default = "default_safety_margin")]
    pub safety_margin: u64,

    /// Attempts per request for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_backoff_base", with = "humantime_serde")]
    pub backoff_base: Duration,

    /// Longest quota wait before the crawl stops
    #[serde(default = "default_max_rate_limit_wait", with = "humantime_serde")]
    pub max_rate_limit_wait: Duration,

    #[serde(default = "default_pacing_delay", with = "humantime_serde")]
    pub pacing_delay: Duration,

    #[serde(default = "default_status_failure_delay", with = "humantime_serde")]
    pub status_failure_delay: Duration,

    #[serde(default = "default_page_size")]
    pub page_size: u32,

    #[serde(default = "default_max_search_pages")]
    pub max_search_pages: u32,

    #[serde(default = "default_hall_of_fame_size")]
    pub hall_of_fame_size: usize,
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

const fn default_safety_margin() -> u64 {
    5
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_backoff_base() -> Duration {
    Duration::from_secs(2)
}

const fn default_max_rate_limit_wait() -> Duration {
    Duration::from_secs(60)
}

const fn default_pacing_delay() -> Duration {
    Duration::from_millis(500)
}

const fn default_status_failure_delay() -> Duration {
    Duration::from_secs(5)
}

const fn default_page_size() -> u32 {
    MAX_PAGE_SIZE
}

const fn default_max_search_pages() -> u32 {
    10
}

const fn default_hall_of_fame_size() -> usize {
    10
}

impl Config {
    /// Load configuration from `config_path`, or from `orgpulse.toml` in `dir` if present
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation
    pub fn load(dir: &Utf8Path, config_path: Option<&Utf8PathBuf>) -> Result<Self> {
        let (final_path, text) = if let Some(path) = config_path {
            let text = fs::read_to_string(path).into_app_err_with(|| format!("reading orgpulse configuration file '{path}'"))?;
            (path.clone(), text)
        } else {
            let path = dir.join(CONFIG_FILE_NAME);
            match fs::read_to_string(&path) {
                Ok(text) => (path, text),
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
                Err(e) => return Err(e).into_app_err_with(|| format!("reading orgpulse configuration file '{path}'")),
            }
        };

        let config: Self = toml::from_str(&text).into_app_err_with(|| format!("parsing configuration file '{final_path}'"))?;
        config.validate()?;

        Ok(config)
    }

    /// Save the default configuration to a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written
    pub fn save_default(output_path: &Utf8Path) -> Result<()> {
        fs::write(output_path, DEFAULT_CONFIG_TOML).into_app_err_with(|| format!("writing default configuration to {output_path}"))?;
        Ok(())
    }

    #[must_use]
    pub const fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            safety_margin: self.safety_margin,
            max_retries: self.max_retries,
            backoff_base: self.backoff_base,
            max_rate_limit_wait: self.max_rate_limit_wait,
            pacing_delay: self.pacing_delay,
            status_failure_delay: self.status_failure_delay,
        }
    }

    fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.api_url).into_app_err_with(|| format!("api_url '{}' is not a valid URL", self.api_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(app_err!("api_url must use http or https, got '{}'", url.scheme()));
        }

        if !(1..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(app_err!("page_size must be between 1 and {MAX_PAGE_SIZE}, got {}", self.page_size));
        }

        if self.max_retries == 0 {
            return Err(app_err!("max_retries must be at least 1"));
        }

        if self.max_search_pages == 0 {
            return Err(app_err!("max_search_pages must be at least 1"));
        }

        if self.hall_of_fame_size == 0 {
            return Err(app_err!("hall_of_fame_size must be at least 1"));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            safety_margin: default_safety_margin(),
            max_retries: default_max_retries(),
            backoff_base: default_backoff_base(),
            max_rate_limit_wait: default_max_rate_limit_wait(),
            pacing_delay: default_pacing_delay(),
            status_failure_delay: default_status_failure_delay(),
            page_size: default_page_size(),
            max_search_pages: default_max_search_pages(),
            hall_of_fame_size: default_hall_of_fame_size(),
        }
    }
}
