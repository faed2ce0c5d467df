use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::constants::{
    DEFAULT_FORUM_BASE_URL, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_IMAGE_EVICTION_INTERVAL_SECS,
    DEFAULT_IMAGE_FETCH_TIMEOUT_MS, DEFAULT_MAX_IMAGE_BYTES, DEFAULT_MAX_POSTS,
    DEFAULT_POST_FETCH_TIMEOUT_MS, DEFAULT_REFRESH_INTERVAL_MINUTES,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Pipeline configuration.
///
/// Built once by the caller and handed to [`crate::pipeline::Pipeline`];
/// nothing in the crate reads settings from ambient state.
#[derive(Debug, Clone)]
pub struct Config {
    // Forum
    pub forum_base_url: String,
    pub max_posts: usize,

    // Freshness
    pub refresh_interval_minutes: u64,

    // Deadlines
    pub post_fetch_timeout: Duration,
    pub image_fetch_timeout: Duration,
    pub http_timeout: Duration,

    // Images
    pub max_image_bytes: u64,
    pub image_eviction_interval: Duration,
    pub image_dir: PathBuf,

    // Cache
    pub cache_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            forum_base_url: DEFAULT_FORUM_BASE_URL.to_string(),
            max_posts: DEFAULT_MAX_POSTS,
            refresh_interval_minutes: DEFAULT_REFRESH_INTERVAL_MINUTES,
            post_fetch_timeout: Duration::from_millis(DEFAULT_POST_FETCH_TIMEOUT_MS),
            image_fetch_timeout: Duration::from_millis(DEFAULT_IMAGE_FETCH_TIMEOUT_MS),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            image_eviction_interval: Duration::from_secs(DEFAULT_IMAGE_EVICTION_INTERVAL_SECS),
            image_dir: PathBuf::from("./data/post-images"),
            cache_dir: PathBuf::from("./data/cache"),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Unset or empty variables fall back to the documented defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Forum
            forum_base_url: env_or_default("FORUM_BASE_URL", DEFAULT_FORUM_BASE_URL),
            max_posts: parse_env_usize("MAX_POSTS", DEFAULT_MAX_POSTS)?,

            // Freshness
            refresh_interval_minutes: parse_env_u64(
                "REFRESH_INTERVAL_MINUTES",
                DEFAULT_REFRESH_INTERVAL_MINUTES,
            )?,

            // Deadlines
            post_fetch_timeout: Duration::from_millis(parse_env_u64(
                "POST_FETCH_TIMEOUT_MS",
                DEFAULT_POST_FETCH_TIMEOUT_MS,
            )?),
            image_fetch_timeout: Duration::from_millis(parse_env_u64(
                "IMAGE_FETCH_TIMEOUT_MS",
                DEFAULT_IMAGE_FETCH_TIMEOUT_MS,
            )?),
            http_timeout: Duration::from_secs(parse_env_u64(
                "HTTP_TIMEOUT_SECS",
                DEFAULT_HTTP_TIMEOUT_SECS,
            )?),

            // Images
            max_image_bytes: parse_env_u64("MAX_IMAGE_BYTES", DEFAULT_MAX_IMAGE_BYTES)?,
            image_eviction_interval: Duration::from_secs(parse_env_u64(
                "IMAGE_EVICTION_INTERVAL_SECS",
                DEFAULT_IMAGE_EVICTION_INTERVAL_SECS,
            )?),
            image_dir: PathBuf::from(env_or_default("IMAGE_DIR", "./data/post-images")),

            // Cache
            cache_dir: PathBuf::from(env_or_default("CACHE_DIR", "./data/cache")),
        })
    }

    /// Configuration for tests: short deadlines, everything else default.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            post_fetch_timeout: Duration::from_millis(2_000),
            image_fetch_timeout: Duration::from_millis(2_000),
            http_timeout: Duration::from_secs(5),
            image_dir: std::env::temp_dir().join("tieba-feed-test/post-images"),
            cache_dir: std::env::temp_dir().join("tieba-feed-test/cache"),
            ..Self::default()
        }
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_posts == 0 {
            return Err(ConfigError::InvalidValue {
                name: "MAX_POSTS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.post_fetch_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "POST_FETCH_TIMEOUT_MS".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.image_fetch_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "IMAGE_FETCH_TIMEOUT_MS".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.forum_base_url.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "FORUM_BASE_URL".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        if let Err(e) = url::Url::parse(&self.forum_base_url) {
            return Err(ConfigError::InvalidValue {
                name: "FORUM_BASE_URL".to_string(),
                message: e.to_string(),
            });
        }
        Ok(())
    }
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_usize(name: &str, default: usize) -> Result<usize, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    const VARS: &[&str] = &[
        "FORUM_BASE_URL",
        "MAX_POSTS",
        "REFRESH_INTERVAL_MINUTES",
        "POST_FETCH_TIMEOUT_MS",
        "IMAGE_FETCH_TIMEOUT_MS",
        "HTTP_TIMEOUT_SECS",
        "MAX_IMAGE_BYTES",
        "IMAGE_EVICTION_INTERVAL_SECS",
        "IMAGE_DIR",
        "CACHE_DIR",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults_when_unset() {
        clear_env();
        let config = Config::from_env().unwrap();

        assert_eq!(config.forum_base_url, "https://tieba.baidu.com");
        assert_eq!(config.refresh_interval_minutes, 30);
        assert_eq!(config.post_fetch_timeout, Duration::from_millis(10_000));
        assert_eq!(config.image_fetch_timeout, Duration::from_millis(10_000));
        assert_eq!(config.max_posts, 20);
        assert_eq!(config.max_image_bytes, 500_000);
        assert_eq!(config.image_eviction_interval, Duration::from_secs(604_800));
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_overrides_from_env() {
        clear_env();
        std::env::set_var("REFRESH_INTERVAL_MINUTES", "5");
        std::env::set_var("MAX_POSTS", "7");
        std::env::set_var("IMAGE_FETCH_TIMEOUT_MS", "");

        let config = Config::from_env().unwrap();
        clear_env();

        assert_eq!(config.refresh_interval_minutes, 5);
        assert_eq!(config.max_posts, 7);
        // Empty values fall back to the default
        assert_eq!(config.image_fetch_timeout, Duration::from_millis(10_000));
    }

    #[test]
    #[serial]
    fn test_unparseable_value_is_an_error() {
        clear_env();
        std::env::set_var("MAX_IMAGE_BYTES", "lots");
        let result = Config::from_env();
        clear_env();

        assert!(matches!(result, Err(ConfigError::ParseInt { ref name, .. }) if name == "MAX_IMAGE_BYTES"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = Config {
            max_posts: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            post_fetch_timeout: Duration::ZERO,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            forum_base_url: "not a url".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
