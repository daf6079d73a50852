//! Handler configuration
//!
//! The destination bucket is the only value read from the environment. Every
//! other knob has a compiled default and a `with_*` setter for embedders and
//! tests.

use std::time::Duration;

use crate::media_processing::SanitizeOptions;

/// Environment variable holding the destination bucket
pub const OUTPUT_BUCKET_ENV: &str = "OUTPUT_BUCKET";

/// Default number of records processed at the same time
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Default bound on a single object read
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Default bound on a single object write
pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is missing or empty
    #[error("required environment variable {0} is not set")]
    MissingVar(&'static str),
}

/// Configuration for the sanitisation handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerConfig {
    /// Bucket sanitised images are written to, under their source key
    pub destination_bucket: String,
    /// Maximum number of records in flight (at least 1)
    pub max_concurrency: usize,
    /// Bound on each source read
    pub fetch_timeout: Duration,
    /// Bound on each destination write
    pub upload_timeout: Duration,
    /// Image sanitisation options
    pub sanitize: SanitizeOptions,
}

impl HandlerConfig {
    /// Configuration with defaults for everything but the destination bucket
    pub fn new<S>(destination_bucket: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            destination_bucket: destination_bucket.into(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            upload_timeout: DEFAULT_UPLOAD_TIMEOUT,
            sanitize: SanitizeOptions::default(),
        }
    }

    /// Load the configuration from the process environment
    ///
    /// # Errors
    /// * `MissingVar` - If `OUTPUT_BUCKET` is unset or blank
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load the configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bucket = lookup(OUTPUT_BUCKET_ENV)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingVar(OUTPUT_BUCKET_ENV))?;
        Ok(Self::new(bucket))
    }

    /// Sets the maximum number of records in flight; 0 is treated as 1.
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = limit.max(1);
        self
    }

    /// Sets the bound on each source read.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Sets the bound on each destination write.
    pub fn with_upload_timeout(mut self, timeout: Duration) -> Self {
        self.upload_timeout = timeout;
        self
    }

    /// Sets the image sanitisation options.
    pub fn with_sanitize_options(mut self, options: SanitizeOptions) -> Self {
        self.sanitize = options;
        self
    }
}
