//! Uploader configuration.
//!
//! Everything tunable is an explicit parameter here: the target server,
//! the concurrency bound, and the retry policy are injected by the caller,
//! never module-global state.

use std::time::Duration;

use wellsite_protocol::{
    CHECK_UPLOADS_PATH, CHUNK_SIZE, CHUNK_START_PATH, COMPLETE_PATH, DEFAULT_MAX_CONCURRENT_FILES,
};

/// Retry policy for chunk requests, with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts per chunk (1 = no retry).
    pub attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Backoff cap.
    pub max_delay: Duration,
    /// Multiplier applied per retry.
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(15),
            backoff_factor: 2.0,
        }
    }
}

impl RetryConfig {
    /// Delay before retrying after the given failed attempt (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(63) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.backoff_factor.powi(exp);
        Duration::from_secs_f64(secs.min(self.max_delay.as_secs_f64()))
    }
}

/// Configuration for the upload pipeline.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// API base URL without a trailing slash, e.g. `http://wells.example.com/api`.
    pub base_url: String,
    /// Upload chunk size in bytes. Defaults to [`CHUNK_SIZE`] (8 MiB).
    pub chunk_size: u64,
    /// Maximum number of files uploading simultaneously.
    pub max_concurrent_files: usize,
    /// Retry policy for failed chunk requests.
    pub retry: RetryConfig,
}

impl UploadConfig {
    /// Creates a config with contract defaults for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            chunk_size: CHUNK_SIZE,
            max_concurrent_files: DEFAULT_MAX_CONCURRENT_FILES,
            retry: RetryConfig::default(),
        }
    }

    /// Creates a config for a bare server host, e.g. `wells.example.com:9000`.
    pub fn for_host(host: &str) -> Self {
        Self::new(format!("http://{host}/api"))
    }

    pub(crate) fn chunk_start_url(&self) -> String {
        format!("{}{}", self.base_url, CHUNK_START_PATH)
    }

    pub(crate) fn complete_url(&self) -> String {
        format!("{}{}", self.base_url, COMPLETE_PATH)
    }

    pub(crate) fn check_uploads_url(&self) -> String {
        format!("{}{}", self.base_url, CHECK_UPLOADS_PATH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_contract() {
        let config = UploadConfig::new("http://example.com/api");
        assert_eq!(config.chunk_size, 8 * 1024 * 1024);
        assert_eq!(config.max_concurrent_files, 2);
        assert_eq!(config.retry.attempts, 3);
    }

    #[test]
    fn for_host_builds_api_base() {
        let config = UploadConfig::for_host("10.0.0.5:9000");
        assert_eq!(config.base_url, "http://10.0.0.5:9000/api");
        assert_eq!(
            config.chunk_start_url(),
            "http://10.0.0.5:9000/api/chunkedUpload/start"
        );
        assert_eq!(
            config.complete_url(),
            "http://10.0.0.5:9000/api/chunkedUpload/complete"
        );
        assert_eq!(
            config.check_uploads_url(),
            "http://10.0.0.5:9000/api/chunkedUpload/check_uploads"
        );
    }

    #[test]
    fn retry_delay_grows_and_caps() {
        let retry = RetryConfig::default();
        let d1 = retry.delay_for_attempt(1);
        let d2 = retry.delay_for_attempt(2);
        let d3 = retry.delay_for_attempt(3);
        assert!(d1 < d2 && d2 < d3);
        assert_eq!(d1, Duration::from_millis(250));

        // Far-out attempts stay at the cap.
        assert_eq!(retry.delay_for_attempt(40), retry.max_delay);
    }
}
