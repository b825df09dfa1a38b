//! Coordinator configuration.

use crate::conflict::ResolutionPolicy;
use std::time::Duration;

/// Retry behavior for transient failures inside a sync cycle.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts per batch, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Multiplier applied to the delay after each failed attempt.
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Returns the delay to wait before the given retry attempt.
    ///
    /// `attempt` is zero-based: the delay after the first failure is
    /// `delay_for_attempt(0)`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(attempt as i32);
        let millis = self.initial_delay.as_millis() as f64 * factor;
        Duration::from_millis(millis as u64).min(self.max_delay)
    }
}

/// Configuration for a [`SyncCoordinator`](crate::SyncCoordinator).
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Identifier of this device, stamped on every local write.
    pub device_id: String,
    /// Schema hash the coordinator requires before syncing.
    pub expected_schema_hash: String,
    /// Maximum pending rows pushed per table in one UPLOAD pass.
    pub upload_batch_size: usize,
    /// Maximum change-feed entries pulled per DOWNLOAD request.
    pub download_batch_size: usize,
    /// Wall-clock budget for one operation. `None` means unbounded.
    pub operation_timeout: Option<Duration>,
    /// Retry policy for transient failures.
    pub retry: RetryConfig,
    /// How detected conflicts are resolved without operator input.
    pub default_policy: ResolutionPolicy,
}

impl SyncConfig {
    /// Creates a configuration with default batching and retry settings.
    pub fn new(device_id: impl Into<String>, expected_schema_hash: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            expected_schema_hash: expected_schema_hash.into(),
            upload_batch_size: 100,
            download_batch_size: 500,
            operation_timeout: None,
            retry: RetryConfig::default(),
            default_policy: ResolutionPolicy::Manual,
        }
    }

    /// Sets the per-operation wall-clock budget.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = Some(timeout);
        self
    }

    /// Sets the retry policy.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the automatic conflict resolution policy.
    pub fn with_policy(mut self, policy: ResolutionPolicy) -> Self {
        self.default_policy = policy;
        self
    }

    /// Sets the UPLOAD batch size.
    pub fn with_upload_batch(mut self, size: usize) -> Self {
        self.upload_batch_size = size;
        self
    }

    /// Sets the DOWNLOAD batch size.
    pub fn with_download_batch(mut self, size: usize) -> Self {
        self.download_batch_size = size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_and_caps() {
        let retry = RetryConfig {
            max_attempts: 5,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
            backoff_multiplier: 2.0,
        };
        assert_eq!(retry.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(retry.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(retry.delay_for_attempt(2), Duration::from_millis(350));
        assert_eq!(retry.delay_for_attempt(10), Duration::from_millis(350));
    }

    #[test]
    fn no_retry_is_a_single_attempt() {
        assert_eq!(RetryConfig::no_retry().max_attempts, 1);
    }

    #[test]
    fn config_defaults() {
        let config = SyncConfig::new("device-a", "abc123");
        assert_eq!(config.upload_batch_size, 100);
        assert_eq!(config.download_batch_size, 500);
        assert!(config.operation_timeout.is_none());
        assert_eq!(config.default_policy, ResolutionPolicy::Manual);
    }
}
