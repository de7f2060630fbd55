//! Resilience configuration with builder pattern
//!
//! Provides a unified configuration for retry policies, concurrency limiting,
//! write serialization and monitoring with sane defaults for the Sheets API
//! (which allows roughly 60 requests per minute per user).

use super::retry::RetryConfig;
use std::time::Duration;

/// Global resilience configuration for backend operations
#[derive(Debug, Clone)]
pub struct ResilienceConfig {
    pub retry: RetryConfig,
    pub concurrency: ConcurrencyConfig,
    pub locking: LockingConfig,
    pub monitoring: MonitoringConfig,
}

/// Concurrency limiting configuration
#[derive(Debug, Clone)]
pub struct ConcurrencyConfig {
    /// Maximum outstanding requests to the backend
    pub max_concurrent_requests: usize,
    /// Whether concurrency limiting is enabled
    pub enabled: bool,
}

/// Per-key write serialization.
///
/// When enabled, read-merge-write sequences on the same sheet and key are
/// serialized inside this process. Other processes writing the same
/// spreadsheet are not covered.
#[derive(Debug, Clone, Default)]
pub struct LockingConfig {
    pub serialize_writes: bool,
}

/// Monitoring and logging configuration
#[derive(Debug, Clone)]
pub struct MonitoringConfig {
    /// Tag each backend request with a correlation id in the debug log
    pub correlation_ids: bool,
    /// Log every backend request at debug level
    pub request_logging: bool,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            concurrency: ConcurrencyConfig::default(),
            locking: LockingConfig::default(),
            monitoring: MonitoringConfig::default(),
        }
    }
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 8,
            enabled: true,
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            correlation_ids: true,
            request_logging: true,
        }
    }
}

impl ResilienceConfig {
    /// Create a new builder for ResilienceConfig
    pub fn builder() -> ResilienceConfigBuilder {
        ResilienceConfigBuilder::new()
    }

    /// Conservative config for shared production spreadsheets
    pub fn conservative() -> Self {
        Self {
            retry: RetryConfig::conservative(),
            concurrency: ConcurrencyConfig {
                max_concurrent_requests: 2,
                enabled: true,
            },
            locking: LockingConfig {
                serialize_writes: true,
            },
            monitoring: MonitoringConfig::default(),
        }
    }

    /// Disable all resilience features (for testing)
    pub fn disabled() -> Self {
        Self {
            retry: RetryConfig {
                max_attempts: 1,
                base_delay: Duration::from_millis(0),
                max_delay: Duration::from_millis(0),
                backoff_multiplier: 1.0,
                jitter: false,
            },
            concurrency: ConcurrencyConfig {
                max_concurrent_requests: usize::MAX,
                enabled: false,
            },
            locking: LockingConfig::default(),
            monitoring: MonitoringConfig {
                correlation_ids: false,
                request_logging: false,
            },
        }
    }
}

/// Builder for ResilienceConfig
#[derive(Debug)]
pub struct ResilienceConfigBuilder {
    config: ResilienceConfig,
}

impl ResilienceConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ResilienceConfig::default(),
        }
    }

    /// Start from an existing configuration
    pub fn from_config(config: ResilienceConfig) -> Self {
        Self { config }
    }

    /// Configure retry behavior
    pub fn retry_config(mut self, retry: RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    /// Set total attempts including the first (1 disables retries)
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.retry.max_attempts = attempts.max(1);
        self
    }

    /// Set retries after the first attempt (0 disables retries)
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.retry.max_attempts = retries.saturating_add(1);
        self
    }

    /// Set the first backoff delay
    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.config.retry.base_delay = delay;
        self
    }

    /// Enable/disable jitter on backoff delays
    pub fn jitter(mut self, enabled: bool) -> Self {
        self.config.retry.jitter = enabled;
        self
    }

    /// Set max outstanding backend requests
    pub fn max_concurrent_requests(mut self, max: usize) -> Self {
        self.config.concurrency.max_concurrent_requests = max;
        self
    }

    /// Enable/disable concurrency limiting
    pub fn enable_concurrency_limiting(mut self, enabled: bool) -> Self {
        self.config.concurrency.enabled = enabled;
        self
    }

    /// Enable/disable per-key write serialization
    pub fn serialize_writes(mut self, enabled: bool) -> Self {
        self.config.locking.serialize_writes = enabled;
        self
    }

    /// Enable/disable correlation IDs
    pub fn correlation_ids(mut self, enabled: bool) -> Self {
        self.config.monitoring.correlation_ids = enabled;
        self
    }

    /// Enable/disable request logging
    pub fn request_logging(mut self, enabled: bool) -> Self {
        self.config.monitoring.request_logging = enabled;
        self
    }

    /// Build the final configuration
    pub fn build(self) -> ResilienceConfig {
        self.config
    }
}

impl Default for ResilienceConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
