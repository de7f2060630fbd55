//! Production resilience features
//!
//! Provides retry policies, concurrency limiting and per-key write
//! serialization for spreadsheet backend interactions.

pub mod concurrency;
pub mod config;
pub mod locks;
pub mod retry;

pub use concurrency::{ConcurrencyLimiter, ConcurrencyStats};
pub use config::{ConcurrencyConfig, LockingConfig, MonitoringConfig, ResilienceConfig};
pub use locks::KeyedLocks;
pub use retry::{Idempotency, RetryConfig, RetryPolicy, RetryableError};
