//! Concurrency limiter implementation
//!
//! Provides a semaphore-based limiter for controlling the number of
//! outstanding requests to the spreadsheet backend.

use super::config::ConcurrencyConfig;
use log::debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Semaphore-based concurrency limiter for backend requests
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    config: ConcurrencyConfig,
    requests_acquired: Arc<AtomicU64>,
    requests_waited: Arc<AtomicU64>,
}

impl ConcurrencyLimiter {
    /// Create a new concurrency limiter with the given configuration
    pub fn new(config: ConcurrencyConfig) -> Self {
        let permits = if config.enabled {
            config.max_concurrent_requests.max(1)
        } else {
            // Large but valid (Tokio Semaphore max is 2^61-1)
            1_000_000
        };

        Self {
            semaphore: Arc::new(Semaphore::new(permits)),
            config,
            requests_acquired: Arc::new(AtomicU64::new(0)),
            requests_waited: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Acquire a permit for making a request. Waits if at capacity.
    /// The permit is released when dropped.
    pub async fn acquire(&self) -> OwnedSemaphorePermit {
        if self.config.enabled && self.semaphore.available_permits() == 0 {
            self.requests_waited.fetch_add(1, Ordering::Relaxed);
            debug!(
                "Concurrency limiter: waiting for permit ({} in use)",
                self.config.max_concurrent_requests
            );
        }

        // The semaphore is owned by this limiter and never closed
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("concurrency semaphore closed");
        self.requests_acquired.fetch_add(1, Ordering::Relaxed);
        permit
    }

    /// Try to acquire a permit without waiting
    pub fn try_acquire(&self) -> Option<OwnedSemaphorePermit> {
        let permit = self.semaphore.clone().try_acquire_owned().ok()?;
        self.requests_acquired.fetch_add(1, Ordering::Relaxed);
        Some(permit)
    }

    /// Number of requests that could start immediately
    pub fn available_permits(&self) -> usize {
        if !self.config.enabled {
            return usize::MAX;
        }
        self.semaphore.available_permits()
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Get current statistics
    pub fn stats(&self) -> ConcurrencyStats {
        ConcurrencyStats {
            available_permits: self.available_permits(),
            max_concurrent_requests: self.config.max_concurrent_requests,
            requests_acquired: self.requests_acquired.load(Ordering::Relaxed),
            requests_waited: self.requests_waited.load(Ordering::Relaxed),
            enabled: self.config.enabled,
        }
    }
}

/// Statistics for the concurrency limiter
#[derive(Debug, Clone)]
pub struct ConcurrencyStats {
    pub available_permits: usize,
    pub max_concurrent_requests: usize,
    /// Total permits acquired since creation
    pub requests_acquired: u64,
    /// Number of times a request had to wait for a permit
    pub requests_waited: u64,
    pub enabled: bool,
}

impl ConcurrencyStats {
    /// Number of permits currently in use
    pub fn in_use(&self) -> usize {
        if !self.enabled {
            return 0;
        }
        self.max_concurrent_requests
            .saturating_sub(self.available_permits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_limiter_disabled_allows_many() {
        let limiter = ConcurrencyLimiter::new(ConcurrencyConfig {
            max_concurrent_requests: 2,
            enabled: false,
        });

        let permits: Vec<_> = (0..50).filter_map(|_| limiter.try_acquire()).collect();
        assert_eq!(permits.len(), 50);
        assert_eq!(limiter.stats().in_use(), 0);
    }

    #[tokio::test]
    async fn test_limiter_caps_outstanding_requests() {
        let limiter = ConcurrencyLimiter::new(ConcurrencyConfig {
            max_concurrent_requests: 2,
            enabled: true,
        });

        let p1 = limiter.try_acquire();
        let _p2 = limiter.try_acquire();
        assert!(p1.is_some());
        assert!(limiter.try_acquire().is_none());
        assert_eq!(limiter.stats().in_use(), 2);

        drop(p1);
        assert!(limiter.try_acquire().is_some());
    }

    #[tokio::test]
    async fn test_acquire_waits_for_release() {
        let limiter = ConcurrencyLimiter::new(ConcurrencyConfig {
            max_concurrent_requests: 1,
            enabled: true,
        });
        let waiter = limiter.clone();

        let permit = limiter.acquire().await;
        let handle = tokio::spawn(async move {
            let _permit = waiter.acquire().await;
            true
        });

        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
        drop(permit);

        let result = tokio::time::timeout(tokio::time::Duration::from_millis(200), handle).await;
        assert!(matches!(result, Ok(Ok(true))));
        assert_eq!(limiter.stats().requests_waited, 1);
    }
}
