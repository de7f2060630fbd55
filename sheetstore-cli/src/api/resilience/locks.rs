//! Per-key async locks for read-merge-write sequences

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Hands out one async mutex per `sheet + column + value` key.
///
/// Entries are dropped once no guard or waiter references them.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    inner: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to the given row key
    pub async fn lock(&self, sheet: &str, column: &str, value: &str) -> OwnedMutexGuard<()> {
        let key = format!("{}\u{1f}{}\u{1f}{}", sheet, column, value);
        let entry = {
            let mut map = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            map.retain(|_, m| Arc::strong_count(m) > 1);
            map.entry(key)
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        entry.lock_owned().await
    }

    /// Number of keys currently tracked
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .map(|map| map.len())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_is_exclusive() {
        let locks = Arc::new(KeyedLocks::new());
        let guard = locks.lock("Products", "Product ID", "PROD001").await;

        let other = locks.clone();
        let handle = tokio::spawn(async move {
            let _g = other.lock("Products", "Product ID", "PROD001").await;
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!handle.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_millis(200), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = KeyedLocks::new();
        let _a = locks.lock("Products", "Product ID", "PROD001").await;
        let b = tokio::time::timeout(
            Duration::from_millis(50),
            locks.lock("Products", "Product ID", "PROD002"),
        )
        .await;
        assert!(b.is_ok());
        assert_eq!(locks.len(), 2);
    }
}
