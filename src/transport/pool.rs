//! Connection pool bookkeeping.
//!
//! The HTTP client keeps its own socket pool; this module caps the number of
//! requests in flight against it. A checked-out [`PoolPermit`] is held for the
//! lifetime of an exchange, including a streamed response body, and is given
//! back when dropped.

use crate::error::NetworkError;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};

/// Configuration for connection pooling.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of requests in flight.
    pub max_connections: usize,

    /// How long an idle connection may stay open.
    pub idle_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 100,
            idle_timeout: Duration::from_secs(90),
        }
    }
}

/// Snapshot of pool usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Permits currently checked out.
    pub active: usize,
    /// Highest number of permits ever checked out at once.
    pub peak: usize,
    /// Total checkouts since creation.
    pub checkouts: u64,
    /// Checkouts that had to wait for a permit.
    pub waits: u64,
}

/// Limits concurrent requests and tracks usage.
///
/// Safe to share across tasks. The stats lock is only taken for
/// bookkeeping and is never held across an await.
#[derive(Debug)]
pub struct ConnectionPool {
    config: PoolConfig,
    semaphore: Arc<Semaphore>,
    stats: Mutex<PoolStats>,
}

impl ConnectionPool {
    /// Create a new pool.
    pub fn new(config: PoolConfig) -> Self {
        let permits = config.max_connections.max(1);
        Self {
            config,
            semaphore: Arc::new(Semaphore::new(permits)),
            stats: Mutex::new(PoolStats::default()),
        }
    }

    /// Check out a permit, waiting if the pool is at capacity.
    ///
    /// Fails with [`NetworkError::PoolClosed`] once the pool has been closed.
    pub async fn acquire(self: &Arc<Self>) -> Result<PoolPermit, NetworkError> {
        let permit = match Arc::clone(&self.semaphore).try_acquire_owned() {
            Ok(permit) => permit,
            Err(TryAcquireError::Closed) => return Err(NetworkError::PoolClosed),
            Err(TryAcquireError::NoPermits) => {
                self.stats.lock().waits += 1;
                Arc::clone(&self.semaphore)
                    .acquire_owned()
                    .await
                    .map_err(|_| NetworkError::PoolClosed)?
            }
        };

        {
            let mut stats = self.stats.lock();
            stats.active += 1;
            stats.checkouts += 1;
            stats.peak = stats.peak.max(stats.active);
        }

        Ok(PoolPermit {
            _permit: permit,
            pool: Arc::clone(self),
        })
    }

    /// Close the pool. Waiters and later checkouts fail.
    pub fn close(&self) {
        self.semaphore.close();
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.semaphore.is_closed()
    }

    /// Permits currently available.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Current usage statistics.
    pub fn stats(&self) -> PoolStats {
        *self.stats.lock()
    }

    /// The pool configuration.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }
}

/// A checked-out slot in the pool. Returned on drop.
#[derive(Debug)]
pub struct PoolPermit {
    _permit: OwnedSemaphorePermit,
    pool: Arc<ConnectionPool>,
}

impl Drop for PoolPermit {
    fn drop(&mut self) {
        let mut stats = self.pool.stats.lock();
        stats.active = stats.active.saturating_sub(1);
    }
}
