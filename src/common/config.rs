//! Configuration for the page cache and lock waits.

use std::time::Duration;

/// Size of a page in bytes (4KB).
///
/// Matches the OS page size on most systems, so one page is one aligned
/// unit of file I/O.
pub const PAGE_SIZE: usize = 4096;

/// Default number of pages the buffer pool caches.
pub const DEFAULT_PAGES: usize = 50;

/// Base time a transaction waits for a page lock before giving up.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(2000);

/// Upper bound of the random extension added to the lock timeout.
pub const DEFAULT_LOCK_TIMEOUT_JITTER: Duration = Duration::from_millis(500);

/// Upper bound of a single sleep between lock attempts.
pub const DEFAULT_LOCK_RETRY_MAX_SLEEP: Duration = Duration::from_millis(50);

/// Tunables for a [`BufferPool`](crate::buffer::BufferPool).
///
/// # Lock waits
/// A blocked `get_page` polls the lock table, sleeping a random interval in
/// `[0, lock_retry_max_sleep]` between attempts. It gives up with
/// [`Error::LockTimeout`](crate::Error::LockTimeout) once it has waited longer
/// than `lock_timeout + U[0, lock_timeout_jitter)`. The jitter keeps waiters
/// of a deadlock from all timing out at the same instant.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use pagelock::BufferPoolConfig;
///
/// let config = BufferPoolConfig::default()
///     .with_capacity(8)
///     .with_lock_timeout(Duration::from_millis(100));
/// assert_eq!(config.capacity, 8);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferPoolConfig {
    /// Maximum number of cached pages.
    pub capacity: usize,
    /// Base lock wait before aborting.
    pub lock_timeout: Duration,
    /// Random extension of the lock wait.
    pub lock_timeout_jitter: Duration,
    /// Upper bound of a single retry sleep.
    pub lock_retry_max_sleep: Duration,
}

impl BufferPoolConfig {
    /// Config with the given capacity and default lock timings.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn with_lock_timeout_jitter(mut self, jitter: Duration) -> Self {
        self.lock_timeout_jitter = jitter;
        self
    }

    pub fn with_lock_retry_max_sleep(mut self, sleep: Duration) -> Self {
        self.lock_retry_max_sleep = sleep;
        self
    }
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_PAGES,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            lock_timeout_jitter: DEFAULT_LOCK_TIMEOUT_JITTER,
            lock_retry_max_sleep: DEFAULT_LOCK_RETRY_MAX_SLEEP,
        }
    }
}
