//! Buffer Pool - the lock-aware page cache.
//!
//! The [`BufferPool`] provides:
//! - Page caching between page stores and memory, bounded by a capacity
//! - Page locking through an owned [`LockManager`] on every access
//! - NO-STEAL eviction: only clean, unpinned pages are evicted
//! - Logged flushes (log record, log force, then page write)

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use rand::Rng;
use tracing::{debug, warn};

use crate::buffer::{BufferPoolStats, CachedPage, PageHandle};
use crate::common::{BufferPoolConfig, Error, PageIdentity, Result, TableId, TransactionId};
use crate::concurrency::{LockManager, Permission};
use crate::recovery::LogFile;
use crate::storage::{Catalog, Record};

/// Caches pages for transactions and enforces page-level two-phase locking.
///
/// # Architecture
/// ```text
/// ┌─────────────────────────────────────────────────────────────┐
/// │                         BufferPool                          │
/// │  ┌──────────────────────────┐   ┌───────────────────────┐   │
/// │  │ pages                    │   │ lock_manager          │   │
/// │  │ PageIdentity → CachedPage│   │ PageIdentity → holders│   │
/// │  └──────────────────────────┘   └───────────────────────┘   │
/// │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐       │
/// │  │  structure   │  │   catalog    │  │     log      │       │
/// │  │  Mutex<()>   │  │ PageStores   │  │   LogFile    │       │
/// │  └──────────────┘  └──────────────┘  └──────────────┘       │
/// └─────────────────────────────────────────────────────────────┘
/// ```
///
/// # Thread Safety
/// - `pages`: `RwLock`, cache hits only take the read lock
/// - `structure`: `Mutex`, serializes load, eviction, flush and discard
/// - `lock_manager`: one internal `Mutex` linearizing all lock operations
/// - `stats`: No lock, all atomic counters
///
/// A page is pinned while the `pages` read lock is held, and eviction
/// checks pins under the `pages` write lock, so a page cannot be evicted
/// between lookup and pin.
pub struct BufferPool {
    /// Resident pages.
    pages: RwLock<HashMap<PageIdentity, Arc<CachedPage>>>,

    /// Held for every change to the set of resident pages and for flushes.
    structure: Mutex<()>,

    lock_manager: LockManager,

    catalog: Arc<Catalog>,

    log: Arc<dyn LogFile>,

    config: BufferPoolConfig,

    stats: BufferPoolStats,
}

impl BufferPool {
    /// Create a buffer pool over the tables registered in `catalog`.
    ///
    /// # Panics
    /// Panics if `config.capacity` is 0.
    pub fn new(config: BufferPoolConfig, catalog: Arc<Catalog>, log: Arc<dyn LogFile>) -> Self {
        assert!(config.capacity > 0, "capacity must be > 0");

        Self {
            pages: RwLock::new(HashMap::with_capacity(config.capacity)),
            structure: Mutex::new(()),
            lock_manager: LockManager::new(),
            catalog,
            log,
            config,
            stats: BufferPoolStats::new(),
        }
    }

    // ========================================================================
    // Public API: Page access
    // ========================================================================

    /// Fetch `page` for `txn` with at least `permission`.
    ///
    /// Blocks while another transaction holds an incompatible lock, polling
    /// at random intervals. On a cache miss the page is loaded from its page
    /// store, evicting a clean page if the pool is full.
    ///
    /// The lock is kept if a later step fails; the transaction is expected
    /// to abort.
    ///
    /// # Errors
    /// - `Error::LockTimeout` if the lock wait exceeds the jittered deadline
    /// - `Error::BufferPoolFull` if a load needs room and every page is dirty
    ///   or pinned
    /// - `Error::TableNotFound`, `Error::PageNotFound`, `Error::Io` from the
    ///   page store
    pub fn get_page(
        &self,
        txn: TransactionId,
        page: PageIdentity,
        permission: Permission,
    ) -> Result<PageHandle> {
        self.acquire_lock(txn, page, permission)?;
        let cached = self.fetch_page(page)?;
        Ok(PageHandle::new(cached, txn, permission))
    }

    /// Release `txn`'s lock on `page` immediately.
    ///
    /// This breaks two-phase locking if `txn` goes on to acquire other
    /// locks, and it leaves any changes `txn` made to the page visible to
    /// others. Only call it for a lock that guarded nothing, such as a read
    /// lock taken to check a page for free space.
    pub fn release_page(&self, txn: TransactionId, page: PageIdentity) {
        self.lock_manager.release(page, txn);
    }

    /// Whether `txn` holds a lock on `page`.
    pub fn holds_lock(&self, txn: TransactionId, page: PageIdentity) -> bool {
        self.lock_manager.holds(page, txn)
    }

    /// Remove `page` from the cache without flushing it.
    ///
    /// Used for rolled-back pages and to force a reload after a page
    /// store rewrote a page behind the cache.
    pub fn discard_page(&self, page: PageIdentity) {
        let _structure = self.structure.lock();
        self.discard_locked(page);
    }

    // ========================================================================
    // Public API: Record mutation
    // ========================================================================

    /// Insert `record` into `table` on behalf of `txn`.
    ///
    /// Every page the page store modified is marked dirty by `txn` and
    /// installed in the cache. On success `record` carries its location.
    pub fn insert_record(&self, txn: TransactionId, table: TableId, record: &mut Record) -> Result<()> {
        let store = self.catalog.get_page_store(table)?;
        let touched = store.insert_record(self, txn, record)?;
        for handle in &touched {
            self.install_dirty(handle)?;
        }
        Ok(())
    }

    /// Delete `record` from its table on behalf of `txn`.
    ///
    /// # Errors
    /// `Error::RecordNotFound` if the record has no location.
    pub fn delete_record(&self, txn: TransactionId, record: &Record) -> Result<()> {
        let rid = record
            .id()
            .ok_or_else(|| Error::RecordNotFound("record has no location".into()))?;
        let store = self.catalog.get_page_store(rid.page.table_id())?;
        let touched = store.delete_record(self, txn, record)?;
        for handle in &touched {
            self.install_dirty(handle)?;
        }
        Ok(())
    }

    // ========================================================================
    // Public API: Flush pages
    // ========================================================================

    /// Flush every dirty page.
    ///
    /// This writes uncommitted data to the page stores and so breaks
    /// NO-STEAL for any transaction still running. Meant for shutdown and
    /// diagnostics.
    pub fn flush_all_pages(&self) -> Result<()> {
        let _structure = self.structure.lock();
        for cached in self.resident_pages() {
            self.flush_locked(&cached)?;
        }
        Ok(())
    }

    /// Flush every cached page dirtied by `txn`.
    pub fn flush_pages(&self, txn: TransactionId) -> Result<()> {
        let _structure = self.structure.lock();
        for cached in self.resident_pages() {
            if cached.dirtied_by() == Some(txn) {
                self.flush_locked(&cached)?;
            }
        }
        Ok(())
    }

    /// Flush a single page if it is cached and dirty.
    pub fn flush_page(&self, page: PageIdentity) -> Result<()> {
        let _structure = self.structure.lock();
        let cached = self.pages.read().get(&page).cloned();
        match cached {
            Some(cached) => self.flush_locked(&cached),
            None => Ok(()),
        }
    }

    // ========================================================================
    // Public API: Stats and info
    // ========================================================================

    pub fn stats(&self) -> &BufferPoolStats {
        &self.stats
    }

    pub fn config(&self) -> &BufferPoolConfig {
        &self.config
    }

    /// Maximum number of cached pages.
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Number of pages currently cached.
    pub fn page_count(&self) -> usize {
        self.pages.read().len()
    }

    pub fn is_cached(&self, page: PageIdentity) -> bool {
        self.pages.read().contains_key(&page)
    }

    /// Whether `page` is cached and dirty.
    pub fn is_dirty(&self, page: PageIdentity) -> bool {
        self.dirtied_by(page).is_some()
    }

    /// The transaction that dirtied the cached `page`, if any.
    pub fn dirtied_by(&self, page: PageIdentity) -> Option<TransactionId> {
        self.pages.read().get(&page).and_then(|c| c.dirtied_by())
    }

    pub fn lock_manager(&self) -> &LockManager {
        &self.lock_manager
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    // ========================================================================
    // Internal: Lock acquisition
    // ========================================================================

    /// Poll the lock manager until the lock is granted or the deadline
    /// passes.
    fn acquire_lock(&self, txn: TransactionId, page: PageIdentity, permission: Permission) -> Result<()> {
        if self.lock_manager.acquire(page, txn, permission) {
            return Ok(());
        }

        BufferPoolStats::bump(&self.stats.lock_waits);
        let mut rng = rand::thread_rng();
        let deadline = self.config.lock_timeout
            + random_below(&mut rng, self.config.lock_timeout_jitter, false);
        let started = Instant::now();
        debug!(%txn, %page, %permission, ?deadline, "waiting for page lock");

        loop {
            if started.elapsed() > deadline {
                BufferPoolStats::bump(&self.stats.lock_timeouts);
                warn!(%txn, %page, %permission, waited = ?started.elapsed(), "lock wait timed out, aborting");
                return Err(Error::LockTimeout { txn, page });
            }

            thread::sleep(random_below(&mut rng, self.config.lock_retry_max_sleep, true));

            if self.lock_manager.acquire(page, txn, permission) {
                debug!(%txn, %page, %permission, waited = ?started.elapsed(), "page lock granted");
                return Ok(());
            }
        }
    }

    // ========================================================================
    // Internal: Core fetch logic
    // ========================================================================

    /// Return the cached page, loading it on a miss. The page comes back
    /// pinned.
    fn fetch_page(&self, page: PageIdentity) -> Result<Arc<CachedPage>> {
        // Fast path: read lock only
        if let Some(cached) = self.pin_if_cached(page) {
            BufferPoolStats::bump(&self.stats.cache_hits);
            return Ok(cached);
        }

        let _structure = self.structure.lock();

        // Another thread may have loaded it while we waited.
        if let Some(cached) = self.pin_if_cached(page) {
            BufferPoolStats::bump(&self.stats.cache_hits);
            return Ok(cached);
        }

        BufferPoolStats::bump(&self.stats.cache_misses);

        // Read before evicting so a failed read leaves the cache untouched.
        let store = self.catalog.get_page_store(page.table_id())?;
        let data = store.read_page(page)?;
        BufferPoolStats::bump(&self.stats.pages_read);

        if self.page_count() >= self.config.capacity {
            self.evict_page()?;
        }

        let cached = Arc::new(CachedPage::new(page, data));
        cached.pin();
        self.pages.write().insert(page, Arc::clone(&cached));
        debug!(%page, "page loaded");

        Ok(cached)
    }

    fn pin_if_cached(&self, page: PageIdentity) -> Option<Arc<CachedPage>> {
        let pages = self.pages.read();
        pages.get(&page).map(|cached| {
            cached.pin();
            Arc::clone(cached)
        })
    }

    /// Mark a page returned by a page store mutation dirty and make sure
    /// the cache holds exactly that copy.
    fn install_dirty(&self, handle: &PageHandle) -> Result<()> {
        let cached = handle.cached();
        cached.mark_dirty(handle.txn());

        let _structure = self.structure.lock();
        let page = handle.id();
        let resident = self.pages.read().get(&page).map(|c| Arc::ptr_eq(c, cached));

        match resident {
            Some(true) => {}
            Some(false) => {
                self.pages.write().insert(page, Arc::clone(cached));
            }
            None => {
                if self.page_count() >= self.config.capacity {
                    self.evict_page()?;
                }
                self.pages.write().insert(page, Arc::clone(cached));
            }
        }
        Ok(())
    }

    // ========================================================================
    // Internal: Eviction, flush, discard (callers hold `structure`)
    // ========================================================================

    pub(crate) fn structure_lock(&self) -> parking_lot::MutexGuard<'_, ()> {
        self.structure.lock()
    }

    /// Evict the first clean, unpinned page found.
    ///
    /// Which clean page goes is unspecified.
    fn evict_page(&self) -> Result<()> {
        let mut pages = self.pages.write();

        let victim = pages
            .iter()
            .find(|(_, cached)| cached.is_evictable())
            .map(|(&page, _)| page);

        match victim {
            Some(page) => {
                pages.remove(&page);
                BufferPoolStats::bump(&self.stats.evictions);
                debug!(%page, "page evicted");
                Ok(())
            }
            None => {
                warn!(capacity = self.config.capacity, "no clean page to evict");
                Err(Error::BufferPoolFull {
                    capacity: self.config.capacity,
                })
            }
        }
    }

    /// Write a dirty page through the log to its page store.
    ///
    /// Order: log record, log force, page write, then the page becomes
    /// clean with a fresh before-image. A failure at any step leaves the
    /// page dirty and its before-image untouched.
    pub(crate) fn flush_locked(&self, cached: &CachedPage) -> Result<()> {
        let data = cached.page();
        let Some(dirtier) = cached.dirtied_by() else {
            return Ok(());
        };

        let page = cached.id();
        let mut before = cached.before_image_mut();

        self.log.log_write(dirtier, page, &before, &data)?;
        self.log.force()?;

        let store = self.catalog.get_page_store(page.table_id())?;
        store.write_page(page, &data)?;

        before.copy_from(&data);
        cached.clear_dirty();
        BufferPoolStats::bump(&self.stats.pages_written);
        debug!(%page, txn = %dirtier, "page flushed");

        Ok(())
    }

    /// Drop `page` from the cache. Returns whether it was resident.
    pub(crate) fn discard_locked(&self, page: PageIdentity) -> bool {
        let removed = self.pages.write().remove(&page).is_some();
        if removed {
            debug!(%page, "page discarded");
        }
        removed
    }

    pub(crate) fn cached_page(&self, page: PageIdentity) -> Option<Arc<CachedPage>> {
        self.pages.read().get(&page).cloned()
    }

    fn resident_pages(&self) -> Vec<Arc<CachedPage>> {
        self.pages.read().values().cloned().collect()
    }
}

/// Uniform random duration in `[0, max)`, or `[0, max]` when `inclusive`.
fn random_below(rng: &mut impl Rng, max: Duration, inclusive: bool) -> Duration {
    let max_us = u64::try_from(max.as_micros()).unwrap_or(u64::MAX);
    if max_us == 0 {
        return Duration::ZERO;
    }
    let us = if inclusive {
        rng.gen_range(0..=max_us)
    } else {
        rng.gen_range(0..max_us)
    };
    Duration::from_micros(us)
}
