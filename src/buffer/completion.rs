//! Transaction completion: FORCE on commit, discard on abort.
//!
//! At transaction end every page the transaction holds a lock on is
//! visited:
//! - commit: a dirty page is flushed (log record, log force, page write)
//!   and its before-image becomes the flushed content
//! - abort: a dirty page is dropped from the cache. NO-STEAL guarantees
//!   the page store still has the pre-transaction content, so the next
//!   access reloads it.
//!
//! Locks are released last, so no other transaction can observe a page
//! half way through being flushed or discarded.

use tracing::{debug, warn};

use crate::buffer::{BufferPool, BufferPoolStats};
use crate::common::{Result, TransactionId};

impl BufferPool {
    /// Commit (`commit = true`) or abort `txn` and release all its locks.
    ///
    /// # Errors
    /// A flush failure during commit is returned as is and the locks stay
    /// held. Pages flushed before the failure are durable; the caller
    /// should abort to discard the rest.
    pub fn transaction_complete(&self, txn: TransactionId, commit: bool) -> Result<()> {
        if commit {
            self.commit_transaction(txn)
        } else {
            self.abort_transaction(txn);
            Ok(())
        }
    }

    /// Flush every page `txn` dirtied, then release its locks.
    pub fn commit_transaction(&self, txn: TransactionId) -> Result<()> {
        let locked = self.lock_manager().locks_of(txn);
        {
            let _structure = self.structure_lock();
            for page in &locked {
                if let Some(cached) = self.cached_page(*page) {
                    if let Err(e) = self.flush_locked(&cached) {
                        warn!(%txn, %page, error = %e, "flush failed during commit");
                        return Err(e);
                    }
                }
            }
        }

        let released = self.lock_manager().release_all(txn);
        debug!(%txn, pages = released.len(), "transaction committed");
        Ok(())
    }

    /// Discard every page `txn` dirtied, then release its locks.
    pub fn abort_transaction(&self, txn: TransactionId) {
        let locked = self.lock_manager().locks_of(txn);
        {
            let _structure = self.structure_lock();
            for page in &locked {
                let dirty = self.cached_page(*page).is_some_and(|c| c.is_dirty());
                if dirty && self.discard_locked(*page) {
                    BufferPoolStats::bump(&self.stats().pages_discarded);
                }
            }
        }

        let released = self.lock_manager().release_all(txn);
        debug!(%txn, pages = released.len(), "transaction aborted");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tempfile::TempDir;

    use crate::buffer::BufferPool;
    use crate::common::{BufferPoolConfig, PageIdentity, TableId, TransactionId};
    use crate::concurrency::Permission;
    use crate::common::Error;
    use crate::recovery::{FailingLog, MemoryLog};
    use crate::storage::{Catalog, HeapFile};

    const TABLE: TableId = TableId(2);

    fn pid(n: u32) -> PageIdentity {
        PageIdentity::new(TABLE, n)
    }

    fn setup(capacity: usize, pages: u32) -> (BufferPool, Arc<HeapFile>, Arc<MemoryLog>, TempDir) {
        let dir = TempDir::new().unwrap();
        let file = Arc::new(HeapFile::create(dir.path().join("t2.dat"), TABLE, 16).unwrap());
        for _ in 0..pages {
            file.allocate_page().unwrap();
        }
        let catalog = Arc::new(Catalog::new());
        catalog.add_table(file.clone());
        let log = Arc::new(MemoryLog::new());
        let config = BufferPoolConfig::new(capacity)
            .with_lock_timeout(Duration::from_millis(30))
            .with_lock_timeout_jitter(Duration::from_millis(5))
            .with_lock_retry_max_sleep(Duration::from_millis(1));
        (BufferPool::new(config, catalog, log.clone()), file, log, dir)
    }

    fn dirty(pool: &BufferPool, txn: TransactionId, page: PageIdentity, value: u8) {
        let h = pool.get_page(txn, page, Permission::Exclusive).unwrap();
        h.write().unwrap().as_mut_slice()[200] = value;
    }

    #[test]
    fn test_commit_flushes_and_releases() {
        let (pool, file, log, _dir) = setup(4, 2);
        let txn = TransactionId::new(10);
        dirty(&pool, txn, pid(0), 0x33);
        let _read = pool.get_page(txn, pid(1), Permission::Shared).unwrap();
        drop(_read);

        pool.transaction_complete(txn, true).unwrap();

        assert!(!pool.holds_lock(txn, pid(0)));
        assert!(!pool.holds_lock(txn, pid(1)));
        assert!(!pool.is_dirty(pid(0)));
        assert_eq!(file.read_page(pid(0)).unwrap().as_slice()[200], 0x33);
        // Only the dirty page is logged.
        assert_eq!(log.records().len(), 1);
        assert_eq!(pool.lock_manager().locked_page_count(), 0);
    }

    #[test]
    fn test_abort_discards_and_releases() {
        let (pool, file, log, _dir) = setup(4, 1);
        let txn = TransactionId::new(11);
        dirty(&pool, txn, pid(0), 0x44);

        pool.transaction_complete(txn, false).unwrap();

        assert!(!pool.holds_lock(txn, pid(0)));
        assert!(!pool.is_cached(pid(0)));
        assert!(log.records().is_empty());
        assert_eq!(file.read_page(pid(0)).unwrap().as_slice()[200], 0);
        assert_eq!(pool.stats().snapshot().pages_discarded, 1);
    }

    #[test]
    fn test_abort_keeps_clean_pages() {
        let (pool, _file, _log, _dir) = setup(4, 1);
        let txn = TransactionId::new(12);
        drop(pool.get_page(txn, pid(0), Permission::Shared).unwrap());

        pool.abort_transaction(txn);

        assert!(pool.is_cached(pid(0)));
        assert!(!pool.holds_lock(txn, pid(0)));
    }

    #[test]
    fn test_commit_leaves_other_txn_pages_alone() {
        let (pool, _file, log, _dir) = setup(4, 2);
        let (t1, t2) = (TransactionId::new(13), TransactionId::new(14));
        dirty(&pool, t1, pid(0), 1);
        dirty(&pool, t2, pid(1), 2);

        pool.commit_transaction(t1).unwrap();

        assert_eq!(pool.dirtied_by(pid(1)), Some(t2));
        assert!(pool.holds_lock(t2, pid(1)));
        assert_eq!(log.records().len(), 1);
    }

    #[test]
    fn test_commit_frees_room_for_eviction() {
        let (pool, _file, _log, _dir) = setup(2, 3);
        let txn = TransactionId::new(15);
        dirty(&pool, txn, pid(0), 1);
        dirty(&pool, txn, pid(1), 2);
        assert!(pool.get_page(txn, pid(2), Permission::Shared).is_err());

        pool.commit_transaction(txn).unwrap();

        let next = TransactionId::new(16);
        assert!(pool.get_page(next, pid(2), Permission::Shared).is_ok());
        assert_eq!(pool.page_count(), 2);
    }

    #[test]
    fn test_commit_flush_failure_keeps_locks() {
        let dir = TempDir::new().unwrap();
        let file = Arc::new(HeapFile::create(dir.path().join("t2.dat"), TABLE, 16).unwrap());
        file.allocate_page().unwrap();
        file.allocate_page().unwrap();
        let catalog = Arc::new(Catalog::new());
        catalog.add_table(file.clone());
        let pool = BufferPool::new(BufferPoolConfig::new(4), catalog, Arc::new(FailingLog));

        let txn = TransactionId::new(20);
        dirty(&pool, txn, pid(0), 0x55);
        drop(pool.get_page(txn, pid(1), Permission::Shared).unwrap());

        let err = pool.transaction_complete(txn, true).unwrap_err();
        assert!(matches!(err, Error::Io(_)));

        assert!(pool.holds_lock(txn, pid(0)));
        assert!(pool.holds_lock(txn, pid(1)));
        assert_eq!(pool.dirtied_by(pid(0)), Some(txn));
        assert_eq!(file.read_page(pid(0)).unwrap().as_slice()[200], 0);

        // Abort still cleans up after the failed commit.
        pool.abort_transaction(txn);
        assert!(!pool.holds_lock(txn, pid(0)));
        assert!(!pool.is_cached(pid(0)));
        assert_eq!(pool.lock_manager().locked_page_count(), 0);
    }

    #[test]
    fn test_complete_unknown_txn_is_noop() {
        let (pool, _file, _log, _dir) = setup(2, 1);
        pool.transaction_complete(TransactionId::new(99), true).unwrap();
        pool.transaction_complete(TransactionId::new(99), false).unwrap();
    }
}
