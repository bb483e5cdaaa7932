//! Lock Manager - page-granularity shared/exclusive locks.
//!
//! The [`LockManager`] is a pure bookkeeping structure: it grants or denies
//! lock requests immediately and never blocks. Waiting and timeouts are the
//! caller's business (see [`BufferPool::get_page`]).
//!
//! [`BufferPool::get_page`]: crate::buffer::BufferPool::get_page

use std::collections::{BTreeSet, HashMap};

use parking_lot::Mutex;
use tracing::trace;

use crate::common::{PageIdentity, TransactionId};
use crate::concurrency::Permission;

/// Holders of one page's lock.
///
/// Invariant: if any holder has `Exclusive`, it is the only holder.
#[derive(Debug, Default)]
struct LockRecord {
    holders: HashMap<TransactionId, Permission>,
}

impl LockRecord {
    fn is_sole_holder(&self, txn: TransactionId) -> bool {
        self.holders.len() == 1 && self.holders.contains_key(&txn)
    }

    fn all_shared(&self) -> bool {
        self.holders.values().all(|&p| p == Permission::Shared)
    }
}

/// Both indexes of the lock table. Always mutated together.
#[derive(Debug, Default)]
struct LockTable {
    by_page: HashMap<PageIdentity, LockRecord>,
    by_txn: HashMap<TransactionId, BTreeSet<PageIdentity>>,
}

/// Per-page lock table.
///
/// # Thread Safety
/// The whole table sits behind one `Mutex`, so every grant, release and
/// query is linearized.
///
/// # Compatibility
/// | held by `txn` | requested  | outcome                                   |
/// |---------------|------------|-------------------------------------------|
/// | same/stronger | any        | granted, no change                        |
/// | `Shared`      | `Exclusive`| upgraded in place iff `txn` is sole holder|
/// | nothing       | `Shared`   | granted iff no `Exclusive` holder         |
/// | nothing       | `Exclusive`| granted iff no holder at all              |
///
/// # Example
/// ```
/// use pagelock::{LockManager, PageIdentity, Permission, TableId, TransactionId};
///
/// let lm = LockManager::new();
/// let page = PageIdentity::new(TableId::new(1), 0);
/// let (t1, t2) = (TransactionId::new(1), TransactionId::new(2));
///
/// assert!(lm.acquire(page, t1, Permission::Shared));
/// assert!(lm.acquire(page, t2, Permission::Shared));
/// assert!(!lm.acquire(page, t1, Permission::Exclusive)); // t2 still reads
///
/// lm.release(page, t2);
/// assert!(lm.acquire(page, t1, Permission::Exclusive)); // sole holder upgrades
/// ```
#[derive(Debug, Default)]
pub struct LockManager {
    table: Mutex<LockTable>,
}

impl LockManager {
    /// Create an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to grant `permission` on `page` to `txn` without blocking.
    ///
    /// Returns `true` if `txn` now holds at least `permission`.
    pub fn acquire(&self, page: PageIdentity, txn: TransactionId, permission: Permission) -> bool {
        let mut table = self.table.lock();
        let record = table.by_page.entry(page).or_default();

        let granted = match record.holders.get(&txn).copied() {
            Some(held) if held.covers(permission) => true,
            Some(_) => {
                // Shared held, Exclusive requested.
                if record.is_sole_holder(txn) {
                    record.holders.insert(txn, permission);
                    true
                } else {
                    false
                }
            }
            None => {
                let compatible = record.holders.is_empty()
                    || (permission == Permission::Shared && record.all_shared());
                if compatible {
                    record.holders.insert(txn, permission);
                }
                compatible
            }
        };

        if record.holders.is_empty() {
            // A denied request must not leave an empty record behind.
            table.by_page.remove(&page);
        } else if granted {
            table.by_txn.entry(txn).or_default().insert(page);
        }

        trace!(%txn, %page, %permission, granted, "lock request");
        granted
    }

    /// Drop whatever lock `txn` holds on `page`. No-op if it holds none.
    pub fn release(&self, page: PageIdentity, txn: TransactionId) {
        let mut table = self.table.lock();

        if let Some(record) = table.by_page.get_mut(&page) {
            if record.holders.remove(&txn).is_some() {
                trace!(%txn, %page, "lock released");
            }
            if record.holders.is_empty() {
                table.by_page.remove(&page);
            }
        }

        if let Some(pages) = table.by_txn.get_mut(&txn) {
            pages.remove(&page);
            if pages.is_empty() {
                table.by_txn.remove(&txn);
            }
        }
    }

    /// Release every lock `txn` holds. Returns the pages that were released.
    pub fn release_all(&self, txn: TransactionId) -> Vec<PageIdentity> {
        let mut table = self.table.lock();
        let pages = table.by_txn.remove(&txn).unwrap_or_default();

        for page in &pages {
            if let Some(record) = table.by_page.get_mut(page) {
                record.holders.remove(&txn);
                if record.holders.is_empty() {
                    table.by_page.remove(page);
                }
            }
        }

        pages.into_iter().collect()
    }

    /// Whether `txn` holds any lock on `page`.
    pub fn holds(&self, page: PageIdentity, txn: TransactionId) -> bool {
        self.table
            .lock()
            .by_page
            .get(&page)
            .is_some_and(|r| r.holders.contains_key(&txn))
    }

    /// The permission `txn` holds on `page`, if any.
    pub fn permission(&self, page: PageIdentity, txn: TransactionId) -> Option<Permission> {
        self.table
            .lock()
            .by_page
            .get(&page)
            .and_then(|r| r.holders.get(&txn).copied())
    }

    /// All pages `txn` currently holds a lock on, in identity order.
    pub fn locks_of(&self, txn: TransactionId) -> Vec<PageIdentity> {
        self.table
            .lock()
            .by_txn
            .get(&txn)
            .map(|pages| pages.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Current holders of `page`, sorted by transaction id.
    pub fn holders(&self, page: PageIdentity) -> Vec<(TransactionId, Permission)> {
        let table = self.table.lock();
        let mut holders: Vec<_> = table
            .by_page
            .get(&page)
            .map(|r| r.holders.iter().map(|(&t, &p)| (t, p)).collect())
            .unwrap_or_default();
        holders.sort();
        holders
    }

    /// Number of pages with at least one holder.
    pub fn locked_page_count(&self) -> usize {
        self.table.lock().by_page.len()
    }
}
