//! Leased access to cached pages.
//!
//! - [`PageHandle`] - Returned by `BufferPool::get_page`; pins the page
//! - [`PageWriteGuard`] - Exclusive write access (auto-marks dirty)
//!
//! A handle is a lease: it stays valid while the pool keeps the page
//! cached. Pinning keeps the page from being evicted, but
//! `BufferPool::discard_page` and the abort path drop pages regardless;
//! writes made through a handle after its page was discarded are lost.
//!
//! Do not hold a [`PageWriteGuard`] across another buffer pool call. A
//! flush of the same page waits for the guard to drop.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::buffer::CachedPage;
use crate::common::{Error, PageIdentity, Result, TransactionId};
use crate::concurrency::Permission;
use crate::storage::page::Page;

/// A pinned page, obtained under a page lock held by `txn`.
///
/// The page is unpinned when the handle is dropped. The page lock is not
/// released; that happens at transaction end.
///
/// # Example
/// ```ignore
/// let handle = pool.get_page(txn, pid, Permission::Exclusive)?;
/// {
///     let mut page = handle.write()?;
///     page.as_mut_slice()[0] = 0xFF;
/// } // guard drops: page marked dirty by txn
/// ```
pub struct PageHandle {
    page: Arc<CachedPage>,
    txn: TransactionId,
    permission: Permission,
}

impl PageHandle {
    /// Wrap an already pinned page.
    pub(crate) fn new(page: Arc<CachedPage>, txn: TransactionId, permission: Permission) -> Self {
        Self {
            page,
            txn,
            permission,
        }
    }

    #[inline]
    pub fn id(&self) -> PageIdentity {
        self.page.id()
    }

    #[inline]
    pub fn txn(&self) -> TransactionId {
        self.txn
    }

    /// The permission this handle was obtained with.
    #[inline]
    pub fn permission(&self) -> Permission {
        self.permission
    }

    /// Shared access to the page content.
    #[inline]
    pub fn read(&self) -> RwLockReadGuard<'_, Page> {
        self.page.page()
    }

    /// Exclusive access to the page content.
    ///
    /// # Errors
    /// `Error::PermissionDenied` if the handle was obtained with
    /// `Permission::Shared`.
    pub fn write(&self) -> Result<PageWriteGuard<'_>> {
        if !self.permission.allows_write() {
            return Err(Error::PermissionDenied {
                txn: self.txn,
                page: self.id(),
            });
        }
        Ok(PageWriteGuard {
            handle: self,
            lock: self.page.page_mut(),
            modified: false,
        })
    }

    /// Whether the page has unflushed modifications.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.page.is_dirty()
    }

    #[inline]
    pub(crate) fn cached(&self) -> &Arc<CachedPage> {
        &self.page
    }
}

impl std::fmt::Debug for PageHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageHandle")
            .field("page", &self.id())
            .field("txn", &self.txn)
            .field("permission", &self.permission)
            .finish()
    }
}

impl Drop for PageHandle {
    fn drop(&mut self) {
        self.page.unpin();
    }
}

/// Guard for exclusive write access to a page.
///
/// If the page was borrowed mutably, it is marked dirty by the handle's
/// transaction when the guard is dropped, while the write lock is still
/// held. A guard only read through leaves the dirty state alone.
pub struct PageWriteGuard<'a> {
    handle: &'a PageHandle,
    lock: RwLockWriteGuard<'a, Page>,
    modified: bool,
}

impl PageWriteGuard<'_> {
    #[inline]
    pub fn page_id(&self) -> PageIdentity {
        self.handle.id()
    }
}

impl Deref for PageWriteGuard<'_> {
    type Target = Page;

    #[inline]
    fn deref(&self) -> &Page {
        &self.lock
    }
}

impl DerefMut for PageWriteGuard<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Page {
        self.modified = true;
        &mut self.lock
    }
}

impl Drop for PageWriteGuard<'_> {
    fn drop(&mut self) {
        // Fields drop after this body, so `lock` is still held here.
        if self.modified {
            self.handle.page.mark_dirty(self.handle.txn);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::TableId;

    fn handle(permission: Permission) -> PageHandle {
        let cp = Arc::new(CachedPage::new(
            PageIdentity::new(TableId::new(1), 0),
            Page::new(),
        ));
        cp.pin();
        PageHandle::new(cp, TransactionId::new(7), permission)
    }

    #[test]
    fn test_shared_handle_cannot_write() {
        let h = handle(Permission::Shared);
        assert!(matches!(h.write(), Err(Error::PermissionDenied { .. })));
        assert_eq!(h.read().as_slice()[0], 0);
    }

    #[test]
    fn test_write_guard_marks_dirty() {
        let h = handle(Permission::Exclusive);
        assert!(!h.is_dirty());
        {
            let mut page = h.write().unwrap();
            page.as_mut_slice()[0] = 0xAB;
        }
        assert!(h.is_dirty());
        assert_eq!(h.cached().dirtied_by(), Some(TransactionId::new(7)));
        assert_eq!(h.read().as_slice()[0], 0xAB);
    }

    #[test]
    fn test_unmodified_write_guard_stays_clean() {
        let h = handle(Permission::Exclusive);
        {
            let page = h.write().unwrap();
            assert_eq!(page.as_slice()[0], 0);
        }
        assert!(!h.is_dirty());
        assert_eq!(h.cached().dirtied_by(), None);
    }

    #[test]
    fn test_drop_unpins() {
        let h = handle(Permission::Shared);
        let cp = Arc::clone(h.cached());
        assert_eq!(cp.pin_count(), 1);
        drop(h);
        assert_eq!(cp.pin_count(), 0);
    }
}
