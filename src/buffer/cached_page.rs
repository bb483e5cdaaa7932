//! CachedPage - one page resident in the buffer pool.
//!
//! A [`CachedPage`] holds the page content plus the metadata the buffer
//! pool needs for NO-STEAL/FORCE management:
//! - Which transaction dirtied the page (if any)
//! - The before-image: content as of the last clean state
//! - Pin count of outstanding [`PageHandle`](super::PageHandle)s

use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::common::{PageIdentity, TransactionId};
use crate::storage::page::Page;

/// A page in the buffer pool.
///
/// # Dirty state
/// The page is dirty iff `dirtied_by` is `Some`. There is no separate dirty
/// flag, so a clean page can never carry a dirtying transaction. While
/// clean, `before_image == page`.
///
/// # Thread Safety
/// - `page`: `RwLock` for read/write synchronization
/// - `before_image`: `Mutex`, touched only by the flush path
/// - `dirtied_by`: `Mutex`
/// - `pin_count`: `AtomicU32` for lock-free reference counting
pub struct CachedPage {
    id: PageIdentity,

    /// Current in-memory content.
    page: RwLock<Page>,

    /// Content as of the last load or successful flush.
    before_image: Mutex<Page>,

    /// Transaction that last dirtied the page; `None` when clean.
    dirtied_by: Mutex<Option<TransactionId>>,

    /// Number of outstanding handles.
    pin_count: AtomicU32,
}

impl CachedPage {
    /// Wrap freshly loaded content. The page starts clean and unpinned.
    pub fn new(id: PageIdentity, page: Page) -> Self {
        Self {
            id,
            before_image: Mutex::new(page.clone()),
            page: RwLock::new(page),
            dirtied_by: Mutex::new(None),
            pin_count: AtomicU32::new(0),
        }
    }

    #[inline]
    pub fn id(&self) -> PageIdentity {
        self.id
    }

    // ========================================================================
    // Page access (RwLock)
    // ========================================================================

    /// Acquire read lock on the page.
    #[inline]
    pub fn page(&self) -> RwLockReadGuard<'_, Page> {
        self.page.read()
    }

    /// Acquire write lock on the page.
    #[inline]
    pub(crate) fn page_mut(&self) -> RwLockWriteGuard<'_, Page> {
        self.page.write()
    }

    /// Copy of the before-image.
    pub fn before_image(&self) -> Page {
        self.before_image.lock().clone()
    }

    #[inline]
    pub(crate) fn before_image_mut(&self) -> MutexGuard<'_, Page> {
        self.before_image.lock()
    }

    // ========================================================================
    // Dirty state
    // ========================================================================

    /// Record that `txn` modified the page.
    #[inline]
    pub(crate) fn mark_dirty(&self, txn: TransactionId) {
        *self.dirtied_by.lock() = Some(txn);
    }

    /// Forget the dirtying transaction. Only valid once the content has
    /// been made durable and the before-image refreshed.
    #[inline]
    pub(crate) fn clear_dirty(&self) {
        *self.dirtied_by.lock() = None;
    }

    /// The transaction that dirtied this page, if it is dirty.
    #[inline]
    pub fn dirtied_by(&self) -> Option<TransactionId> {
        *self.dirtied_by.lock()
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirtied_by().is_some()
    }

    // ========================================================================
    // Pin count operations (Atomic)
    // ========================================================================

    /// Increment the pin count. Returns the new pin count.
    #[inline]
    pub(crate) fn pin(&self) -> u32 {
        self.pin_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Decrement the pin count. Returns the new pin count.
    ///
    /// # Panics
    /// Panics if pin count is already 0.
    #[inline]
    pub(crate) fn unpin(&self) -> u32 {
        let old = self.pin_count.fetch_sub(1, Ordering::AcqRel);
        assert!(old > 0, "pin count underflow");
        old - 1
    }

    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pin_count() > 0
    }

    /// NO-STEAL: only clean pages nobody is using may leave the cache.
    #[inline]
    pub fn is_evictable(&self) -> bool {
        !self.is_pinned() && !self.is_dirty()
    }
}

impl std::fmt::Debug for CachedPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedPage")
            .field("id", &self.id)
            .field("dirtied_by", &self.dirtied_by())
            .field("pin_count", &self.pin_count())
            .finish()
    }
}
