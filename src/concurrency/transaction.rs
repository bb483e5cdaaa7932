//! Transaction - RAII handle over one unit of work.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::buffer::{BufferPool, PageHandle};
use crate::common::{PageIdentity, Result, TableId, TransactionId};
use crate::concurrency::Permission;
use crate::storage::Record;

/// An active transaction against a [`BufferPool`].
///
/// `commit` and `abort` consume the handle, so no operation can follow
/// termination. Dropping an active transaction aborts it.
///
/// # Example
/// ```ignore
/// let txn = Transaction::begin(Arc::clone(&pool));
/// let handle = txn.get_page(pid, Permission::Exclusive)?;
/// handle.write()?.as_mut_slice()[0] = 1;
/// drop(handle);
/// txn.commit()?;
/// ```
pub struct Transaction {
    id: TransactionId,
    pool: Arc<BufferPool>,
    active: bool,
}

impl Transaction {
    /// Start a transaction with a fresh id.
    pub fn begin(pool: Arc<BufferPool>) -> Self {
        let id = TransactionId::next();
        debug!(txn = %id, "transaction started");
        Self {
            id,
            pool,
            active: true,
        }
    }

    #[inline]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }

    /// [`BufferPool::get_page`] for this transaction.
    pub fn get_page(&self, page: PageIdentity, permission: Permission) -> Result<PageHandle> {
        self.pool.get_page(self.id, page, permission)
    }

    /// [`BufferPool::insert_record`] for this transaction.
    pub fn insert_record(&self, table: TableId, record: &mut Record) -> Result<()> {
        self.pool.insert_record(self.id, table, record)
    }

    /// [`BufferPool::delete_record`] for this transaction.
    pub fn delete_record(&self, record: &Record) -> Result<()> {
        self.pool.delete_record(self.id, record)
    }

    pub fn holds_lock(&self, page: PageIdentity) -> bool {
        self.pool.holds_lock(self.id, page)
    }

    /// Flush this transaction's pages and release its locks.
    ///
    /// If a flush fails the transaction is aborted before the error is
    /// returned. Pages flushed before the failure stay durable.
    pub fn commit(mut self) -> Result<()> {
        self.active = false;
        if let Err(e) = self.pool.commit_transaction(self.id) {
            warn!(txn = %self.id, error = %e, "commit failed, aborting");
            self.pool.abort_transaction(self.id);
            return Err(e);
        }
        Ok(())
    }

    /// Discard this transaction's changes and release its locks.
    pub fn abort(mut self) {
        self.active = false;
        self.pool.abort_transaction(self.id);
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.active {
            warn!(txn = %self.id, "transaction dropped while active, aborting");
            self.pool.abort_transaction(self.id);
        }
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("active", &self.active)
            .finish()
    }
}
