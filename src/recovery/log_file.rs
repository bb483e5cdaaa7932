//! The write-ahead log interface used by flushes.

use crate::common::{PageIdentity, Result, TransactionId};
use crate::storage::page::Page;

/// One logged page update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub txn: TransactionId,
    pub page: PageIdentity,
    /// Page content before the update (last durable state).
    pub before: Box<Page>,
    /// Page content being written.
    pub after: Box<Page>,
}

/// Durable log consumed by the buffer pool.
///
/// Before a dirty page reaches its page store the pool calls
/// [`log_write`](LogFile::log_write) and then [`force`](LogFile::force);
/// the page write happens only after `force` returns.
pub trait LogFile: Send + Sync {
    /// Append an update record for `page`.
    fn log_write(&self, txn: TransactionId, page: PageIdentity, before: &Page, after: &Page) -> Result<()>;

    /// Make every appended record durable.
    fn force(&self) -> Result<()>;
}
