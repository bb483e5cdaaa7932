//! Error types for pagelock.

use thiserror::Error;

use crate::common::{PageIdentity, TableId, TransactionId};

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors surfaced by the lock manager, buffer pool and
/// storage collaborators.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from a page store or log file.
    ///
    /// Propagated unmodified; the cache entry for the page involved is left
    /// as it was.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A lock could not be acquired before the jittered deadline.
    ///
    /// Treated as a probable deadlock: the transaction must abort.
    #[error("{txn} timed out waiting for a lock on {page}; transaction aborted")]
    LockTimeout {
        txn: TransactionId,
        page: PageIdentity,
    },

    /// Every cached page is dirty (or in use), so nothing can be evicted.
    #[error("buffer pool full of dirty pages (capacity {capacity})")]
    BufferPoolFull { capacity: usize },

    /// Requested page does not exist in its page store.
    #[error("{0} not found")]
    PageNotFound(PageIdentity),

    /// No page store is registered for the table.
    #[error("{0} not found in catalog")]
    TableNotFound(TableId),

    /// The record's slot is empty or the record has no location.
    #[error("record not found: {0}")]
    RecordNotFound(String),

    /// The record does not fit the table's layout.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// A write was attempted through a lease obtained with shared permission.
    #[error("{txn} holds only a shared lock on {page}")]
    PermissionDenied {
        txn: TransactionId,
        page: PageIdentity,
    },

    /// A log frame failed its checksum or is truncated.
    #[error("corrupt log: {0}")]
    CorruptLog(String),

    /// A scan was used before `open` or after `close`, or over an empty file.
    #[error("scan error: {0}")]
    Scan(String),
}

impl Error {
    /// Whether this error requires the calling transaction to abort.
    pub fn is_abort(&self) -> bool {
        matches!(self, Error::LockTimeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::BufferPoolFull { capacity: 2 };
        assert_eq!(
            format!("{}", err),
            "buffer pool full of dirty pages (capacity 2)"
        );

        let err = Error::PageNotFound(PageIdentity::new(TableId::new(1), 42));
        assert_eq!(format!("{}", err), "Page(1:42) not found");
    }

    #[test]
    fn test_lock_timeout_is_abort() {
        let err = Error::LockTimeout {
            txn: TransactionId::new(3),
            page: PageIdentity::new(TableId::new(0), 0),
        };
        assert!(err.is_abort());
        assert!(!Error::BufferPoolFull { capacity: 1 }.is_abort());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();

        match err {
            Error::Io(_) => {} // Success
            _ => panic!("Expected Io error"),
        }
    }
}
