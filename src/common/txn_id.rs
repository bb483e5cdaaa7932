//! Transaction identifier type.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TXN_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one unit of work.
///
/// Carries no state beyond its value; equality is by value. Fresh ids come
/// from [`TransactionId::next`], which never hands out the same id twice in
/// a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(pub u64);

impl TransactionId {
    /// Create a TransactionId from a raw value.
    #[inline]
    pub fn new(id: u64) -> Self {
        TransactionId(id)
    }

    /// Allocate a process-unique transaction id.
    pub fn next() -> Self {
        TransactionId(NEXT_TXN_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Txn({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_is_unique() {
        let a = TransactionId::next();
        let b = TransactionId::next();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn test_txn_id_display() {
        assert_eq!(format!("{}", TransactionId::new(9)), "Txn(9)");
    }
}
