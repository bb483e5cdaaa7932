//! In-memory log, for embedding without durability and for tests.

use parking_lot::Mutex;

use crate::common::{PageIdentity, Result, TransactionId};
use crate::recovery::{LogFile, LogRecord};
use crate::storage::page::Page;

/// A [`LogFile`] that keeps records in memory and counts forces.
#[derive(Debug, Default)]
pub struct MemoryLog {
    records: Mutex<Vec<LogRecord>>,
    forces: Mutex<u64>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every record appended so far.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// Number of `force` calls.
    pub fn forces(&self) -> u64 {
        *self.forces.lock()
    }
}

impl LogFile for MemoryLog {
    fn log_write(&self, txn: TransactionId, page: PageIdentity, before: &Page, after: &Page) -> Result<()> {
        self.records.lock().push(LogRecord {
            txn,
            page,
            before: Box::new(before.clone()),
            after: Box::new(after.clone()),
        });
        Ok(())
    }

    fn force(&self) -> Result<()> {
        *self.forces.lock() += 1;
        Ok(())
    }
}

/// A [`LogFile`] whose every write fails, for exercising flush errors.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct FailingLog;

#[cfg(test)]
impl LogFile for FailingLog {
    fn log_write(&self, _txn: TransactionId, _page: PageIdentity, _before: &Page, _after: &Page) -> Result<()> {
        Err(std::io::Error::new(std::io::ErrorKind::Other, "disk gone").into())
    }

    fn force(&self) -> Result<()> {
        Err(std::io::Error::new(std::io::ErrorKind::Other, "disk gone").into())
    }
}
