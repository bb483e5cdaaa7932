//! Sequential scan over a heap file.

use std::collections::VecDeque;

use crate::buffer::BufferPool;
use crate::common::{Error, PageIdentity, Result, TransactionId};
use crate::concurrency::Permission;
use crate::storage::Record;

use super::HeapFile;

/// Forward-only, rewindable scan of every record in a [`HeapFile`].
///
/// Pages are fetched one at a time through
/// [`BufferPool::get_page`] with shared permission; the shared locks stay
/// with the transaction until it completes.
///
/// # Example
/// ```ignore
/// let mut scan = heap_file.scan(&pool, txn);
/// scan.open()?;
/// for record in &mut scan {
///     let record = record?;
///     // ...
/// }
/// scan.close();
/// ```
pub struct HeapFileScan<'a> {
    file: &'a HeapFile,
    pool: &'a BufferPool,
    txn: TransactionId,
    state: Option<ScanState>,
}

struct ScanState {
    /// Next page to load.
    next_page: u32,
    /// Records of the current page not yet returned.
    buffered: VecDeque<Record>,
}

impl<'a> HeapFileScan<'a> {
    pub(crate) fn new(file: &'a HeapFile, pool: &'a BufferPool, txn: TransactionId) -> Self {
        Self {
            file,
            pool,
            txn,
            state: None,
        }
    }

    /// Start the scan at the first page.
    ///
    /// # Errors
    /// `Error::Scan` if the file has no pages.
    pub fn open(&mut self) -> Result<()> {
        if self.file.num_pages() == 0 {
            return Err(Error::Scan(format!("{} is empty", self.file.table_id())));
        }
        self.state = Some(ScanState {
            next_page: 0,
            buffered: VecDeque::new(),
        });
        Ok(())
    }

    /// Restart an open scan from the first page.
    pub fn rewind(&mut self) -> Result<()> {
        match self.state.as_mut() {
            Some(state) => {
                state.next_page = 0;
                state.buffered.clear();
                Ok(())
            }
            None => Err(Error::Scan("scan is not open".into())),
        }
    }

    /// Stop the scan. It can be reopened with [`open`](Self::open).
    pub fn close(&mut self) {
        self.state = None;
    }

    pub fn is_open(&self) -> bool {
        self.state.is_some()
    }

    /// Next record, or `None` once every page has been read.
    ///
    /// # Errors
    /// `Error::Scan` if the scan is not open, or any `get_page` error.
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        let state = self
            .state
            .as_mut()
            .ok_or_else(|| Error::Scan("scan is not open".into()))?;

        loop {
            if let Some(record) = state.buffered.pop_front() {
                return Ok(Some(record));
            }
            if state.next_page >= self.file.num_pages() {
                return Ok(None);
            }

            let page = PageIdentity::new(self.file.table_id(), state.next_page);
            let handle = self.pool.get_page(self.txn, page, Permission::Shared)?;
            state.buffered.extend(self.file.records_in(page, &handle.read()));
            state.next_page += 1;
        }
    }
}

impl Iterator for HeapFileScan<'_> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::TempDir;

    use crate::buffer::BufferPool;
    use crate::common::{BufferPoolConfig, Error, TableId, TransactionId};
    use crate::recovery::MemoryLog;
    use crate::storage::{Catalog, HeapFile, Record};

    const TABLE: TableId = TableId(9);

    fn setup() -> (BufferPool, Arc<HeapFile>, TempDir) {
        let dir = TempDir::new().unwrap();
        let file = Arc::new(HeapFile::create(dir.path().join("t9.dat"), TABLE, 1000).unwrap());
        let catalog = Arc::new(Catalog::new());
        catalog.add_table(file.clone());
        let pool = BufferPool::new(BufferPoolConfig::new(8), catalog, Arc::new(MemoryLog::new()));
        (pool, file, dir)
    }

    #[test]
    fn test_open_empty_file_fails() {
        let (pool, file, _dir) = setup();
        let mut scan = file.scan(&pool, TransactionId::new(1));
        assert!(matches!(scan.open(), Err(Error::Scan(_))));
        assert!(matches!(scan.next_record(), Err(Error::Scan(_))));
    }

    #[test]
    fn test_scan_across_pages_and_rewind() {
        let (pool, file, _dir) = setup();
        let txn = TransactionId::new(1);

        // 4 slots per page at 1000 bytes, so 6 records span two pages.
        for i in 0..6u8 {
            let mut record = Record::new(vec![i; 1000]);
            pool.insert_record(txn, TABLE, &mut record).unwrap();
        }
        assert_eq!(file.num_pages(), 2);

        let mut scan = file.scan(&pool, txn);
        scan.open().unwrap();
        let firsts: Vec<u8> = scan.by_ref().map(|r| r.unwrap().data()[0]).collect();
        assert_eq!(firsts, vec![0, 1, 2, 3, 4, 5]);

        scan.rewind().unwrap();
        assert_eq!(scan.by_ref().count(), 6);

        scan.close();
        assert!(!scan.is_open());
        assert!(scan.rewind().is_err());
    }
}
