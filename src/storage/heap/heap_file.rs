//! Heap File - one table's records in an unordered file of pages.
//!
//! The [`HeapFile`] handles all direct file operations for a table:
//! - Reading and writing pages
//! - Appending new pages when every page is full
//! - Placing and removing fixed-size records through the buffer pool

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::debug;

use crate::buffer::{BufferPool, PageHandle};
use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageIdentity, Result, TableId, TransactionId};
use crate::concurrency::Permission;
use crate::storage::page::{HeapPageLayout, Page};
use crate::storage::{PageStore, Record, RecordId};

use super::HeapFileScan;

struct FileState {
    file: File,
    /// Number of pages in the file.
    page_count: u32,
}

/// A table stored as a sequence of heap pages.
///
/// # File Layout
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┬─────────┐
/// │ Page 0  │ Page 1  │ Page 2  │  ...    │ Page N  │
/// │ (4KB)   │ (4KB)   │ (4KB)   │         │ (4KB)   │
/// └─────────┴─────────┴─────────┴─────────┴─────────┘
/// Offset:  0      4096     8192    ...    N×4096
/// ```
/// Each page follows [`HeapPageLayout`] for the table's record size.
///
/// # Thread Safety
/// File access is serialized by an internal `Mutex`. Page content
/// consistency is the buffer pool's job.
///
/// # Durability
/// Every page write and append is followed by `fsync()`.
pub struct HeapFile {
    table_id: TableId,
    layout: HeapPageLayout,
    path: PathBuf,
    state: Mutex<FileState>,
}

impl HeapFile {
    /// Create a new, empty heap file.
    ///
    /// # Errors
    /// Returns an error if the file already exists or `record_size` does
    /// not fit a page.
    pub fn create<P: AsRef<Path>>(path: P, table_id: TableId, record_size: usize) -> Result<Self> {
        let layout = HeapPageLayout::new(record_size)?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path.as_ref())?;

        Ok(Self {
            table_id,
            layout,
            path: path.as_ref().to_path_buf(),
            state: Mutex::new(FileState {
                file,
                page_count: 0,
            }),
        })
    }

    /// Open an existing heap file.
    ///
    /// A trailing partial page is ignored.
    pub fn open<P: AsRef<Path>>(path: P, table_id: TableId, record_size: usize) -> Result<Self> {
        let layout = HeapPageLayout::new(record_size)?;
        let file = OpenOptions::new().read(true).write(true).open(path.as_ref())?;
        let page_count = (file.metadata()?.len() / PAGE_SIZE as u64) as u32;

        Ok(Self {
            table_id,
            layout,
            path: path.as_ref().to_path_buf(),
            state: Mutex::new(FileState { file, page_count }),
        })
    }

    #[inline]
    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    #[inline]
    pub fn layout(&self) -> HeapPageLayout {
        self.layout
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of pages in the file.
    pub fn num_pages(&self) -> u32 {
        self.state.lock().page_count
    }

    fn check_page(&self, page: PageIdentity, page_count: u32) -> Result<()> {
        if page.table_id() != self.table_id || page.page_number() >= page_count {
            return Err(Error::PageNotFound(page));
        }
        Ok(())
    }

    /// Read a page from disk.
    ///
    /// # Errors
    /// Returns `Error::PageNotFound` if the page doesn't exist.
    pub fn read_page(&self, page: PageIdentity) -> Result<Page> {
        let mut state = self.state.lock();
        self.check_page(page, state.page_count)?;

        state.file.seek(SeekFrom::Start(page.file_offset(PAGE_SIZE)))?;
        let mut data = Page::new();
        state.file.read_exact(data.as_mut_slice())?;

        Ok(data)
    }

    /// Write a page to disk and fsync.
    ///
    /// # Errors
    /// Returns `Error::PageNotFound` if the page hasn't been allocated.
    pub fn write_page(&self, page: PageIdentity, data: &Page) -> Result<()> {
        let mut state = self.state.lock();
        self.check_page(page, state.page_count)?;

        state.file.seek(SeekFrom::Start(page.file_offset(PAGE_SIZE)))?;
        state.file.write_all(data.as_slice())?;
        state.file.sync_all()?;

        Ok(())
    }

    /// Append a zeroed page and return its identity.
    pub fn allocate_page(&self) -> Result<PageIdentity> {
        let mut state = self.state.lock();
        let page = PageIdentity::new(self.table_id, state.page_count);

        state.file.seek(SeekFrom::Start(page.file_offset(PAGE_SIZE)))?;
        state.file.write_all(&[0u8; PAGE_SIZE])?;
        state.file.sync_all()?;

        state.page_count += 1;
        debug!(%page, "heap page appended");
        Ok(page)
    }

    /// Sequential scan of this file on behalf of `txn`.
    pub fn scan<'a>(&'a self, pool: &'a BufferPool, txn: TransactionId) -> HeapFileScan<'a> {
        HeapFileScan::new(self, pool, txn)
    }

    /// Decode every record stored in `page`.
    pub(crate) fn records_in(&self, page: PageIdentity, data: &Page) -> Vec<Record> {
        self.layout
            .used_slots(data)
            .map(|slot| {
                Record::stored_at(
                    RecordId::new(page, slot as u16),
                    self.layout.read(data, slot).to_vec(),
                )
            })
            .collect()
    }

    /// Put `record` in a free slot of `handle`'s page, if there is one.
    fn place(&self, handle: &PageHandle, record: &mut Record) -> Result<bool> {
        if self.layout.free_slot(&handle.read()).is_none() {
            return Ok(false);
        }

        let mut data = handle.write()?;
        let Some(slot) = self.layout.free_slot(&data) else {
            return Ok(false);
        };
        self.layout.write(&mut data, slot, record.data())?;
        record.set_id(Some(RecordId::new(handle.id(), slot as u16)));
        Ok(true)
    }
}

impl PageStore for HeapFile {
    fn table_id(&self) -> TableId {
        self.table_id
    }

    fn read_page(&self, page: PageIdentity) -> Result<Page> {
        HeapFile::read_page(self, page)
    }

    fn write_page(&self, page: PageIdentity, data: &Page) -> Result<()> {
        HeapFile::write_page(self, page, data)
    }

    fn num_pages(&self) -> Result<u32> {
        Ok(HeapFile::num_pages(self))
    }

    /// Scan pages under shared locks for a free slot, then take an
    /// exclusive lock on the page that has one. Shared locks on full pages
    /// the transaction did not hold before are released right away. If
    /// every page is full a new page is appended.
    fn insert_record(
        &self,
        pool: &BufferPool,
        txn: TransactionId,
        record: &mut Record,
    ) -> Result<Vec<PageHandle>> {
        if record.data().len() != self.layout.record_size() {
            return Err(Error::InvalidRecord(format!(
                "{} expects {}-byte records, got {}",
                self.table_id,
                self.layout.record_size(),
                record.data().len()
            )));
        }

        for page_number in 0..HeapFile::num_pages(self) {
            let page = PageIdentity::new(self.table_id, page_number);
            let held_before = pool.holds_lock(txn, page);

            let has_room = {
                let handle = pool.get_page(txn, page, Permission::Shared)?;
                let data = handle.read();
                self.layout.free_slot(&data).is_some()
            };
            if !has_room {
                if !held_before {
                    pool.release_page(txn, page);
                }
                continue;
            }

            let handle = pool.get_page(txn, page, Permission::Exclusive)?;
            if self.place(&handle, record)? {
                return Ok(vec![handle]);
            }
        }

        // Another transaction may fill a fresh page before we lock it.
        loop {
            let page = self.allocate_page()?;
            let handle = pool.get_page(txn, page, Permission::Exclusive)?;
            if self.place(&handle, record)? {
                return Ok(vec![handle]);
            }
        }
    }

    fn delete_record(
        &self,
        pool: &BufferPool,
        txn: TransactionId,
        record: &Record,
    ) -> Result<Vec<PageHandle>> {
        let rid = record
            .id()
            .ok_or_else(|| Error::RecordNotFound("record has no location".into()))?;
        if rid.page.table_id() != self.table_id {
            return Err(Error::RecordNotFound(format!(
                "{} is not in {}",
                rid, self.table_id
            )));
        }

        let slot = rid.slot as usize;
        let handle = pool.get_page(txn, rid.page, Permission::Exclusive)?;
        let present = slot < self.layout.slot_count() && self.layout.is_used(&handle.read(), slot);
        if !present {
            return Err(Error::RecordNotFound(format!("{} is empty", rid)));
        }

        {
            let mut data = handle.write()?;
            self.layout.clear(&mut data, slot);
        }
        Ok(vec![handle])
    }
}

impl std::fmt::Debug for HeapFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeapFile")
            .field("table_id", &self.table_id)
            .field("path", &self.path)
            .field("record_size", &self.layout.record_size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const TABLE: TableId = TableId(5);

    #[test]
    fn test_create_existing_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.dat");

        HeapFile::create(&path, TABLE, 8).unwrap();
        assert!(HeapFile::create(&path, TABLE, 8).is_err());
    }

    #[test]
    fn test_open_nonexistent_fails() {
        let dir = tempdir().unwrap();
        assert!(HeapFile::open(dir.path().join("missing.dat"), TABLE, 8).is_err());
    }

    #[test]
    fn test_allocate_and_read_page() {
        let dir = tempdir().unwrap();
        let hf = HeapFile::create(dir.path().join("t.dat"), TABLE, 8).unwrap();

        let page = hf.allocate_page().unwrap();
        assert_eq!(page, PageIdentity::new(TABLE, 0));
        assert_eq!(hf.num_pages(), 1);
        assert_eq!(hf.read_page(page).unwrap(), Page::new());
    }

    #[test]
    fn test_write_read_persist() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.dat");
        let page = PageIdentity::new(TABLE, 1);

        {
            let hf = HeapFile::create(&path, TABLE, 8).unwrap();
            hf.allocate_page().unwrap();
            hf.allocate_page().unwrap();

            let mut data = Page::new();
            data.as_mut_slice()[0] = 0x42;
            data.as_mut_slice()[4095] = 0xEF;
            hf.write_page(page, &data).unwrap();
        }

        let hf = HeapFile::open(&path, TABLE, 8).unwrap();
        assert_eq!(hf.num_pages(), 2);
        let data = hf.read_page(page).unwrap();
        assert_eq!(data.as_slice()[0], 0x42);
        assert_eq!(data.as_slice()[4095], 0xEF);
    }

    #[test]
    fn test_read_invalid_page() {
        let dir = tempdir().unwrap();
        let hf = HeapFile::create(dir.path().join("t.dat"), TABLE, 8).unwrap();
        hf.allocate_page().unwrap();

        assert!(matches!(
            hf.read_page(PageIdentity::new(TABLE, 1)),
            Err(Error::PageNotFound(_))
        ));
        // Wrong table.
        assert!(matches!(
            hf.read_page(PageIdentity::new(TableId::new(6), 0)),
            Err(Error::PageNotFound(_))
        ));
    }

    #[test]
    fn test_write_invalid_page() {
        let dir = tempdir().unwrap();
        let hf = HeapFile::create(dir.path().join("t.dat"), TABLE, 8).unwrap();
        assert!(hf.write_page(PageIdentity::new(TABLE, 0), &Page::new()).is_err());
    }

    #[test]
    fn test_delete_record_frees_slot() {
        use crate::common::BufferPoolConfig;
        use crate::recovery::MemoryLog;
        use crate::storage::Catalog;
        use std::sync::Arc;

        let dir = tempdir().unwrap();
        let hf = Arc::new(HeapFile::create(dir.path().join("t.dat"), TABLE, 4).unwrap());
        let catalog = Arc::new(Catalog::new());
        catalog.add_table(hf.clone());
        let pool = BufferPool::new(BufferPoolConfig::new(4), catalog, Arc::new(MemoryLog::new()));
        let txn = TransactionId::new(1);

        let mut record = Record::new(vec![1, 2, 3, 4]);
        pool.insert_record(txn, TABLE, &mut record).unwrap();
        let rid = record.id().unwrap();

        pool.delete_record(txn, &record).unwrap();
        {
            let handle = pool.get_page(txn, rid.page, Permission::Shared).unwrap();
            let data = handle.read();
            assert!(!hf.layout().is_used(&data, rid.slot as usize));
            assert_eq!(hf.layout().read(&data, rid.slot as usize), &[0, 0, 0, 0]);
        }
        assert_eq!(pool.dirtied_by(rid.page), Some(txn));

        assert!(matches!(
            pool.delete_record(txn, &record),
            Err(Error::RecordNotFound(_))
        ));
        assert!(matches!(
            pool.delete_record(txn, &Record::new(vec![0; 4])),
            Err(Error::RecordNotFound(_))
        ));
    }

    #[test]
    fn test_records_in() {
        let dir = tempdir().unwrap();
        let hf = HeapFile::create(dir.path().join("t.dat"), TABLE, 2).unwrap();
        let page = PageIdentity::new(TABLE, 0);

        let mut data = Page::new();
        hf.layout().write(&mut data, 1, &[1, 2]).unwrap();
        hf.layout().write(&mut data, 4, &[3, 4]).unwrap();

        let records = hf.records_in(page, &data);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id(), Some(RecordId::new(page, 1)));
        assert_eq!(records[1].data(), &[3, 4]);
    }
}
