//! File Log - append-only, checksummed update log.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::trace;

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageIdentity, Result, TableId, TransactionId};
use crate::recovery::{LogFile, LogRecord};
use crate::storage::page::Page;

/// txn (8) + table (4) + page number (4) + before + after
const PAYLOAD_LEN: usize = 16 + 2 * PAGE_SIZE;

/// Update log stored in a single append-only file.
///
/// Framing on disk:
/// ```text
/// [payload_len: u32][payload][crc32(payload): u32]
///
/// payload = txn: u64 | table: u32 | page_number: u32 | before | after
/// ```
/// All integers are little-endian. `force()` is `fsync`.
pub struct FileLog {
    file: Mutex<File>,
    path: PathBuf,
    records_written: AtomicU64,
}

impl FileLog {
    /// Create (or truncate) a log file.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path.as_ref())?;
        Ok(Self::with_file(file, path.as_ref()))
    }

    /// Open a log file for appending, creating it if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        Ok(Self::with_file(file, path.as_ref()))
    }

    fn with_file(file: File, path: &Path) -> Self {
        Self {
            file: Mutex::new(file),
            path: path.to_path_buf(),
            records_written: AtomicU64::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records appended through this handle.
    pub fn records_written(&self) -> u64 {
        self.records_written.load(Ordering::Relaxed)
    }

    /// Read and verify every record in the log at `path`.
    ///
    /// # Errors
    /// `Error::CorruptLog` on a truncated frame, bad length or checksum
    /// mismatch.
    pub fn read_records<P: AsRef<Path>>(path: P) -> Result<Vec<LogRecord>> {
        let mut bytes = Vec::new();
        File::open(path.as_ref())?.read_to_end(&mut bytes)?;

        let mut records = Vec::new();
        let mut offset = 0;
        while offset < bytes.len() {
            let frame = &bytes[offset..];
            if frame.len() < 4 {
                return Err(Error::CorruptLog(format!("truncated frame header at {}", offset)));
            }
            let len = u32::from_le_bytes(read_array(&frame[0..4])) as usize;
            if len != PAYLOAD_LEN {
                return Err(Error::CorruptLog(format!("bad frame length {} at {}", len, offset)));
            }
            if frame.len() < 4 + len + 4 {
                return Err(Error::CorruptLog(format!("truncated frame at {}", offset)));
            }

            let payload = &frame[4..4 + len];
            let crc = u32::from_le_bytes(read_array(&frame[4 + len..8 + len]));
            if crc32fast::hash(payload) != crc {
                return Err(Error::CorruptLog(format!("checksum mismatch at {}", offset)));
            }

            records.push(decode_payload(payload));
            offset += 8 + len;
        }

        Ok(records)
    }
}

fn read_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    out
}

fn encode_frame(txn: TransactionId, page: PageIdentity, before: &Page, after: &Page) -> Vec<u8> {
    let mut payload = Vec::with_capacity(PAYLOAD_LEN);
    payload.extend_from_slice(&txn.0.to_le_bytes());
    payload.extend_from_slice(&page.table_id().0.to_le_bytes());
    payload.extend_from_slice(&page.page_number().to_le_bytes());
    payload.extend_from_slice(before.as_slice());
    payload.extend_from_slice(after.as_slice());

    let mut frame = Vec::with_capacity(PAYLOAD_LEN + 8);
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(&payload);
    frame.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    frame
}

/// `payload` must be exactly `PAYLOAD_LEN` bytes.
fn decode_payload(payload: &[u8]) -> LogRecord {
    let txn = TransactionId::new(u64::from_le_bytes(read_array(&payload[0..8])));
    let table = TableId::new(u32::from_le_bytes(read_array(&payload[8..12])));
    let page_number = u32::from_le_bytes(read_array(&payload[12..16]));

    let mut before = Box::new(Page::new());
    before.as_mut_slice().copy_from_slice(&payload[16..16 + PAGE_SIZE]);
    let mut after = Box::new(Page::new());
    after.as_mut_slice().copy_from_slice(&payload[16 + PAGE_SIZE..]);

    LogRecord {
        txn,
        page: PageIdentity::new(table, page_number),
        before,
        after,
    }
}

impl LogFile for FileLog {
    fn log_write(&self, txn: TransactionId, page: PageIdentity, before: &Page, after: &Page) -> Result<()> {
        let frame = encode_frame(txn, page, before, after);
        self.file.lock().write_all(&frame)?;
        self.records_written.fetch_add(1, Ordering::Relaxed);
        trace!(%txn, %page, "update logged");
        Ok(())
    }

    fn force(&self) -> Result<()> {
        self.file.lock().sync_data()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn pages(a: u8, b: u8) -> (Page, Page) {
        let mut before = Page::new();
        before.as_mut_slice()[0] = a;
        let mut after = Page::new();
        after.as_mut_slice()[0] = b;
        (before, after)
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wal.log");
        let page = PageIdentity::new(TableId::new(3), 8);

        let log = FileLog::create(&path).unwrap();
        let (before, after) = pages(1, 2);
        log.log_write(TransactionId::new(4), page, &before, &after).unwrap();
        log.force().unwrap();
        assert_eq!(log.records_written(), 1);

        let records = FileLog::read_records(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].txn, TransactionId::new(4));
        assert_eq!(records[0].page, page);
        assert_eq!(*records[0].before, before);
        assert_eq!(*records[0].after, after);
    }

    #[test]
    fn test_open_appends() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wal.log");
        let page = PageIdentity::new(TableId::new(1), 0);
        let (before, after) = pages(0, 1);

        FileLog::create(&path)
            .unwrap()
            .log_write(TransactionId::new(1), page, &before, &after)
            .unwrap();
        FileLog::open(&path)
            .unwrap()
            .log_write(TransactionId::new(2), page, &before, &after)
            .unwrap();

        let txns: Vec<_> = FileLog::read_records(&path)
            .unwrap()
            .into_iter()
            .map(|r| r.txn)
            .collect();
        assert_eq!(txns, vec![TransactionId::new(1), TransactionId::new(2)]);
    }

    #[test]
    fn test_corruption_detected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wal.log");
        let (before, after) = pages(5, 6);
        FileLog::create(&path)
            .unwrap()
            .log_write(TransactionId::new(1), PageIdentity::new(TableId::new(1), 0), &before, &after)
            .unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        bytes[40] ^= 0xFF;
        std::fs::write(&path, &bytes).unwrap();
        assert!(matches!(FileLog::read_records(&path), Err(Error::CorruptLog(_))));

        bytes.truncate(100);
        std::fs::write(&path, &bytes).unwrap();
        assert!(matches!(FileLog::read_records(&path), Err(Error::CorruptLog(_))));
    }
}
