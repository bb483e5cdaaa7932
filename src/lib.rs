//! pagelock - a page cache with two-phase page locking.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     query operators / callers                   │
//! └─────────────────────────────────────────────────────────────────┘
//!          get_page / insert_record / transaction_complete
//!                              ↓
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  Buffer Pool (buffer/)                                          │
//! │   ┌───────────────────────┐   ┌─────────────────────────────┐   │
//! │   │ LockManager           │   │ page cache (NO-STEAL)       │   │
//! │   │ S/X page locks, 2PL   │   │ evicts clean pages only     │   │
//! │   └───────────────────────┘   └─────────────────────────────┘   │
//! │   completion: commit = FORCE flush, abort = discard             │
//! └─────────────────────────────────────────────────────────────────┘
//!                ↓                                  ↓
//! ┌──────────────────────────────┐   ┌─────────────────────────────┐
//! │ Storage (storage/)           │   │ Recovery (recovery/)        │
//! │ Catalog → PageStore/HeapFile │   │ LogFile: FileLog, MemoryLog │
//! └──────────────────────────────┘   └─────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageIdentity, TransactionId, Error, config)
//! - [`concurrency`] - Lock manager, permissions, transactions
//! - [`buffer`] - Buffer pool and transaction completion
//! - [`storage`] - Page stores, catalog, heap files and page formats
//! - [`recovery`] - Write-ahead log interface and implementations
//!
//! # Quick Start
//! ```no_run
//! use std::sync::Arc;
//! use pagelock::{
//!     BufferPool, BufferPoolConfig, Catalog, HeapFile, MemoryLog, Record, TableId, Transaction,
//! };
//!
//! let table = TableId::new(1);
//! let catalog = Arc::new(Catalog::new());
//! catalog.add_table(Arc::new(HeapFile::create("t1.dat", table, 16).unwrap()));
//! let pool = Arc::new(BufferPool::new(
//!     BufferPoolConfig::default(),
//!     catalog,
//!     Arc::new(MemoryLog::new()),
//! ));
//!
//! let txn = Transaction::begin(Arc::clone(&pool));
//! let mut record = Record::new(vec![7u8; 16]);
//! txn.insert_record(table, &mut record).unwrap();
//! txn.commit().unwrap();
//! ```

pub mod buffer;
pub mod common;
pub mod concurrency;
pub mod recovery;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::PAGE_SIZE;
pub use common::{BufferPoolConfig, Error, PageIdentity, Result, TableId, TransactionId};

pub use buffer::{BufferPool, BufferPoolStats, CachedPage, PageHandle, PageWriteGuard, StatsSnapshot};
pub use concurrency::{LockManager, Permission, Transaction};
pub use recovery::{FileLog, LogFile, LogRecord, MemoryLog};
pub use storage::page::{HeapPageLayout, Page};
pub use storage::{Catalog, HeapFile, HeapFileScan, PageStore, Record, RecordId};
