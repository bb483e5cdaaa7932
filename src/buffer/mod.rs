//! Buffer pool management.
//!
//! The buffer pool is the in-memory cache layer between page stores and
//! transactions. Every access goes through the page lock table first.
//!
//! # Components
//! - [`BufferPool`] - The lock-aware page cache
//! - [`CachedPage`] - A resident page + dirty state + before-image
//! - [`PageHandle`] / [`PageWriteGuard`] - Leased access to cached pages
//! - [`BufferPoolStats`] - Performance statistics
//!
//! Transaction completion (commit/abort) lives in `completion`.

mod buffer_pool;
mod cached_page;
mod completion;
mod page_handle;
mod stats;

pub use buffer_pool::BufferPool;
pub use cached_page::CachedPage;
pub use page_handle::{PageHandle, PageWriteGuard};
pub use stats::{BufferPoolStats, StatsSnapshot};
