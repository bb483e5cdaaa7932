//! Storage layer - page stores and page formats.
//!
//! This module handles persistent storage:
//! - [`PageStore`] - What the buffer pool needs from a table's storage
//! - [`Catalog`] - Table id → page store
//! - [`HeapFile`] - File-backed page store of fixed-size records
//! - [`page`] - Page types and layouts

mod catalog;
mod heap;
pub mod page;
mod page_store;
mod record;

pub use catalog::Catalog;
pub use heap::{HeapFile, HeapFileScan};
pub use page_store::PageStore;
pub use record::{Record, RecordId};
