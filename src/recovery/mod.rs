//! Write-ahead logging consumed by buffer pool flushes.
//!
//! - [`LogFile`] - The log interface (`log_write` + `force`)
//! - [`FileLog`] - Append-only checksummed log file
//! - [`MemoryLog`] - Non-durable in-memory log

mod file_log;
mod log_file;
mod memory_log;

pub use file_log::FileLog;
pub use log_file::{LogFile, LogRecord};
pub use memory_log::MemoryLog;

#[cfg(test)]
pub(crate) use memory_log::FailingLog;
