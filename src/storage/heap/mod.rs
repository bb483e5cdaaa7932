//! Heap files: unordered tables of fixed-size records.

mod heap_file;
mod scan;

pub use heap_file::HeapFile;
pub use scan::HeapFileScan;
