//! Page types and layout.
//!
//! This module contains:
//! - [`Page`] - The raw 4KB data container
//! - [`HeapPageLayout`] - Slot geometry of heap file pages

mod heap_page;
#[allow(clippy::module_inception)]
mod page;

pub use heap_page::HeapPageLayout;
pub use page::Page;
