//! Page - the fundamental 4KB unit of storage.
//!
//! A [`Page`] is a raw 4KB byte array that serves as the unit of I/O
//! between a page store and the buffer pool. Its layout belongs to the
//! page store that owns it.

use crate::common::config::PAGE_SIZE;

/// A page of data (4KB, 4KB-aligned).
///
/// # Memory Layout
/// - Size: 4096 bytes (4KB)
/// - Alignment: 4096 bytes (for efficient Direct I/O with O_DIRECT)
///
/// # Clone
/// Cloning copies all 4KB. The buffer pool does this exactly twice per
/// page lifecycle step: once to take the before-image when a page is loaded
/// and once to refresh it after a flush.
///
/// # Example
/// ```
/// use pagelock::storage::page::Page;
///
/// let mut page = Page::new();
/// page.as_mut_slice()[0] = 0xFF;
/// assert_eq!(page.as_slice()[0], 0xFF);
/// ```
#[derive(Clone, PartialEq, Eq)]
#[repr(align(4096))]
pub struct Page {
    data: [u8; PAGE_SIZE],
}

impl Page {
    /// Create a new zeroed page.
    #[inline]
    pub fn new() -> Self {
        Self {
            data: [0u8; PAGE_SIZE],
        }
    }

    /// Create a page from exactly `PAGE_SIZE` bytes.
    ///
    /// Returns `None` if `bytes` has the wrong length.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != PAGE_SIZE {
            return None;
        }
        let mut page = Page::new();
        page.data.copy_from_slice(bytes);
        Some(page)
    }

    /// Get immutable slice of page data.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Get mutable slice of page data.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Overwrite this page with the contents of `other`.
    #[inline]
    pub fn copy_from(&mut self, other: &Page) {
        self.data.copy_from_slice(&other.data);
    }

    /// Zero out the entire page.
    pub fn reset(&mut self) {
        self.data.fill(0);
    }

    /// Get the size of a page.
    #[inline]
    pub const fn size() -> usize {
        PAGE_SIZE
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let used = self.data.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        f.debug_struct("Page").field("used_bytes", &used).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_and_alignment() {
        assert_eq!(std::mem::size_of::<Page>(), PAGE_SIZE);
        assert_eq!(std::mem::align_of::<Page>(), 4096);
    }

    #[test]
    fn test_page_read_write() {
        let mut page = Page::new();

        page.as_mut_slice()[0] = 0xFF;
        page.as_mut_slice()[4095] = 0xCD;

        assert_eq!(page.as_slice()[0], 0xFF);
        assert_eq!(page.as_slice()[4095], 0xCD);
    }

    #[test]
    fn test_page_reset() {
        let mut page = Page::new();
        page.as_mut_slice()[100] = 0xAB;
        page.reset();
        assert_eq!(page, Page::new());
    }

    #[test]
    fn test_from_bytes() {
        assert!(Page::from_bytes(&[0u8; 10]).is_none());

        let mut bytes = vec![0u8; PAGE_SIZE];
        bytes[7] = 7;
        let page = Page::from_bytes(&bytes).unwrap();
        assert_eq!(page.as_slice()[7], 7);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut page = Page::new();
        page.as_mut_slice()[0] = 1;

        let mut copy = page.clone();
        copy.as_mut_slice()[0] = 2;
        assert_eq!(page.as_slice()[0], 1);

        page.copy_from(&copy);
        assert_eq!(page.as_slice()[0], 2);
    }
}
