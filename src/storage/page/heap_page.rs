//! Slot layout of heap pages.
//!
//! A heap page stores fixed-size records:
//! ```text
//! ┌──────────────────────┬────────┬────────┬─────┬────────┬─────────┐
//! │ occupancy bitmap     │ slot 0 │ slot 1 │ ... │ slot N │ padding │
//! │ ceil(N / 8) bytes    │        │        │     │        │         │
//! └──────────────────────┴────────┴────────┴─────┴────────┴─────────┘
//! ```
//! Bit `i % 8` of bitmap byte `i / 8` is set iff slot `i` holds a record.
//! Each record costs `record_size * 8 + 1` bits, so a page has
//! `floor(PAGE_SIZE * 8 / (record_size * 8 + 1))` slots.

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, Result};

use super::Page;

/// Geometry of a heap page for one record size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapPageLayout {
    record_size: usize,
    slot_count: usize,
    header_len: usize,
}

impl HeapPageLayout {
    /// Compute the layout for records of `record_size` bytes.
    ///
    /// # Errors
    /// `Error::InvalidRecord` if `record_size` is zero or a single record
    /// doesn't fit on a page.
    pub fn new(record_size: usize) -> Result<Self> {
        if record_size == 0 {
            return Err(Error::InvalidRecord("record size must be > 0".into()));
        }
        let slot_count = (PAGE_SIZE * 8) / (record_size * 8 + 1);
        if slot_count == 0 {
            return Err(Error::InvalidRecord(format!(
                "record size {} exceeds page capacity",
                record_size
            )));
        }
        Ok(Self {
            record_size,
            slot_count,
            header_len: slot_count.div_ceil(8),
        })
    }

    #[inline]
    pub fn record_size(&self) -> usize {
        self.record_size
    }

    /// Number of record slots per page.
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    /// Whether `slot` currently holds a record.
    pub fn is_used(&self, page: &Page, slot: usize) -> bool {
        debug_assert!(slot < self.slot_count);
        page.as_slice()[slot / 8] & (1 << (slot % 8)) != 0
    }

    fn set_used(&self, page: &mut Page, slot: usize, used: bool) {
        let byte = &mut page.as_mut_slice()[slot / 8];
        if used {
            *byte |= 1 << (slot % 8);
        } else {
            *byte &= !(1 << (slot % 8));
        }
    }

    fn slot_range(&self, slot: usize) -> std::ops::Range<usize> {
        let start = self.header_len + slot * self.record_size;
        start..start + self.record_size
    }

    /// First empty slot, if any.
    pub fn free_slot(&self, page: &Page) -> Option<usize> {
        (0..self.slot_count).find(|&s| !self.is_used(page, s))
    }

    /// Number of empty slots.
    pub fn free_slot_count(&self, page: &Page) -> usize {
        (0..self.slot_count)
            .filter(|&s| !self.is_used(page, s))
            .count()
    }

    /// Occupied slots in ascending order.
    pub fn used_slots<'a>(&'a self, page: &'a Page) -> impl Iterator<Item = usize> + 'a {
        (0..self.slot_count).filter(move |&s| self.is_used(page, s))
    }

    /// Bytes of the record in `slot`.
    pub fn read<'p>(&self, page: &'p Page, slot: usize) -> &'p [u8] {
        &page.as_slice()[self.slot_range(slot)]
    }

    /// Store `data` in `slot` and mark it used.
    pub fn write(&self, page: &mut Page, slot: usize, data: &[u8]) -> Result<()> {
        if data.len() != self.record_size {
            return Err(Error::InvalidRecord(format!(
                "expected {} bytes, got {}",
                self.record_size,
                data.len()
            )));
        }
        let range = self.slot_range(slot);
        page.as_mut_slice()[range].copy_from_slice(data);
        self.set_used(page, slot, true);
        Ok(())
    }

    /// Free `slot`, zeroing its bytes.
    pub fn clear(&self, page: &mut Page, slot: usize) {
        let range = self.slot_range(slot);
        page.as_mut_slice()[range].fill(0);
        self.set_used(page, slot, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_geometry() {
        let layout = HeapPageLayout::new(8).unwrap();
        // 32768 / 65 = 504 slots, 63 header bytes
        assert_eq!(layout.slot_count(), 504);
        assert!(63 + 504 * 8 <= PAGE_SIZE);
    }

    #[test]
    fn test_layout_rejects_bad_sizes() {
        assert!(HeapPageLayout::new(0).is_err());
        assert!(HeapPageLayout::new(PAGE_SIZE).is_err());
        assert!(HeapPageLayout::new(PAGE_SIZE - 1).is_ok());
    }

    #[test]
    fn test_write_read_clear() {
        let layout = HeapPageLayout::new(4).unwrap();
        let mut page = Page::new();

        assert_eq!(layout.free_slot(&page), Some(0));
        layout.write(&mut page, 0, &[1, 2, 3, 4]).unwrap();
        layout.write(&mut page, 3, &[9, 9, 9, 9]).unwrap();

        assert!(layout.is_used(&page, 0));
        assert!(!layout.is_used(&page, 1));
        assert_eq!(layout.read(&page, 3), &[9, 9, 9, 9]);
        assert_eq!(layout.used_slots(&page).collect::<Vec<_>>(), vec![0, 3]);
        assert_eq!(layout.free_slot(&page), Some(1));

        layout.clear(&mut page, 0);
        assert!(!layout.is_used(&page, 0));
        assert_eq!(layout.read(&page, 0), &[0, 0, 0, 0]);
    }

    #[test]
    fn test_write_wrong_length() {
        let layout = HeapPageLayout::new(4).unwrap();
        let mut page = Page::new();
        assert!(layout.write(&mut page, 0, &[1, 2]).is_err());
        assert!(!layout.is_used(&page, 0));
    }

    #[test]
    fn test_full_page() {
        let layout = HeapPageLayout::new(1000).unwrap();
        let mut page = Page::new();
        for slot in 0..layout.slot_count() {
            layout.write(&mut page, slot, &[7u8; 1000]).unwrap();
        }
        assert_eq!(layout.free_slot(&page), None);
        assert_eq!(layout.free_slot_count(&page), 0);
    }
}
