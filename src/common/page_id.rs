//! Page identity types.

use std::fmt;

/// Identifies a table (one page store per table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub u32);

impl TableId {
    /// Create a new TableId.
    #[inline]
    pub fn new(id: u32) -> Self {
        TableId(id)
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Table({})", self.0)
    }
}

/// Identifies a page of a table: `(table, page_number)`.
///
/// This is the key of both the page cache and the lock table. Two identities
/// with equal fields are the same key.
///
/// Ordering is by table first, then page number.
///
/// # Example
/// ```
/// use pagelock::{PageIdentity, TableId};
///
/// let pid = PageIdentity::new(TableId::new(7), 3);
/// assert_eq!(pid.table_id(), TableId::new(7));
/// assert_eq!(pid.page_number(), 3);
/// assert_eq!(pid, PageIdentity::new(TableId::new(7), 3));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageIdentity {
    table_id: TableId,
    page_number: u32,
}

impl PageIdentity {
    /// Create a new PageIdentity.
    #[inline]
    pub fn new(table_id: TableId, page_number: u32) -> Self {
        Self {
            table_id,
            page_number,
        }
    }

    /// The table this page belongs to.
    #[inline]
    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    /// The page number within its table.
    #[inline]
    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    /// Byte offset of this page within its table's file.
    #[inline]
    pub fn file_offset(&self, page_size: usize) -> u64 {
        self.page_number as u64 * page_size as u64
    }
}

impl fmt::Display for PageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Page({}:{})", self.table_id.0, self.page_number)
    }
}
