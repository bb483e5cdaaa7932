//! The page store interface the buffer pool reads and writes through.

use crate::buffer::{BufferPool, PageHandle};
use crate::common::{PageIdentity, Result, TableId, TransactionId};
use crate::storage::page::Page;
use crate::storage::Record;

/// Durable storage of fixed-size pages for one table.
///
/// The buffer pool calls `read_page` on a cache miss and `write_page` when
/// flushing. Record mutations go the other way: the pool hands itself to
/// `insert_record` / `delete_record`, which fetch every page they modify
/// through [`BufferPool::get_page`] with `Permission::Exclusive` and return
/// the handles of the modified pages.
pub trait PageStore: Send + Sync {
    /// The table this store holds.
    fn table_id(&self) -> TableId;

    /// Read a page's current durable content.
    ///
    /// # Errors
    /// `Error::PageNotFound` if the page does not exist.
    fn read_page(&self, page: PageIdentity) -> Result<Page>;

    /// Durably overwrite an existing page.
    fn write_page(&self, page: PageIdentity, data: &Page) -> Result<()>;

    /// Number of pages in the store.
    fn num_pages(&self) -> Result<u32>;

    /// Store `record`, setting its id. Returns the modified pages.
    fn insert_record(
        &self,
        pool: &BufferPool,
        txn: TransactionId,
        record: &mut Record,
    ) -> Result<Vec<PageHandle>>;

    /// Remove `record`. Returns the modified pages.
    fn delete_record(
        &self,
        pool: &BufferPool,
        txn: TransactionId,
        record: &Record,
    ) -> Result<Vec<PageHandle>>;
}
