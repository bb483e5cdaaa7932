//! Catalog - maps table ids to their page stores.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::common::{Error, Result, TableId};
use crate::storage::PageStore;

/// Registry of the page stores the buffer pool can load from.
#[derive(Default)]
pub struct Catalog {
    tables: RwLock<HashMap<TableId, Arc<dyn PageStore>>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `store` under its own table id, replacing any previous
    /// store for that id.
    pub fn add_table(&self, store: Arc<dyn PageStore>) {
        let table = store.table_id();
        debug!(%table, "table registered");
        self.tables.write().insert(table, store);
    }

    /// The page store for `table`.
    ///
    /// # Errors
    /// `Error::TableNotFound` if no store is registered.
    pub fn get_page_store(&self, table: TableId) -> Result<Arc<dyn PageStore>> {
        self.tables
            .read()
            .get(&table)
            .cloned()
            .ok_or(Error::TableNotFound(table))
    }

    /// Registered table ids in ascending order.
    pub fn table_ids(&self) -> Vec<TableId> {
        let mut ids: Vec<_> = self.tables.read().keys().copied().collect();
        ids.sort();
        ids
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("tables", &self.table_ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::HeapFile;
    use tempfile::tempdir;

    #[test]
    fn test_add_and_lookup() {
        let dir = tempdir().unwrap();
        let catalog = Catalog::new();
        catalog.add_table(Arc::new(
            HeapFile::create(dir.path().join("a.dat"), TableId::new(3), 4).unwrap(),
        ));
        catalog.add_table(Arc::new(
            HeapFile::create(dir.path().join("b.dat"), TableId::new(1), 4).unwrap(),
        ));

        assert_eq!(catalog.table_ids(), vec![TableId::new(1), TableId::new(3)]);
        let store = catalog.get_page_store(TableId::new(3)).unwrap();
        assert_eq!(store.table_id(), TableId::new(3));
    }

    #[test]
    fn test_missing_table() {
        let catalog = Catalog::new();
        assert!(matches!(
            catalog.get_page_store(TableId::new(8)),
            Err(Error::TableNotFound(_))
        ));
    }
}
