//! Partition enumeration and indexed-range bounds.

use crate::domain::errors::{IntegrityError, IntegrityResult, StoreError};
use crate::domain::partition::{DocType, IndexLayout, Partition};
use crate::ports::outbound::{DocumentStore, SortOrder};
use shared_types::BlockDelta;
use tracing::{debug, warn};

/// Read-only view over the partitions of one deployment.
pub struct IndexCatalog<'a, S: DocumentStore + ?Sized> {
    store: &'a S,
    layout: &'a IndexLayout,
}

impl<'a, S: DocumentStore + ?Sized> IndexCatalog<'a, S> {
    pub fn new(store: &'a S, layout: &'a IndexLayout) -> Self {
        Self { store, layout }
    }

    /// Partitions of `doc_type`, ascending by numeric suffix.
    ///
    /// Names that match the wildcard but not the naming contract (aliases,
    /// other schema versions sharing a prefix) are skipped.
    pub fn list_partitions(&self, doc_type: DocType) -> IntegrityResult<Vec<Partition>> {
        let names = self
            .store
            .list_indices(&self.layout.pattern(doc_type))
            .map_err(IntegrityError::Catalog)?;

        let mut partitions: Vec<Partition> = names
            .iter()
            .filter_map(|name| self.layout.parse_partition(doc_type, name))
            .collect();
        partitions.sort();
        debug!(%doc_type, count = partitions.len(), "listed partitions");
        Ok(partitions)
    }

    pub fn first_indexed_block(&self) -> IntegrityResult<Option<BlockDelta>> {
        let partitions = self.list_partitions(DocType::Delta)?;
        self.edge(partitions.iter(), SortOrder::Asc)
    }

    pub fn last_indexed_block(&self) -> IntegrityResult<Option<BlockDelta>> {
        let partitions = self.list_partitions(DocType::Delta)?;
        self.edge(partitions.iter().rev(), SortOrder::Desc)
    }

    /// Extreme delta of the first non-empty partition in iteration order.
    fn edge<'p>(
        &self,
        partitions: impl Iterator<Item = &'p Partition>,
        order: SortOrder,
    ) -> IntegrityResult<Option<BlockDelta>> {
        for partition in partitions {
            match self.store.extreme_delta(&partition.name, order) {
                Ok(Some(delta)) => return Ok(Some(delta)),
                Ok(None) => debug!(index = %partition.name, "empty partition skipped"),
                // dropped between listing and query
                Err(StoreError::IndexNotFound { index }) => {
                    warn!(%index, "partition vanished while reading bounds")
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryDocumentStore;

    fn layout() -> IndexLayout {
        IndexLayout::new("telos-local").with_docs_per_index(100)
    }

    #[test]
    fn test_partitions_sorted_numerically() {
        let layout = layout();
        let mut store = InMemoryDocumentStore::new();
        for suffix in [10, 2, 1] {
            store.create_index(layout.partition_name(DocType::Delta, suffix));
        }
        store.create_index("telos-local-delta-v1.5-alias");

        let catalog = IndexCatalog::new(&store, &layout);
        let suffixes: Vec<u64> = catalog
            .list_partitions(DocType::Delta)
            .unwrap()
            .into_iter()
            .map(|p| p.suffix)
            .collect();
        assert_eq!(suffixes, vec![1, 2, 10]);
    }

    #[test]
    fn test_bounds_skip_empty_edge_partitions() {
        let layout = layout();
        let mut store = InMemoryDocumentStore::new();
        store.create_index(layout.partition_name(DocType::Delta, 0));
        store.create_index(layout.partition_name(DocType::Delta, 3));
        for native in [110, 150, 250] {
            store.insert_delta(layout.index_for(DocType::Delta, native), BlockDelta::new(native, native - 10));
        }

        let catalog = IndexCatalog::new(&store, &layout);
        assert_eq!(catalog.first_indexed_block().unwrap(), Some(BlockDelta::new(110, 100)));
        assert_eq!(catalog.last_indexed_block().unwrap(), Some(BlockDelta::new(250, 240)));
    }

    #[test]
    fn test_empty_store_has_no_bounds() {
        let layout = layout();
        let store = InMemoryDocumentStore::new();
        let catalog = IndexCatalog::new(&store, &layout);
        assert_eq!(catalog.first_indexed_block().unwrap(), None);
        assert_eq!(catalog.last_indexed_block().unwrap(), None);
    }

    #[test]
    fn test_listing_failure_is_catalog_error() {
        let layout = layout();
        let mut store = InMemoryDocumentStore::new();
        store.set_unavailable(true);
        let catalog = IndexCatalog::new(&store, &layout);
        assert!(matches!(
            catalog.list_partitions(DocType::Action),
            Err(IntegrityError::Catalog(StoreError::Unavailable { .. }))
        ));
    }
}
