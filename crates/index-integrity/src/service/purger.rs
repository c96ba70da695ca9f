//! Rollback of the store to a block boundary.

use crate::domain::errors::IntegrityResult;
use crate::domain::partition::{DocType, IndexLayout};
use crate::ports::outbound::{DocumentStore, Field};
use crate::service::catalog::IndexCatalog;
use tracing::info;

/// What a purge removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeOutcome {
    pub partitions_deleted: Vec<String>,
    pub documents_deleted: u64,
}

pub struct Purger<'a, S: DocumentStore + ?Sized> {
    store: &'a mut S,
    layout: &'a IndexLayout,
}

impl<'a, S: DocumentStore + ?Sized> Purger<'a, S> {
    pub fn new(store: &'a mut S, layout: &'a IndexLayout) -> Self {
        Self { store, layout }
    }

    /// Delete `native_block` / `global_block` and everything after them.
    ///
    /// Whole partitions past the boundary partition go first, then range
    /// deletes over each doc-type pattern clear the boundary partition.
    /// Indices already gone are ignored.
    pub fn purge_newer_than(&mut self, native_block: u64, global_block: u64) -> IntegrityResult<PurgeOutcome> {
        let boundary = self.layout.suffix_for(native_block);

        let mut doomed = Vec::new();
        {
            let catalog = IndexCatalog::new(&*self.store, self.layout);
            for doc_type in DocType::ALL {
                doomed.extend(
                    catalog
                        .list_partitions(doc_type)?
                        .into_iter()
                        .filter(|p| p.suffix > boundary)
                        .map(|p| p.name),
                );
            }
        }
        if !doomed.is_empty() {
            self.store.delete_indices(&doomed)?;
        }

        let deltas = self.store.delete_by_range(
            &self.layout.pattern(DocType::Delta),
            Field::DeltaNativeBlock,
            native_block,
        )?;
        let actions = self.store.delete_by_range(
            &self.layout.pattern(DocType::Action),
            Field::ActionEvmBlock,
            global_block,
        )?;

        info!(
            native_block,
            global_block,
            partitions = doomed.len(),
            deltas,
            actions,
            "purged newer data"
        );
        Ok(PurgeOutcome {
            partitions_deleted: doomed,
            documents_deleted: deltas + actions,
        })
    }
}
