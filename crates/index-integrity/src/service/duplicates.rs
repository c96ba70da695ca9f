//! Windowed duplicate detection with terms aggregations.

use crate::domain::config::IntegrityConfig;
use crate::domain::errors::{IntegrityResult, StoreError};
use crate::domain::partition::{DocType, ScanWindows};
use crate::domain::report::DuplicateSets;
use crate::ports::outbound::{DocumentStore, Field, TermKey, TermsQuery};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Keys seen at least this often are duplicates.
const MIN_DUPLICATE_COUNT: u64 = 2;

pub struct DuplicateScanner<'a, S: DocumentStore + ?Sized> {
    store: &'a S,
    config: &'a IntegrityConfig,
}

impl<'a, S: DocumentStore + ?Sized> DuplicateScanner<'a, S> {
    pub fn new(store: &'a S, config: &'a IntegrityConfig) -> Self {
        Self { store, config }
    }

    fn terms(
        &self,
        doc_type: DocType,
        range_field: Field,
        key_field: Field,
        lower: u64,
        upper: u64,
    ) -> Result<Vec<TermKey>, StoreError> {
        let query = TermsQuery {
            pattern: self.config.layout.pattern(doc_type),
            range_field,
            lower,
            upper,
            key_field,
            min_doc_count: MIN_DUPLICATE_COUNT,
            size: self.config.duplicate_page_size,
        };
        let keys = self.store.duplicate_terms(&query)?;
        if keys.len() >= query.size {
            warn!(%doc_type, lower, upper, size = query.size, "duplicate page full, window may hold more");
        }
        Ok(keys)
    }

    /// Global block numbers held by more than one delta in `[lower, upper]`.
    pub fn find_duplicate_deltas(&self, lower: u64, upper: u64) -> IntegrityResult<BTreeSet<u64>> {
        let keys = self.terms(DocType::Delta, Field::DeltaGlobalBlock, Field::DeltaGlobalBlock, lower, upper)?;
        Ok(keys
            .into_iter()
            .filter_map(|key| match key {
                TermKey::Number(n) => Some(n),
                TermKey::Text(text) => text.parse().ok(),
            })
            .collect())
    }

    /// Action hashes appearing more than once among actions of blocks `[lower, upper]`.
    pub fn find_duplicate_actions(&self, lower: u64, upper: u64) -> IntegrityResult<BTreeSet<String>> {
        let keys = self.terms(DocType::Action, Field::ActionEvmBlock, Field::ActionHash, lower, upper)?;
        Ok(keys
            .into_iter()
            .map(|key| match key {
                TermKey::Text(text) => text,
                TermKey::Number(n) => n.to_string(),
            })
            .collect())
    }

    /// Union of both duplicate sets over `[lower, upper]`, one window at a
    /// time. Returns the sets and the number of windows scanned.
    pub fn full_range_duplicate_scan(&self, lower: u64, upper: u64) -> IntegrityResult<(DuplicateSets, u64)> {
        let mut sets = DuplicateSets::default();
        let mut windows = 0u64;
        for (start, end) in ScanWindows::new(lower, upper, self.config.scan_window) {
            let deltas = self.find_duplicate_deltas(start, end)?;
            let actions = self.find_duplicate_actions(start, end)?;
            debug!(start, end, deltas = deltas.len(), actions = actions.len(), "duplicate window scanned");
            sets.merge(deltas, actions);
            windows += 1;
        }
        Ok((sets, windows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryDocumentStore;
    use crate::domain::partition::IndexLayout;
    use shared_types::{ActionRecord, BlockDelta};

    fn config() -> IntegrityConfig {
        IntegrityConfig::new(IndexLayout::new("telos-local").with_docs_per_index(100)).with_scan_window(50)
    }

    fn insert_delta(store: &mut InMemoryDocumentStore, config: &IntegrityConfig, global: u64) {
        let native = global + 10;
        store.insert_delta(
            config.layout.index_for(DocType::Delta, native),
            BlockDelta::new(native, global),
        );
    }

    #[test]
    fn test_duplicates_found_across_windows() {
        let config = config();
        let mut store = InMemoryDocumentStore::new();
        for global in 100..=200 {
            insert_delta(&mut store, &config, global);
        }
        for global in [120, 175, 176] {
            insert_delta(&mut store, &config, global);
        }

        let scanner = DuplicateScanner::new(&store, &config);
        let (sets, windows) = scanner.full_range_duplicate_scan(100, 200).unwrap();
        assert_eq!(windows, 3);
        assert_eq!(sets.deltas, [120, 175, 176].into_iter().collect());
        assert!(sets.actions.is_empty());
    }

    #[test]
    fn test_duplicate_action_hash() {
        let config = config();
        let mut store = InMemoryDocumentStore::new();
        for (hash, block) in [("0xaa", 110), ("0xbb", 111), ("0xaa", 115)] {
            store.insert_action(config.layout.index_for(DocType::Action, block), ActionRecord::new(hash, block));
        }

        let scanner = DuplicateScanner::new(&store, &config);
        let hashes = scanner.find_duplicate_actions(100, 149).unwrap();
        assert_eq!(hashes, ["0xaa".to_string()].into_iter().collect());
        // the second copy lies outside this window
        assert!(scanner.find_duplicate_actions(100, 112).unwrap().is_empty());
    }

    #[test]
    fn test_page_size_bounds_each_query() {
        let config = config().with_duplicate_page_size(2);
        let mut store = InMemoryDocumentStore::new();
        for global in [101, 101, 102, 102, 103, 103] {
            insert_delta(&mut store, &config, global);
        }
        let scanner = DuplicateScanner::new(&store, &config);
        assert_eq!(scanner.find_duplicate_deltas(100, 149).unwrap().len(), 2);
    }
}
