//! Fixtures shared by unit and integration tests.

use crate::adapters::InMemoryDocumentStore;
use crate::domain::config::IntegrityConfig;
use crate::domain::partition::{DocType, IndexLayout};
use shared_types::{ActionRecord, BlockDelta};

/// Native block numbers run this far ahead of global ones in fixtures.
pub const NATIVE_OFFSET: u64 = 10;

/// Small partitions so whole-partition scenarios stay cheap.
pub const TEST_DOCS_PER_INDEX: u64 = 100;

pub fn test_layout() -> IndexLayout {
    IndexLayout::new("telos-local").with_docs_per_index(TEST_DOCS_PER_INDEX)
}

pub fn test_config() -> IntegrityConfig {
    IntegrityConfig::new(test_layout()).with_scan_window(TEST_DOCS_PER_INDEX)
}

/// Index one delta per global block of every inclusive range, routed to its
/// native partition.
pub fn populate(store: &mut InMemoryDocumentStore, layout: &IndexLayout, ranges: &[(u64, u64)]) {
    for &(start, end) in ranges {
        for global in start..=end {
            let native = global + NATIVE_OFFSET;
            let mut delta = BlockDelta::new(native, global);
            delta.timestamp = Some(format!("2023-01-01T00:00:{:02}Z", global % 60));
            store.insert_delta(layout.index_for(DocType::Delta, native), delta);
        }
    }
}

/// Index actions given as `(hash, evm block)` pairs.
pub fn populate_actions(store: &mut InMemoryDocumentStore, layout: &IndexLayout, txs: &[(&str, u64)]) {
    for &(hash, block) in txs {
        store.insert_action(layout.index_for(DocType::Action, block), ActionRecord::new(hash, block));
    }
}

/// Store holding `ranges` under the test layout.
pub fn store_with_ranges(ranges: &[(u64, u64)]) -> InMemoryDocumentStore {
    let mut store = InMemoryDocumentStore::new();
    populate(&mut store, &test_layout(), ranges);
    store
}
