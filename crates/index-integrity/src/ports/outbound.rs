//! # Outbound Ports (Driven Ports)
//!
//! The document store the engine verifies and repairs.
//!
//! Production: `ElasticStore` (adapters/elastic.rs)
//! Testing: `InMemoryDocumentStore` (adapters/memory.rs)
//!
//! Every query is keyed on index name patterns, so callers never need the
//! exact partition list to search across partitions. A pattern that matches
//! no index yields empty results, never an error.

use crate::domain::errors::StoreError;
use crate::domain::gaps::HistogramBucket;
use shared_types::{ActionRecord, BlockDelta};
use std::fmt;

/// Indexed document fields the engine queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Delta global (EVM) block number.
    DeltaGlobalBlock,
    /// Delta native block number.
    DeltaNativeBlock,
    /// EVM block number of an action.
    ActionEvmBlock,
    /// Transaction hash of an action.
    ActionHash,
}

impl Field {
    /// Dotted document path of the field.
    pub fn path(&self) -> &'static str {
        match self {
            Field::DeltaGlobalBlock => "@global.block_num",
            Field::DeltaNativeBlock => "block_num",
            Field::ActionEvmBlock => "@raw.block",
            Field::ActionHash => "@raw.hash",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Terms aggregation restricted to a range of another field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermsQuery {
    pub pattern: String,
    /// Field the inclusive `[lower, upper]` range applies to.
    pub range_field: Field,
    pub lower: u64,
    pub upper: u64,
    /// Field whose values are grouped.
    pub key_field: Field,
    /// Only keys occurring at least this many times are returned.
    pub min_doc_count: u64,
    /// Maximum keys returned, highest count first.
    pub size: usize,
}

/// Key of a terms aggregation bucket.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TermKey {
    Number(u64),
    Text(String),
}

/// Fixed-width histogram over the inclusive `[lower, upper]` range of `field`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistogramQuery {
    pub pattern: String,
    pub field: Field,
    pub lower: u64,
    pub upper: u64,
    pub interval: u64,
}

/// Abstract interface for the partitioned document store.
///
/// Reads take `&self`; destructive operations take `&mut self`.
pub trait DocumentStore: Send + Sync {
    /// Concrete index names matching `pattern`, in no particular order.
    fn list_indices(&self, pattern: &str) -> Result<Vec<String>, StoreError>;

    /// Delta with the lowest (`Asc`) or highest (`Desc`) global block number
    /// in one index; `None` when the index is empty.
    fn extreme_delta(&self, index: &str, order: SortOrder) -> Result<Option<BlockDelta>, StoreError>;

    /// Any delta carrying global block number `block` under `pattern`.
    fn delta_by_global(&self, pattern: &str, block: u64) -> Result<Option<BlockDelta>, StoreError>;

    /// The action with `hash` that has the lowest EVM block number.
    fn earliest_action_by_hash(&self, pattern: &str, hash: &str) -> Result<Option<ActionRecord>, StoreError>;

    /// Keys occurring at least `min_doc_count` times within the range.
    fn duplicate_terms(&self, query: &TermsQuery) -> Result<Vec<TermKey>, StoreError>;

    /// Non-empty buckets in ascending key order.
    fn histogram(&self, query: &HistogramQuery) -> Result<Vec<HistogramBucket>, StoreError>;

    /// Delete every document under `pattern` whose `field >= gte`.
    ///
    /// Missing indices are ignored. Returns the number of documents deleted.
    fn delete_by_range(&mut self, pattern: &str, field: Field, gte: u64) -> Result<u64, StoreError>;

    /// Drop whole indices. Names that do not exist are ignored.
    fn delete_indices(&mut self, names: &[String]) -> Result<(), StoreError>;
}
