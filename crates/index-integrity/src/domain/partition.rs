//! # Partition Naming
//!
//! Every document type is sharded into bounded partitions named
//! `{chain_prefix}-{doc_spec}-{suffix:08}` with
//! `suffix = floor(block_num / docs_per_index)`.
//!
//! Partitions are created lazily by the ingestion process as block numbers
//! cross a boundary; they are never split or merged. Deltas are routed by
//! their native block number, actions by their EVM block number.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default block-count width of one partition.
pub const DEFAULT_DOCS_PER_INDEX: u64 = 10_000_000;

/// Document types held by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocType {
    /// One document per indexed native block.
    Delta,
    /// One document per indexed EVM transaction.
    Action,
}

impl DocType {
    pub const ALL: [DocType; 2] = [DocType::Delta, DocType::Action];
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocType::Delta => write!(f, "delta"),
            DocType::Action => write!(f, "action"),
        }
    }
}

/// A named partition together with its numeric suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Partition {
    pub suffix: u64,
    pub name: String,
}

/// Naming contract for one deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexLayout {
    /// Chain prefix, e.g. `telos-mainnet`.
    pub chain_prefix: String,
    /// Delta type and schema version, e.g. `delta-v1.5`.
    pub delta_spec: String,
    /// Action type and schema version, e.g. `action-v1.5`.
    pub action_spec: String,
    /// Block-count width of one partition (fixed per deployment).
    pub docs_per_index: u64,
}

impl IndexLayout {
    /// Layout with the default schema versions and partition width.
    pub fn new(chain_prefix: impl Into<String>) -> Self {
        Self {
            chain_prefix: chain_prefix.into(),
            delta_spec: "delta-v1.5".to_string(),
            action_spec: "action-v1.5".to_string(),
            docs_per_index: DEFAULT_DOCS_PER_INDEX,
        }
    }

    pub fn with_docs_per_index(mut self, docs_per_index: u64) -> Self {
        self.docs_per_index = docs_per_index;
        self
    }

    pub fn with_specs(mut self, delta_spec: impl Into<String>, action_spec: impl Into<String>) -> Self {
        self.delta_spec = delta_spec.into();
        self.action_spec = action_spec.into();
        self
    }

    fn spec(&self, doc_type: DocType) -> &str {
        match doc_type {
            DocType::Delta => &self.delta_spec,
            DocType::Action => &self.action_spec,
        }
    }

    /// Wildcard pattern matching every partition of `doc_type`.
    pub fn pattern(&self, doc_type: DocType) -> String {
        format!("{}-{}-*", self.chain_prefix, self.spec(doc_type))
    }

    /// Partition suffix a block number is routed to.
    pub fn suffix_for(&self, block_num: u64) -> u64 {
        block_num / self.docs_per_index
    }

    /// Partition name for a suffix.
    pub fn partition_name(&self, doc_type: DocType, suffix: u64) -> String {
        format!("{}-{}-{:08}", self.chain_prefix, self.spec(doc_type), suffix)
    }

    /// Partition name a block number is routed to.
    pub fn index_for(&self, doc_type: DocType, block_num: u64) -> String {
        self.partition_name(doc_type, self.suffix_for(block_num))
    }

    /// Parse the numeric suffix of a partition name of `doc_type`.
    ///
    /// Returns `None` for names outside this layout (other chains, aliases,
    /// other schema versions).
    pub fn parse_partition(&self, doc_type: DocType, name: &str) -> Option<Partition> {
        let stem = format!("{}-{}-", self.chain_prefix, self.spec(doc_type));
        let digits = name.strip_prefix(&stem)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let suffix = digits.parse().ok()?;
        Some(Partition {
            suffix,
            name: name.to_string(),
        })
    }
}

/// Inclusive, non-overlapping windows covering `[lower, upper]`.
#[derive(Debug, Clone)]
pub struct ScanWindows {
    next: Option<u64>,
    upper: u64,
    width: u64,
}

impl ScanWindows {
    pub fn new(lower: u64, upper: u64, width: u64) -> Self {
        Self {
            next: (lower <= upper).then_some(lower),
            upper,
            width: width.max(1),
        }
    }
}

impl Iterator for ScanWindows {
    type Item = (u64, u64);

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.next?;
        let end = start.saturating_add(self.width - 1).min(self.upper);
        self.next = if end >= self.upper { None } else { Some(end + 1) };
        Some((start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_names_are_zero_padded() {
        let layout = IndexLayout::new("telos-mainnet");
        assert_eq!(
            layout.index_for(DocType::Delta, 180_000_001),
            "telos-mainnet-delta-v1.5-00000018"
        );
        assert_eq!(
            layout.index_for(DocType::Action, 9_999_999),
            "telos-mainnet-action-v1.5-00000000"
        );
        assert_eq!(layout.pattern(DocType::Action), "telos-mainnet-action-v1.5-*");
    }

    #[test]
    fn test_parse_partition_rejects_foreign_names() {
        let layout = IndexLayout::new("telos-local");
        let parsed = layout
            .parse_partition(DocType::Delta, "telos-local-delta-v1.5-00000042")
            .unwrap();
        assert_eq!(parsed.suffix, 42);

        assert!(layout.parse_partition(DocType::Delta, "telos-local-action-v1.5-00000042").is_none());
        assert!(layout.parse_partition(DocType::Delta, "telos-local-delta-v1.5-").is_none());
        assert!(layout.parse_partition(DocType::Delta, "telos-local-delta-v1.5-alias").is_none());
        assert!(layout.parse_partition(DocType::Delta, "other-delta-v1.5-00000001").is_none());
    }

    #[test]
    fn test_custom_width_routes_blocks() {
        let layout = IndexLayout::new("c").with_docs_per_index(100);
        assert_eq!(layout.suffix_for(99), 0);
        assert_eq!(layout.suffix_for(100), 1);
        assert_eq!(layout.index_for(DocType::Delta, 250), "c-delta-v1.5-00000002");
    }

    #[test]
    fn test_scan_windows_cover_range_once() {
        let windows: Vec<_> = ScanWindows::new(100, 350, 100).collect();
        assert_eq!(windows, vec![(100, 199), (200, 299), (300, 350)]);

        let single: Vec<_> = ScanWindows::new(7, 7, 10).collect();
        assert_eq!(single, vec![(7, 7)]);

        assert_eq!(ScanWindows::new(10, 9, 5).count(), 0);
    }

    #[test]
    fn test_scan_windows_do_not_overflow() {
        let windows: Vec<_> = ScanWindows::new(u64::MAX - 5, u64::MAX, 4).collect();
        assert_eq!(windows, vec![(u64::MAX - 5, u64::MAX - 2), (u64::MAX - 1, u64::MAX)]);
    }
}
