//! # Check and Repair Reports
//!
//! Values handed back to the orchestrator: what a full check saw, what a
//! repair removed, and where ingestion and chain replay should resume.

use serde::{Deserialize, Serialize};
use shared_types::BlockDelta;
use std::collections::BTreeSet;
use std::fmt;

// =============================================================================
// ANOMALIES
// =============================================================================

/// Corruption detected by a full integrity check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anomaly {
    /// First missing global block number.
    Gap { block: u64 },
    /// Duplicate delta block numbers and duplicate action hashes.
    Duplicates {
        deltas: BTreeSet<u64>,
        actions: BTreeSet<String>,
    },
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anomaly::Gap { block } => write!(f, "gap at block {block}"),
            Anomaly::Duplicates { deltas, actions } => write!(
                f,
                "{} duplicate delta(s), {} duplicate action hash(es)",
                deltas.len(),
                actions.len()
            ),
        }
    }
}

/// Union of the duplicate keys found across all scan windows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DuplicateSets {
    pub deltas: BTreeSet<u64>,
    pub actions: BTreeSet<String>,
}

impl DuplicateSets {
    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty() && self.actions.is_empty()
    }

    pub fn merge(&mut self, deltas: BTreeSet<u64>, actions: BTreeSet<String>) {
        self.deltas.extend(deltas);
        self.actions.extend(actions);
    }
}

// =============================================================================
// RESUME POINT
// =============================================================================

/// Last block known to be clean, in both numbering spaces.
///
/// Ingestion and chain replay restart right after this block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumePoint {
    pub native_block: u64,
    pub global_block: u64,
}

impl ResumePoint {
    /// The block itself is clean.
    pub fn at(delta: &BlockDelta) -> Self {
        Self {
            native_block: delta.native_block_num(),
            global_block: delta.global_block_num(),
        }
    }

    /// Everything before `delta` is clean; `delta` itself is not.
    pub fn before(delta: &BlockDelta) -> Self {
        Self {
            native_block: delta.native_block_num().saturating_sub(1),
            global_block: delta.global_block_num().saturating_sub(1),
        }
    }
}

impl fmt::Display for ResumePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}|{}]", self.native_block, self.global_block)
    }
}

// =============================================================================
// REPORTS
// =============================================================================

/// Result of a healthy full integrity check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityReport {
    /// Lowest indexed delta.
    pub first: BlockDelta,
    /// Highest indexed delta.
    pub last: BlockDelta,
    /// Delta partitions present.
    pub delta_partitions: usize,
    /// Action partitions present.
    pub action_partitions: usize,
    /// Duplicate-scan windows queried.
    pub scan_windows: u64,
    /// Histogram queries issued while looking for gaps.
    pub histogram_queries: u64,
    /// Duration of the check in milliseconds.
    pub duration_ms: u64,
}

/// Result of a repair cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairReport {
    /// Anomaly that was repaired; `None` when the store was already healthy.
    pub repaired: Option<Anomaly>,
    /// Where ingestion resumes.
    pub resume: ResumePoint,
    /// Whole partitions removed.
    pub partitions_deleted: Vec<String>,
    /// Documents removed by range deletes.
    pub documents_deleted: u64,
    /// Duration of the repair in milliseconds.
    pub duration_ms: u64,
}

impl RepairReport {
    /// Report for a store that needed no repair.
    pub fn healthy(resume: ResumePoint) -> Self {
        Self {
            repaired: None,
            resume,
            partitions_deleted: Vec::new(),
            documents_deleted: 0,
            duration_ms: 0,
        }
    }

    /// True when the repair removed data.
    pub fn is_noop(&self) -> bool {
        self.repaired.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resume_point_before_and_at() {
        let delta = BlockDelta::new(131, 121);
        assert_eq!(
            ResumePoint::before(&delta),
            ResumePoint {
                native_block: 130,
                global_block: 120
            }
        );
        assert_eq!(ResumePoint::at(&delta).global_block, 121);
        assert_eq!(ResumePoint::before(&BlockDelta::new(0, 0)).native_block, 0);
    }

    #[test]
    fn test_duplicate_sets_merge() {
        let mut sets = DuplicateSets::default();
        assert!(sets.is_empty());
        sets.merge([150].into_iter().collect(), BTreeSet::new());
        sets.merge([150, 151].into_iter().collect(), ["0x1".to_string()].into_iter().collect());
        assert_eq!(sets.deltas.len(), 2);
        assert_eq!(sets.actions.len(), 1);
        assert!(!sets.is_empty());
    }

    #[test]
    fn test_repair_report_serializes_for_orchestrator() {
        let report = RepairReport {
            repaired: Some(Anomaly::Gap { block: 121 }),
            resume: ResumePoint {
                native_block: 130,
                global_block: 120,
            },
            partitions_deleted: vec![],
            documents_deleted: 80,
            duration_ms: 3,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["repaired"]["kind"], "gap");
        assert_eq!(json["repaired"]["block"], 121);
        assert_eq!(json["resume"]["native_block"], 130);
        assert!(!report.is_noop());
        assert!(RepairReport::healthy(report.resume).is_noop());
    }
}
