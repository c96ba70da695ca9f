//! # Gap Locator
//!
//! Finds the first missing global block number without reading a single
//! document, by recursively bisecting the indexed range with histogram
//! aggregations.
//!
//! ## Algorithm
//!
//! ```text
//! check_gaps(lower, upper, interval)
//!   interval == 1          → resolve the window with one width-1 query
//!   middle = (lower + upper) / 2, width = interval / 2
//!   lower half [lower, middle]     empty          → lower
//!                                  leading edge   → lower
//!                                  sparse bucket  → recurse into bucket
//!                                  trailing edge  → last.max + 1
//!   upper half [middle+1, upper]   empty          → middle + 1
//!                                  boundary       → last_lower.max + 1
//!                                  sparse bucket  → recurse into bucket
//! ```
//!
//! A bucket is sparse when `count != max - min + 1`. Halves are evaluated in
//! address order so the reported block is always the first missing one.
//! This turns an O(n) document scan into O(log(range) · log(docs_per_index))
//! aggregation queries.
//!
//! Duplicates can mask a hole inside one bucket (a missing block and a
//! doubled block keep the count intact), which is why the full check scans
//! for duplicates first.

use crate::domain::errors::StoreError;
use std::cell::Cell;
use tracing::debug;

// =============================================================================
// HISTOGRAM ORACLE
// =============================================================================

/// Statistics for one histogram bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistogramBucket {
    /// Bucket key, `floor(value / width) * width`.
    pub key: u64,
    /// Documents whose value falls in the bucket.
    pub count: u64,
    /// Lowest value in the bucket.
    pub min: u64,
    /// Highest value in the bucket.
    pub max: u64,
}

impl HistogramBucket {
    /// True when every value between `min` and `max` is present exactly once.
    pub fn is_contiguous(&self) -> bool {
        self.max
            .checked_sub(self.min)
            .is_some_and(|span| span.saturating_add(1) == self.count)
    }
}

/// Bucketed range statistics over the delta global block number.
///
/// The only query the gap locator issues. Implementations return buckets in
/// ascending key order and omit buckets holding no documents.
pub trait HistogramOracle {
    /// Buckets of `width` blocks over the inclusive range `[lower, upper]`.
    fn histogram(&self, lower: u64, upper: u64, width: u64) -> Result<Vec<HistogramBucket>, StoreError>;
}

// =============================================================================
// GAP LOCATOR
// =============================================================================

/// Recursive bisection over a histogram oracle.
pub struct GapLocator<'a, O: HistogramOracle + ?Sized> {
    oracle: &'a O,
    queries: Cell<u64>,
}

impl<'a, O: HistogramOracle + ?Sized> GapLocator<'a, O> {
    pub fn new(oracle: &'a O) -> Self {
        Self {
            oracle,
            queries: Cell::new(0),
        }
    }

    /// Histogram queries issued so far.
    pub fn queries_issued(&self) -> u64 {
        self.queries.get()
    }

    fn query(&self, lower: u64, upper: u64, width: u64) -> Result<Vec<HistogramBucket>, StoreError> {
        self.queries.set(self.queries.get() + 1);
        let buckets = self.oracle.histogram(lower, upper, width)?;
        debug!(lower, upper, width, buckets = buckets.len(), "histogram gap check");
        Ok(buckets)
    }

    /// Detect a whole missing partition.
    ///
    /// `suffixes` must be sorted ascending. When two adjacent suffixes differ
    /// by more than one, the partition after the first of them is missing;
    /// the gap starts right after the highest block of that first partition.
    /// `native_offset` (`native - global`, observed on any indexed delta)
    /// maps the partition's native window onto global numbering.
    pub fn find_partition_level_gap(
        &self,
        suffixes: &[u64],
        docs_per_index: u64,
        native_offset: i64,
    ) -> Result<Option<u64>, StoreError> {
        let Some(gap_start) = suffixes
            .windows(2)
            .find(|pair| pair[1].saturating_sub(pair[0]) > 1)
            .map(|pair| pair[0])
        else {
            return Ok(None);
        };

        let lower = to_global(gap_start.saturating_mul(docs_per_index), native_offset);
        let upper = to_global(
            gap_start.saturating_add(1).saturating_mul(docs_per_index),
            native_offset,
        );
        debug!(gap_start, lower, upper, "whole partition missing");

        let buckets = self.query(lower, upper, docs_per_index)?;
        Ok(Some(buckets.last().map_or(lower, |bucket| bucket.max + 1)))
    }

    /// First missing block in `[lower, upper]`, or `None` when the range is
    /// contiguous.
    pub fn check_gaps(&self, lower: u64, upper: u64, interval: u64) -> Result<Option<u64>, StoreError> {
        let interval = interval.max(1);
        if interval == 1 || upper <= lower {
            return self.pinpoint(lower, upper);
        }

        let middle = lower + (upper - lower) / 2;
        let width = interval / 2;

        let lower_buckets = self.query(lower, middle, width)?;
        let (Some(first_lower), Some(last_lower)) = (lower_buckets.first(), lower_buckets.last()) else {
            return Ok(Some(lower));
        };
        if first_lower.min > lower {
            return Ok(Some(lower));
        }
        if let Some(gap) = self.scan_buckets(&lower_buckets, width)? {
            return Ok(Some(gap));
        }
        if last_lower.max < middle {
            return Ok(Some(last_lower.max + 1));
        }

        let upper_buckets = self.query(middle + 1, upper, width)?;
        let (Some(first_upper), Some(last_upper)) = (upper_buckets.first(), upper_buckets.last()) else {
            return Ok(Some(middle + 1));
        };
        if last_lower.max + 1 < first_upper.min {
            return Ok(Some(last_lower.max + 1));
        }
        if let Some(gap) = self.scan_buckets(&upper_buckets, width)? {
            return Ok(Some(gap));
        }
        if last_upper.max < upper {
            return Ok(Some(last_upper.max + 1));
        }

        Ok(None)
    }

    /// Walk buckets in order: holes between neighbours first, then recurse
    /// into sparse buckets at half the interval.
    fn scan_buckets(&self, buckets: &[HistogramBucket], width: u64) -> Result<Option<u64>, StoreError> {
        let mut previous: Option<&HistogramBucket> = None;
        for bucket in buckets {
            if let Some(prev) = previous {
                if prev.max + 1 < bucket.min {
                    return Ok(Some(prev.max + 1));
                }
            }
            if !bucket.is_contiguous() {
                if let Some(gap) = self.check_gaps(bucket.min, bucket.max, width)? {
                    return Ok(Some(gap));
                }
            }
            previous = Some(bucket);
        }
        Ok(None)
    }

    /// Single-block resolution of a small window.
    fn pinpoint(&self, lower: u64, upper: u64) -> Result<Option<u64>, StoreError> {
        let buckets = self.query(lower, upper, 1)?;
        let mut expected = lower;
        for bucket in &buckets {
            if bucket.min > expected {
                return Ok(Some(expected));
            }
            expected = bucket.max.saturating_add(1);
        }
        Ok((expected <= upper).then_some(expected))
    }
}

fn to_global(native: u64, native_offset: i64) -> u64 {
    (native as i128 - native_offset as i128).clamp(0, u64::MAX as i128) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    /// Oracle over an in-memory set of global block numbers.
    struct SetOracle {
        blocks: BTreeSet<u64>,
    }

    impl SetOracle {
        fn with_ranges(ranges: &[(u64, u64)]) -> Self {
            let blocks = ranges.iter().flat_map(|&(lo, hi)| lo..=hi).collect();
            Self { blocks }
        }
    }

    impl HistogramOracle for SetOracle {
        fn histogram(&self, lower: u64, upper: u64, width: u64) -> Result<Vec<HistogramBucket>, StoreError> {
            let mut buckets: Vec<HistogramBucket> = Vec::new();
            for &value in self.blocks.range(lower..=upper) {
                let key = value / width * width;
                match buckets.last_mut() {
                    Some(bucket) if bucket.key == key => {
                        bucket.count += 1;
                        bucket.max = value;
                    }
                    _ => buckets.push(HistogramBucket {
                        key,
                        count: 1,
                        min: value,
                        max: value,
                    }),
                }
            }
            Ok(buckets)
        }
    }

    struct FailingOracle;

    impl HistogramOracle for FailingOracle {
        fn histogram(&self, _: u64, _: u64, _: u64) -> Result<Vec<HistogramBucket>, StoreError> {
            Err(StoreError::Unavailable {
                reason: "down".into(),
            })
        }
    }

    #[test]
    fn test_contiguous_range_has_no_gap() {
        let oracle = SetOracle::with_ranges(&[(100, 200)]);
        let locator = GapLocator::new(&oracle);
        assert_eq!(locator.check_gaps(100, 200, 100).unwrap(), None);
        assert!(locator.queries_issued() > 0);
    }

    #[test]
    fn test_single_missing_block() {
        let oracle = SetOracle::with_ranges(&[(100, 120), (122, 200)]);
        let locator = GapLocator::new(&oracle);
        assert_eq!(locator.check_gaps(100, 200, 100).unwrap(), Some(121));
    }

    #[test]
    fn test_gap_spanning_midpoint() {
        let oracle = SetOracle::with_ranges(&[(100, 140), (161, 200)]);
        let locator = GapLocator::new(&oracle);
        assert_eq!(locator.check_gaps(100, 200, 100).unwrap(), Some(141));
    }

    #[test]
    fn test_reports_first_of_several_gaps() {
        let oracle = SetOracle::with_ranges(&[(100, 109), (111, 180), (190, 200)]);
        let locator = GapLocator::new(&oracle);
        assert_eq!(locator.check_gaps(100, 200, 100).unwrap(), Some(110));
    }

    #[test]
    fn test_gap_right_after_lower_bound() {
        let oracle = SetOracle::with_ranges(&[(100, 100), (102, 103)]);
        let locator = GapLocator::new(&oracle);
        assert_eq!(locator.check_gaps(100, 103, 3).unwrap(), Some(101));
    }

    #[test]
    fn test_smallest_bisectable_range() {
        let oracle = SetOracle::with_ranges(&[(10, 10), (12, 12)]);
        let locator = GapLocator::new(&oracle);
        assert_eq!(locator.check_gaps(10, 12, 2).unwrap(), Some(11));

        let oracle = SetOracle::with_ranges(&[(10, 12)]);
        let locator = GapLocator::new(&oracle);
        assert_eq!(locator.check_gaps(10, 12, 2).unwrap(), None);
    }

    #[test]
    fn test_large_range_uses_logarithmic_queries() {
        let oracle = SetOracle::with_ranges(&[(0, 654_320), (654_322, 1_000_000)]);
        let locator = GapLocator::new(&oracle);
        assert_eq!(locator.check_gaps(0, 1_000_000, 1_000_000).unwrap(), Some(654_321));
        assert!(locator.queries_issued() < 100, "issued {}", locator.queries_issued());
    }

    #[test]
    fn test_whole_partition_gap() {
        // partitions of 100 blocks: 0 and 2 present, 1 missing
        let oracle = SetOracle::with_ranges(&[(0, 99), (200, 299)]);
        let locator = GapLocator::new(&oracle);
        assert_eq!(locator.find_partition_level_gap(&[0, 2], 100, 0).unwrap(), Some(100));
        assert_eq!(locator.queries_issued(), 1);
    }

    #[test]
    fn test_whole_partition_gap_with_native_offset() {
        // native = global + 10, partition 0 holds natives 0..=99 → globals 0..=89
        let oracle = SetOracle::with_ranges(&[(0, 89), (190, 289)]);
        let locator = GapLocator::new(&oracle);
        assert_eq!(locator.find_partition_level_gap(&[0, 2], 100, 10).unwrap(), Some(90));
    }

    #[test]
    fn test_whole_partition_gap_reports_partial_tail() {
        let oracle = SetOracle::with_ranges(&[(1, 1), (20_000_000, 20_000_000)]);
        let locator = GapLocator::new(&oracle);
        assert_eq!(
            locator.find_partition_level_gap(&[0, 2], 10_000_000, 0).unwrap(),
            Some(2)
        );
    }

    #[test]
    fn test_contiguous_partitions_issue_no_query() {
        let oracle = SetOracle::with_ranges(&[(0, 299)]);
        let locator = GapLocator::new(&oracle);
        assert_eq!(locator.find_partition_level_gap(&[0, 1, 2], 100, 0).unwrap(), None);
        assert_eq!(locator.find_partition_level_gap(&[], 100, 0).unwrap(), None);
        assert_eq!(locator.queries_issued(), 0);
    }

    #[test]
    fn test_oracle_failure_propagates() {
        let locator = GapLocator::new(&FailingOracle);
        assert!(matches!(
            locator.check_gaps(0, 10, 10),
            Err(StoreError::Unavailable { .. })
        ));
    }

    #[test]
    fn test_bucket_contiguity() {
        let full = HistogramBucket { key: 0, count: 5, min: 0, max: 4 };
        let sparse = HistogramBucket { key: 0, count: 4, min: 0, max: 4 };
        assert!(full.is_contiguous());
        assert!(!sparse.is_contiguous());
    }

    proptest! {
        #[test]
        fn prop_finds_single_missing_block(
            lower in 0u64..1_000_000,
            len in 3u64..5_000,
            pick in 0u64..u64::MAX,
        ) {
            let upper = lower + len;
            let missing = lower + 1 + pick % (len - 1);
            let oracle = SetOracle::with_ranges(&[(lower, missing - 1), (missing + 1, upper)]);
            let locator = GapLocator::new(&oracle);
            prop_assert_eq!(locator.check_gaps(lower, upper, upper - lower).unwrap(), Some(missing));
        }

        #[test]
        fn prop_contiguous_range_is_clean(lower in 0u64..1_000_000, len in 2u64..5_000) {
            let oracle = SetOracle::with_ranges(&[(lower, lower + len)]);
            let locator = GapLocator::new(&oracle);
            prop_assert_eq!(locator.check_gaps(lower, lower + len, len).unwrap(), None);
        }
    }
}
