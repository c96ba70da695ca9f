//! In-memory document store for tests and local experiments.
//!
//! Mirrors the query semantics the engine relies on: wildcard patterns that
//! match nothing return empty results, histogram buckets are keyed
//! `floor(value / interval) * interval` and empty buckets are omitted.

use crate::domain::errors::StoreError;
use crate::domain::gaps::HistogramBucket;
use crate::ports::outbound::{DocumentStore, Field, HistogramQuery, SortOrder, TermKey, TermsQuery};
use shared_types::{ActionRecord, BlockDelta};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone)]
enum StoredDoc {
    Delta(BlockDelta),
    Action(ActionRecord),
}

impl StoredDoc {
    fn number(&self, field: Field) -> Option<u64> {
        match (self, field) {
            (StoredDoc::Delta(d), Field::DeltaGlobalBlock) => Some(d.global_block_num()),
            (StoredDoc::Delta(d), Field::DeltaNativeBlock) => Some(d.native_block_num()),
            (StoredDoc::Action(a), Field::ActionEvmBlock) => Some(a.evm_block_num()),
            _ => None,
        }
    }

    fn term(&self, field: Field) -> Option<TermKey> {
        match (self, field) {
            (StoredDoc::Action(a), Field::ActionHash) => Some(TermKey::Text(a.hash().to_string())),
            _ => self.number(field).map(TermKey::Number),
        }
    }
}

/// Index name to documents, in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    indices: BTreeMap<String, Vec<StoredDoc>>,
    unavailable: bool,
    histogram_queries: AtomicU64,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty index (ingestion creates partitions lazily).
    pub fn create_index(&mut self, name: impl Into<String>) {
        self.indices.entry(name.into()).or_default();
    }

    pub fn insert_delta(&mut self, index: impl Into<String>, delta: BlockDelta) {
        self.indices
            .entry(index.into())
            .or_default()
            .push(StoredDoc::Delta(delta));
    }

    pub fn insert_action(&mut self, index: impl Into<String>, action: ActionRecord) {
        self.indices
            .entry(index.into())
            .or_default()
            .push(StoredDoc::Action(action));
    }

    /// Make every subsequent call fail as if the cluster were unreachable.
    pub fn set_unavailable(&mut self, unavailable: bool) {
        self.unavailable = unavailable;
    }

    /// Histogram aggregations served so far.
    pub fn histogram_queries(&self) -> u64 {
        self.histogram_queries.load(Ordering::Relaxed)
    }

    /// Documents stored under `pattern`.
    pub fn document_count(&self, pattern: &str) -> usize {
        self.matching(pattern).map(|(_, docs)| docs.len()).sum()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable {
            return Err(StoreError::Unavailable {
                reason: "in-memory store marked unavailable".into(),
            });
        }
        Ok(())
    }

    fn matching<'a>(&'a self, pattern: &'a str) -> impl Iterator<Item = (&'a String, &'a Vec<StoredDoc>)> + 'a {
        self.indices
            .iter()
            .filter(move |(name, _)| pattern_matches(pattern, name))
    }

    fn docs<'a>(&'a self, pattern: &'a str) -> impl Iterator<Item = &'a StoredDoc> + 'a {
        self.matching(pattern).flat_map(|(_, docs)| docs.iter())
    }
}

fn pattern_matches(pattern: &str, name: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => name.starts_with(prefix),
        None => name == pattern,
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn list_indices(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        self.check_available()?;
        Ok(self.matching(pattern).map(|(name, _)| name.clone()).collect())
    }

    fn extreme_delta(&self, index: &str, order: SortOrder) -> Result<Option<BlockDelta>, StoreError> {
        self.check_available()?;
        let docs = self.indices.get(index).ok_or_else(|| StoreError::IndexNotFound {
            index: index.to_string(),
        })?;
        let deltas = docs.iter().filter_map(|doc| match doc {
            StoredDoc::Delta(d) => Some(d),
            StoredDoc::Action(_) => None,
        });
        let found = match order {
            SortOrder::Asc => deltas.min_by_key(|d| d.global_block_num()),
            SortOrder::Desc => deltas.max_by_key(|d| d.global_block_num()),
        };
        Ok(found.cloned())
    }

    fn delta_by_global(&self, pattern: &str, block: u64) -> Result<Option<BlockDelta>, StoreError> {
        self.check_available()?;
        Ok(self.docs(pattern).find_map(|doc| match doc {
            StoredDoc::Delta(d) if d.global_block_num() == block => Some(d.clone()),
            _ => None,
        }))
    }

    fn earliest_action_by_hash(&self, pattern: &str, hash: &str) -> Result<Option<ActionRecord>, StoreError> {
        self.check_available()?;
        Ok(self
            .docs(pattern)
            .filter_map(|doc| match doc {
                StoredDoc::Action(a) if a.hash() == hash => Some(a),
                _ => None,
            })
            .min_by_key(|a| a.evm_block_num())
            .cloned())
    }

    fn duplicate_terms(&self, query: &TermsQuery) -> Result<Vec<TermKey>, StoreError> {
        self.check_available()?;
        let mut counts: HashMap<TermKey, u64> = HashMap::new();
        for doc in self.docs(&query.pattern) {
            let in_range = doc
                .number(query.range_field)
                .is_some_and(|v| v >= query.lower && v <= query.upper);
            if !in_range {
                continue;
            }
            if let Some(key) = doc.term(query.key_field) {
                *counts.entry(key).or_default() += 1;
            }
        }

        let mut terms: Vec<(TermKey, u64)> = counts
            .into_iter()
            .filter(|(_, count)| *count >= query.min_doc_count)
            .collect();
        terms.sort_by(|(ka, ca), (kb, cb)| cb.cmp(ca).then_with(|| ka.cmp(kb)));
        terms.truncate(query.size);
        Ok(terms.into_iter().map(|(key, _)| key).collect())
    }

    fn histogram(&self, query: &HistogramQuery) -> Result<Vec<HistogramBucket>, StoreError> {
        self.check_available()?;
        self.histogram_queries.fetch_add(1, Ordering::Relaxed);
        let interval = query.interval.max(1);

        let mut buckets: BTreeMap<u64, HistogramBucket> = BTreeMap::new();
        for value in self
            .docs(&query.pattern)
            .filter_map(|doc| doc.number(query.field))
            .filter(|v| *v >= query.lower && *v <= query.upper)
        {
            let key = value / interval * interval;
            let bucket = buckets.entry(key).or_insert(HistogramBucket {
                key,
                count: 0,
                min: value,
                max: value,
            });
            bucket.count += 1;
            bucket.min = bucket.min.min(value);
            bucket.max = bucket.max.max(value);
        }
        Ok(buckets.into_values().collect())
    }

    fn delete_by_range(&mut self, pattern: &str, field: Field, gte: u64) -> Result<u64, StoreError> {
        self.check_available()?;
        let mut deleted = 0u64;
        for (name, docs) in self.indices.iter_mut() {
            if !pattern_matches(pattern, name) {
                continue;
            }
            let before = docs.len();
            docs.retain(|doc| doc.number(field).map_or(true, |v| v < gte));
            deleted += (before - docs.len()) as u64;
        }
        Ok(deleted)
    }

    fn delete_indices(&mut self, names: &[String]) -> Result<(), StoreError> {
        self.check_available()?;
        for name in names {
            self.indices.remove(name);
        }
        Ok(())
    }
}
