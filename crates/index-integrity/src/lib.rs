//! # Index Integrity Engine
//!
//! Detects and repairs corruption in a partitioned, append-only document
//! store holding EVM block deltas and actions. Crash/restart races between
//! the chain node and the indexer leave two kinds of damage behind: missing
//! block ranges (gaps) and re-indexed ranges (duplicates).
//!
//! ## Flow
//!
//! ```text
//! IndexCatalog ──bounds──→ DuplicateScanner ──clean──→ GapLocator
//!                                │                        │
//!                           duplicates                   gap
//!                                └──────→ RepairPlanner ←─┘
//!                                              │
//!                                        last clean block
//!                                              ↓
//!                                           Purger
//! ```
//!
//! Gap detection never reads documents: it bisects the indexed range with
//! histogram aggregations (`count`, `min`, `max` per bucket), issuing
//! O(log(range) · log(docs_per_index)) queries.
//!
//! ## Store Invariants
//!
//! | ID | Invariant | Checked by |
//! |----|-----------|------------|
//! | 1 | Partition suffixes form a contiguous range | `GapLocator::find_partition_level_gap` |
//! | 2 | Delta global block numbers step by exactly 1 | `GapLocator::check_gaps` |
//! | 3 | Delta global block numbers are unique | `DuplicateScanner::find_duplicate_deltas` |
//! | 4 | Action hashes are unique | `DuplicateScanner::find_duplicate_actions` |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Partition naming, anomalies, reports, the gap search
//! - `ports/` - `IntegrityApi` (inbound), `DocumentStore` (outbound)
//! - `adapters/` - In-memory store, Elasticsearch store, delta histogram oracle
//! - `service/` - `IntegrityService` and its components
//!
//! ## Usage
//!
//! ```ignore
//! use index_integrity::{ElasticConfig, ElasticStore, IntegrityApi, IntegrityConfig, IntegrityService};
//!
//! let store = ElasticStore::new(ElasticConfig::new("http://127.0.0.1:9200"))?;
//! let mut service = IntegrityService::new(store, IntegrityConfig::default())?;
//!
//! // Ingestion must be paused before repairing.
//! let report = service.repair()?;
//! println!("resume after {}", report.resume);
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;
pub mod test_utils;

pub use adapters::{DeltaHistogram, InMemoryDocumentStore};
#[cfg(feature = "elastic")]
pub use adapters::{ElasticConfig, ElasticStore};
pub use domain::config::IntegrityConfig;
pub use domain::errors::{IntegrityError, IntegrityResult, StoreError};
pub use domain::gaps::{GapLocator, HistogramBucket, HistogramOracle};
pub use domain::partition::{DocType, IndexLayout, Partition, DEFAULT_DOCS_PER_INDEX};
pub use domain::report::{Anomaly, IntegrityReport, RepairReport, ResumePoint};
pub use ports::inbound::IntegrityApi;
pub use ports::outbound::{DocumentStore, Field, HistogramQuery, SortOrder, TermKey, TermsQuery};
pub use service::IntegrityService;
