//! Domain layer: partition naming, anomalies, reports and the gap search.

pub mod config;
pub mod errors;
pub mod gaps;
pub mod partition;
pub mod report;

pub use config::IntegrityConfig;
pub use errors::{IntegrityError, IntegrityResult, StoreError};
pub use gaps::{GapLocator, HistogramBucket, HistogramOracle};
pub use partition::{DocType, IndexLayout, Partition, ScanWindows, DEFAULT_DOCS_PER_INDEX};
pub use report::{Anomaly, DuplicateSets, IntegrityReport, RepairReport, ResumePoint};
