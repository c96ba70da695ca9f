//! # Integrity Service
//!
//! Implements `IntegrityApi` by composing the detection and repair components:
//!
//! ```text
//! full_integrity_check = IndexCatalog (bounds)
//!                      → DuplicateScanner (whole range, windowed)
//!                      → GapLocator (partition pass, then bisection)
//!
//! repair = full_integrity_check
//!        → RepairPlanner (last clean block)
//!        → Purger (truncate past it)
//! ```
//!
//! Detection never mutates the store. `repair` must run with ingestion
//! paused; it assumes exclusive access for the whole cycle.

mod catalog;
mod duplicates;
mod planner;
mod purger;
#[cfg(test)]
mod tests;

pub use catalog::IndexCatalog;
pub use duplicates::DuplicateScanner;
pub use planner::RepairPlanner;
pub use purger::{PurgeOutcome, Purger};

use crate::adapters::histogram::DeltaHistogram;
use crate::domain::config::IntegrityConfig;
use crate::domain::errors::{IntegrityError, IntegrityResult};
use crate::domain::gaps::GapLocator;
use crate::domain::partition::DocType;
use crate::domain::report::{IntegrityReport, RepairReport, ResumePoint};
use crate::ports::inbound::IntegrityApi;
use crate::ports::outbound::DocumentStore;
use shared_types::BlockDelta;
use std::time::Instant;
use tracing::{error, info};

/// Verification and repair engine over one document store.
pub struct IntegrityService<S: DocumentStore> {
    store: S,
    config: IntegrityConfig,
}

impl<S: DocumentStore> IntegrityService<S> {
    /// Create the service; rejects an invalid configuration.
    pub fn new(store: S, config: IntegrityConfig) -> IntegrityResult<Self> {
        config.validate()?;
        Ok(Self { store, config })
    }

    pub fn config(&self) -> &IntegrityConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    fn catalog(&self) -> IndexCatalog<'_, S> {
        IndexCatalog::new(&self.store, &self.config.layout)
    }

    fn check(&self, started: Instant) -> IntegrityResult<IntegrityReport> {
        let catalog = self.catalog();
        let (Some(first), Some(last)) = (catalog.first_indexed_block()?, catalog.last_indexed_block()?) else {
            return Err(IntegrityError::DataEmpty);
        };
        let lower = first.global_block_num();
        let upper = last.global_block_num();
        info!(first = %first.block_nums(), last = %last.block_nums(), "checking indexed range");

        let (duplicates, scan_windows) =
            DuplicateScanner::new(&self.store, &self.config).full_range_duplicate_scan(lower, upper)?;
        if !duplicates.is_empty() {
            error!(deltas = ?duplicates.deltas, actions = ?duplicates.actions, "duplicates found");
            return Err(IntegrityError::DuplicatesFound {
                deltas: duplicates.deltas,
                actions: duplicates.actions,
            });
        }

        let delta_partitions = catalog.list_partitions(DocType::Delta)?;
        let action_partitions = catalog.list_partitions(DocType::Action)?;
        let mut report = IntegrityReport {
            first: first.clone(),
            last: last.clone(),
            delta_partitions: delta_partitions.len(),
            action_partitions: action_partitions.len(),
            scan_windows,
            histogram_queries: 0,
            duration_ms: 0,
        };

        if upper.saturating_sub(lower) < 2 {
            info!(lower, upper, "range too small to bisect");
            report.duration_ms = started.elapsed().as_millis() as u64;
            return Ok(report);
        }

        let oracle = DeltaHistogram::new(&self.store, self.config.layout.pattern(DocType::Delta));
        let locator = GapLocator::new(&oracle);

        let suffixes: Vec<u64> = delta_partitions.iter().map(|p| p.suffix).collect();
        let offset = first.native_block_num() as i64 - first.global_block_num() as i64;
        if let Some(block) = locator.find_partition_level_gap(&suffixes, self.config.layout.docs_per_index, offset)? {
            error!(block, "whole partition missing");
            return Err(IntegrityError::GapFound { block });
        }

        if let Some(block) = locator.check_gaps(lower, upper, upper - lower)? {
            error!(block, queries = locator.queries_issued(), "gap found");
            return Err(IntegrityError::GapFound { block });
        }

        report.histogram_queries = locator.queries_issued();
        report.duration_ms = started.elapsed().as_millis() as u64;
        info!(
            queries = report.histogram_queries,
            duration_ms = report.duration_ms,
            "integrity check passed"
        );
        Ok(report)
    }
}

impl<S: DocumentStore> IntegrityApi for IntegrityService<S> {
    fn first_indexed_block(&self) -> IntegrityResult<Option<BlockDelta>> {
        self.catalog().first_indexed_block()
    }

    fn last_indexed_block(&self) -> IntegrityResult<Option<BlockDelta>> {
        self.catalog().last_indexed_block()
    }

    fn full_integrity_check(&self) -> IntegrityResult<IntegrityReport> {
        self.check(Instant::now())
    }

    fn repair(&mut self) -> IntegrityResult<RepairReport> {
        let started = Instant::now();
        let anomaly = match self.check(started) {
            Ok(report) => {
                info!(last = %report.last.block_nums(), "store healthy, nothing to repair");
                return Ok(RepairReport::healthy(ResumePoint::at(&report.last)));
            }
            Err(e) => e.anomaly().ok_or(e)?,
        };

        let resume = RepairPlanner::new(&self.store, &self.config).resolve(&anomaly)?;
        let outcome = Purger::new(&mut self.store, &self.config.layout)
            .purge_newer_than(resume.native_block + 1, resume.global_block + 1)?;

        let report = RepairReport {
            repaired: Some(anomaly),
            resume,
            partitions_deleted: outcome.partitions_deleted,
            documents_deleted: outcome.documents_deleted,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            %resume,
            partitions = report.partitions_deleted.len(),
            documents = report.documents_deleted,
            "repair complete"
        );
        Ok(report)
    }
}
