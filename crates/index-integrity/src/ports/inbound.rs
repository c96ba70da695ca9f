//! # Inbound Ports (Driving Ports)
//!
//! The API the orchestrator drives before (re)starting ingestion.

use crate::domain::errors::IntegrityResult;
use crate::domain::report::{IntegrityReport, RepairReport};
use shared_types::BlockDelta;

/// Verification and repair operations over an indexed chain.
pub trait IntegrityApi {
    /// Lowest indexed delta, walking partitions upward and skipping empty ones.
    ///
    /// ## Errors
    ///
    /// - `Catalog`: partition listing failed
    /// - `Store`: any other store round trip failed
    fn first_indexed_block(&self) -> IntegrityResult<Option<BlockDelta>>;

    /// Highest indexed delta, walking partitions downward and skipping empty ones.
    fn last_indexed_block(&self) -> IntegrityResult<Option<BlockDelta>>;

    /// Prove the indexed range is gap-free and duplicate-free.
    ///
    /// ## Errors
    ///
    /// - `DataEmpty`: nothing indexed yet
    /// - `DuplicatesFound`: checked first, takes priority over gaps
    /// - `GapFound`: first missing global block number
    /// - `Catalog` / `Store`: transport failures, never reported as corruption
    fn full_integrity_check(&self) -> IntegrityResult<IntegrityReport>;

    /// Check, and on corruption delete everything newer than the last clean
    /// block. Running it again on a repaired store is a no-op.
    ///
    /// ## Errors
    ///
    /// - `DataEmpty`: nothing to repair
    /// - `UnrecoverableAnomaly`: no anchor block could be found
    fn repair(&mut self) -> IntegrityResult<RepairReport>;
}
