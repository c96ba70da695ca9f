//! # Repair Planner
//!
//! Turns a detected anomaly into the last block known to be clean.
//!
//! ## Gaps
//!
//! Ingestion may lag behind the check, so the delta at the gap block is
//! looked up first. When it is absent the planner steps backward with
//! exponential strides (`base^1, base^2, ...`) until an anchor delta is found.
//! The anchor only supplies the native/global offset; the clean boundary is
//! always the block right before the gap.
//!
//! ## Duplicates
//!
//! Every duplicate (delta block or action hash) is resolved to its owning
//! delta and the earliest one wins, whichever record type exposed it.

use crate::domain::config::IntegrityConfig;
use crate::domain::errors::{IntegrityError, IntegrityResult};
use crate::domain::partition::DocType;
use crate::domain::report::{Anomaly, ResumePoint};
use crate::ports::outbound::DocumentStore;
use shared_types::BlockDelta;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

pub struct RepairPlanner<'a, S: DocumentStore + ?Sized> {
    store: &'a S,
    config: &'a IntegrityConfig,
}

impl<'a, S: DocumentStore + ?Sized> RepairPlanner<'a, S> {
    pub fn new(store: &'a S, config: &'a IntegrityConfig) -> Self {
        Self { store, config }
    }

    pub fn resolve(&self, anomaly: &Anomaly) -> IntegrityResult<ResumePoint> {
        let resume = match anomaly {
            Anomaly::Gap { block } => self.resolve_gap(*block)?,
            Anomaly::Duplicates { deltas, actions } => self.resolve_duplicates(deltas, actions)?,
        };
        info!(%anomaly, %resume, "resolved repair point");
        Ok(resume)
    }

    fn delta_at(&self, global: u64) -> IntegrityResult<Option<BlockDelta>> {
        Ok(self
            .store
            .delta_by_global(&self.config.layout.pattern(DocType::Delta), global)?)
    }

    fn resolve_gap(&self, gap: u64) -> IntegrityResult<ResumePoint> {
        if let Some(found) = self.delta_at(gap)? {
            debug!(gap, block = %found.block_nums(), "gap block indexed since the check");
            return Ok(ResumePoint::before(&found));
        }

        let mut probe = gap;
        for attempt in 1..=self.config.backstep_attempts {
            if probe == 0 {
                break;
            }
            probe = probe.saturating_sub(self.config.backstep_base.saturating_pow(attempt));
            warn!(gap, attempt, probe, "no delta at probe, stepping back");
            if let Some(anchor) = self.delta_at(probe)? {
                return Self::before_gap(gap, &anchor);
            }
        }

        Err(IntegrityError::UnrecoverableAnomaly {
            block: gap,
            reason: format!(
                "gap found but no anchor block recoverable after {} back-steps",
                self.config.backstep_attempts
            ),
        })
    }

    /// Clean boundary right before `gap`, mapped to native numbering with the
    /// anchor's fixed offset.
    fn before_gap(gap: u64, anchor: &BlockDelta) -> IntegrityResult<ResumePoint> {
        let offset = anchor.native_block_num() as i128 - anchor.global_block_num() as i128;
        let global = gap.checked_sub(1).ok_or_else(|| IntegrityError::UnrecoverableAnomaly {
            block: gap,
            reason: "gap at block zero".to_string(),
        })?;
        let native = u64::try_from(global as i128 + offset).map_err(|_| IntegrityError::UnrecoverableAnomaly {
            block: gap,
            reason: format!("native offset {offset} out of range"),
        })?;
        Ok(ResumePoint {
            native_block: native,
            global_block: global,
        })
    }

    fn resolve_duplicates(&self, deltas: &BTreeSet<u64>, actions: &BTreeSet<String>) -> IntegrityResult<ResumePoint> {
        let action_pattern = self.config.layout.pattern(DocType::Action);
        let mut earliest: Option<BlockDelta> = None;
        let mut consider = |candidate: BlockDelta| {
            if earliest
                .as_ref()
                .map_or(true, |e| candidate.global_block_num() < e.global_block_num())
            {
                earliest = Some(candidate);
            }
        };

        for hash in actions {
            let Some(action) = self.store.earliest_action_by_hash(&action_pattern, hash)? else {
                warn!(%hash, "duplicate action vanished before repair");
                continue;
            };
            match self.delta_at(action.evm_block_num())? {
                Some(owner) => consider(owner),
                None => warn!(%hash, block = action.evm_block_num(), "duplicate action has no owning delta"),
            }
        }

        for &block in deltas {
            match self.delta_at(block)? {
                Some(delta) => consider(delta),
                None => warn!(block, "duplicate delta vanished before repair"),
            }
        }

        let first = deltas.first().copied().unwrap_or_default();
        earliest
            .map(|delta| ResumePoint::before(&delta))
            .ok_or_else(|| IntegrityError::UnrecoverableAnomaly {
                block: first,
                reason: "no duplicate could be resolved to an indexed block".to_string(),
            })
    }
}
