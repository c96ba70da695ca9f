//! Error types for the integrity engine

use crate::domain::report::Anomaly;
use std::collections::BTreeSet;
use thiserror::Error;

/// Transport-level failures of the document store.
///
/// These are propagated unchanged and never interpreted as corruption.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Store unreachable or refused the request
    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },

    /// A concrete (non-wildcard) index does not exist
    #[error("Index not found: {index}")]
    IndexNotFound { index: String },

    /// Response could not be decoded
    #[error("Malformed store response: {reason}")]
    Malformed { reason: String },
}

/// Integrity engine errors
#[derive(Debug, Error)]
pub enum IntegrityError {
    /// No partitions (or no documents) for the delta type; informational
    #[error("No indexed data found")]
    DataEmpty,

    /// Keys that must be unique appear more than once
    #[error("Duplicates found! deltas: {deltas:?}, actions: {actions:?}")]
    DuplicatesFound {
        deltas: BTreeSet<u64>,
        actions: BTreeSet<String>,
    },

    /// First missing global block number
    #[error("Gap found! {block}")]
    GapFound { block: u64 },

    /// Repair could not find a block to roll back to
    #[error("Unrecoverable anomaly at block {block}: {reason}")]
    UnrecoverableAnomaly { block: u64, reason: String },

    /// Partition listing failed
    #[error("Partition catalog unavailable: {0}")]
    Catalog(#[source] StoreError),

    /// Any other store round trip failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Engine configuration rejected
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl IntegrityError {
    /// The detected anomaly, if this error reports corruption.
    pub fn anomaly(&self) -> Option<Anomaly> {
        match self {
            Self::DuplicatesFound { deltas, actions } => Some(Anomaly::Duplicates {
                deltas: deltas.clone(),
                actions: actions.clone(),
            }),
            Self::GapFound { block } => Some(Anomaly::Gap { block: *block }),
            _ => None,
        }
    }

    /// True for gap and duplicate detections.
    pub fn is_corruption(&self) -> bool {
        self.anomaly().is_some()
    }
}

impl From<Anomaly> for IntegrityError {
    fn from(anomaly: Anomaly) -> Self {
        match anomaly {
            Anomaly::Gap { block } => Self::GapFound { block },
            Anomaly::Duplicates { deltas, actions } => Self::DuplicatesFound { deltas, actions },
        }
    }
}

/// Result type for integrity operations
pub type IntegrityResult<T> = Result<T, IntegrityError>;
