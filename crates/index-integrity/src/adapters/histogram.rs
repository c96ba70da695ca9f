//! Histogram oracle over the delta global block number.

use crate::domain::errors::StoreError;
use crate::domain::gaps::{HistogramBucket, HistogramOracle};
use crate::ports::outbound::{DocumentStore, Field, HistogramQuery};

/// Binds a document store to the delta pattern of one deployment.
pub struct DeltaHistogram<'a, S: DocumentStore + ?Sized> {
    store: &'a S,
    pattern: String,
}

impl<'a, S: DocumentStore + ?Sized> DeltaHistogram<'a, S> {
    pub fn new(store: &'a S, pattern: impl Into<String>) -> Self {
        Self {
            store,
            pattern: pattern.into(),
        }
    }
}

impl<S: DocumentStore + ?Sized> HistogramOracle for DeltaHistogram<'_, S> {
    fn histogram(&self, lower: u64, upper: u64, width: u64) -> Result<Vec<HistogramBucket>, StoreError> {
        self.store.histogram(&HistogramQuery {
            pattern: self.pattern.clone(),
            field: Field::DeltaGlobalBlock,
            lower,
            upper,
            interval: width,
        })
    }
}
