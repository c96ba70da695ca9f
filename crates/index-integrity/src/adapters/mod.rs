//! # Adapters Layer
//!
//! Concrete `DocumentStore` implementations and the histogram oracle bound
//! to the delta pattern.

#[cfg(feature = "elastic")]
pub mod elastic;
pub mod histogram;
pub mod memory;

#[cfg(feature = "elastic")]
pub use elastic::{ElasticConfig, ElasticStore};
pub use histogram::DeltaHistogram;
pub use memory::InMemoryDocumentStore;
