//! # Shared Types Crate
//!
//! Stored document shapes for the EVM indexer, as written by the ingestion
//! process into the partitioned document store.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: the integrity engine, its adapters and the
//!   operator tooling all deserialize documents through these types.
//! - **Wire Fidelity**: serde renames follow the stored JSON exactly
//!   (`@global.block_num`, `@raw.hash`, ...), so a document fetched from the
//!   store round-trips without a translation layer.

pub mod entities;

pub use entities::*;
