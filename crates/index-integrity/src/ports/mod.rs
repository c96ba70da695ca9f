//! # Ports Layer
//!
//! ## Hexagonal Architecture
//!
//! - `inbound.rs` - Driving ports (API exposed to the orchestrator)
//! - `outbound.rs` - Driven ports (the document store the engine runs against)

pub mod inbound;
pub mod outbound;
