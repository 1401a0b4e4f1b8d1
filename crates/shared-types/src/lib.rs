//! # Shared Types Crate
//!
//! Data model shared by the ordering subsystems.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every type that crosses a subsystem boundary
//!   (requests, log entries, batches, finalized graphs) is defined here.
//! - **Closed vocabulary**: cross-stage payloads are plain structs with serde
//!   derives; no untyped event channels.
//! - **One fault model**: `f`, quorum and majority are derived in exactly one
//!   place so that every stage agrees on the thresholds.

pub mod entities;
pub mod errors;
pub mod fault;
pub mod status;

pub use entities::*;
pub use errors::*;
pub use fault::FaultModel;
pub use status::{AtomicStatusSet, StatusFlag, StatusSet};
