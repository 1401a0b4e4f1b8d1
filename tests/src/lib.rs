//! # Quorum-Relay Test Suite
//!
//! Multi-replica scenarios that cross subsystem boundaries.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── pipeline_flows.rs   # certification + graph engine, hand-fed logs
//!     ├── e2e_ordering.rs     # full cluster over the loopback network
//!     └── liveness.rs         # straggler replicas and timer degradation
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p qr-tests
//!
//! # By scenario
//! cargo test -p qr-tests integration::liveness::
//! ```

#![allow(dead_code)]

pub mod integration;
