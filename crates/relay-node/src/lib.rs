//! # Quorum-Relay Node
//!
//! Runs N replicas of the ordering core inside one process.
//!
//! ## Modules
//!
//! - `config/` - `NodeConfig` read from `QR_*` environment variables
//! - `network/` - `LoopbackNetwork`, the in-process `Transport`
//! - `replica/` - one replica's sequencing, certification and engine wiring
//! - `cluster/` - N replicas plus simulated clients
//!
//! ## Startup Sequence
//!
//! 1. Load configuration and derive the fault model
//! 2. Build the loopback network, one inbox per replica
//! 3. Spawn every replica and start its pipeline
//! 4. Register clients with every replica and drive proposals
//! 5. Wait for the expected batches, then compare orders across replicas

pub mod cluster;
pub mod config;
pub mod errors;
pub mod network;
pub mod replica;

pub use cluster::Cluster;
pub use config::{ConfigError, NodeConfig};
pub use errors::NodeError;
pub use network::{LoopbackEndpoint, LoopbackNetwork, NetworkMessage, Suspicion};
pub use replica::{OrderedEntry, ReplicaNode};
