//! # Sequencing Subsystem (qr-01)
//!
//! Turns per-source, possibly reordered streams into strictly ordered ones,
//! and produces this replica's own log entries.
//!
//! ## Architecture
//!
//! ```text
//! client ──► RequestForwarder ──► Transport ──► SequencerRegistry<OrderedRequest>
//!                                                     │ released hashes
//!                                                     ▼
//!                                              LocalOrderService ──► Transport (other replicas)
//!                                                     │
//!                                                     ▼
//! remote entries ──────────────────────────► SequencerRegistry<OrderedLogEntry>
//!                                                     │ released entries
//!                                                     ▼
//!                                             certification pipeline
//! ```
//!
//! - **Domain**: `SourceRecorder`, `ReorderCache`, the `Sequenced` item trait
//! - **Algorithms**: `GapSequencer`
//! - **Application**: `SequencerRegistry`, `LocalOrderService`, `RequestForwarder`
//! - **Ports**: `Transport`, `TransactionStore`, `TxHasher`, `ProposalApi`
//! - **Adapters**: `InMemoryTransactionStore`, `Sha256TxHasher`
//!
//! ## Release Rule
//!
//! An item leaves a sequencer iff its sequence is `counter + 1` and its
//! timestamp is strictly greater than the last released one.

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use adapters::{InMemoryTransactionStore, Sha256TxHasher};
pub use algorithms::GapSequencer;
pub use application::{
    LocalOrderService, LocalOrderer, MonotonicClock, RequestForwarder, SequencerRegistry,
    SourceKind,
};
pub use config::SequencingConfig;
pub use domain::{ReorderCache, Sequenced, SequencingError, SourceRecorder};
pub use ports::{ProposalApi, TransactionStore, Transport, TxHasher};
