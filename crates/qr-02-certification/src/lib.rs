//! # Certification Subsystem (qr-02)
//!
//! Turns every replica's released log into majority-certified priority
//! graphs, one fixed-size batch at a time.
//!
//! ## Architecture
//!
//! ```text
//!                       submit(replica, entry)
//!                                │
//!            ┌───────────────────┼───────────────────┐
//!            ▼                   ▼                   ▼
//!      PavingStage        VerifyingStage       GraphingStage ──► FinalizedGraph
//!            │ PavedBatch        │ TxHash         ▲  ▲   │
//!            └───────────────────┼────────────────┘  │   │ RetiredBatch
//!                                └───────────────────┘   ▼
//!                                               Paving + Verifying
//! ```
//!
//! - **Domain**: `ReplicaLog`, `TxWitnessRecord`, `RelationCertificate`
//! - **Algorithms**: `PavingState`, `VerifyingState`, `GraphingState`
//! - **Application**: `Pipeline`, `LivenessTimer`
//! - **Ports**: `CertificationApi`
//!
//! ## Thresholds
//!
//! For N replicas: `f = max(1, ⌊(N-1)/4⌋)`, quorum `N - f`, majority
//! `⌊N/2⌋ + 1`. A paving row is read once a quorum has reached it, a hash is
//! verified at quorum witnesses, and a pair is decided by majority.
//!
//! ## Liveness
//!
//! Each stage arms one timer when it stalls with quorum evidence but not
//! full evidence. When it fires, the stage suspects the silent replicas and
//! degrades that one decision to quorum.
//!
//! Graphing's timer also covers a paved batch whose members never verify.
//! Such members were logged by fewer than quorum replicas; they are withdrawn,
//! their reporters suspected, and paving re-paves the batch without them.
//!
//! Retired and withdrawn hashes are tombstoned until every replica has
//! reported them or `tombstone_window` batches have passed.

pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use algorithms::{
    GraphingState, GraphingWait, PavingState, PavingStatus, StallKey, VerifyingState,
};
pub use application::{LivenessTimer, Pipeline, TimerFired};
pub use config::CertificationConfig;
pub use domain::{
    CertificationError, RelationCertificate, RelationId, RelationStatus, ReplicaLog, Tombstones,
    TxWitnessRecord, Withdrawal,
};
pub use ports::CertificationApi;
