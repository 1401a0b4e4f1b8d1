//! Domain layer for certification

pub mod certificate;
pub mod errors;
pub mod replica_log;
pub mod tombstones;
pub mod withdrawal;
pub mod witness;

pub use certificate::{RelationCertificate, RelationId, RelationStatus};
pub use errors::*;
pub use replica_log::ReplicaLog;
pub use tombstones::Tombstones;
pub use withdrawal::Withdrawal;
pub use witness::TxWitnessRecord;
