//! Inbound Ports (Driving Ports / API)

use crate::domain::errors::CertificationError;
use async_trait::async_trait;
use shared_types::{OrderedLogEntry, ReplicaId, StatusSet};

/// Lifecycle and input of one replica's certification pipeline.
#[async_trait]
pub trait CertificationApi: Send + Sync {
    /// Spawn the stage workers. Calling it again while running is a no-op.
    fn start(&self) -> Result<(), CertificationError>;

    /// Signal every stage to exit. Never blocks; repeated calls are no-ops.
    fn stop(&self);

    /// Fan a released log entry out to paving, verifying and graphing.
    async fn submit(
        &self,
        replica_id: ReplicaId,
        entry: OrderedLogEntry,
    ) -> Result<(), CertificationError>;

    /// Lifecycle and armed liveness timers.
    fn status(&self) -> StatusSet;
}
