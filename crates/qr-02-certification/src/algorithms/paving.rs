//! Paving: canonical batch membership.
//!
//! A single round-robin cursor walks the replica logs: round `r` reads
//! replica `r mod N + 1` at position `r div N + 1`. A row (one position
//! across all replicas) is only read once a quorum of replicas has an entry
//! there, and the cursor never steps over a hole unless that cell was
//! relaxed by the paving timer. The first `K` distinct hashes read form the
//! batch.
//!
//! A batch whose members graphing withdraws is re-paved under the same
//! sequence from a fresh cursor, without the withdrawn hashes.

use crate::config::DEFAULT_TOMBSTONE_WINDOW;
use crate::domain::{CertificationError, ReplicaLog, Tombstones, Withdrawal};
use serde::{Deserialize, Serialize};
use shared_types::{BatchSeq, FaultModel, OrderedLogEntry, PavedBatch, ReplicaId, RetiredBatch, TxHash};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Identifies one stalled cursor cell for the paving timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StallKey {
    pub batch_seq: BatchSeq,
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PavingStatus {
    /// A batch was completed and must be retired before the next one starts.
    Paved(PavedBatch),
    /// The current batch is out and not yet retired.
    AwaitingRetirement(BatchSeq),
    /// Fewer than quorum replicas have reached `position`.
    AwaitingQuorum { position: usize },
    /// The row is quorum-complete but the cursor's cell is missing.
    Stalled { key: StallKey, missing: Vec<ReplicaId> },
}

pub struct PavingState {
    model: FaultModel,
    capacity: usize,
    logs: BTreeMap<ReplicaId, ReplicaLog>,
    round: u64,
    batch_seq: BatchSeq,
    members: BTreeSet<TxHash>,
    awaiting: Option<BatchSeq>,
    /// Replicas skipped per row for the batch in progress.
    relaxed: BTreeMap<usize, BTreeSet<ReplicaId>>,
    retired: Tombstones,
}

impl PavingState {
    pub fn new(model: FaultModel, capacity: usize) -> Self {
        let logs = model
            .replicas()
            .map(|replica| (replica, ReplicaLog::new(replica)))
            .collect();
        Self {
            model,
            capacity,
            logs,
            round: 0,
            batch_seq: 1,
            members: BTreeSet::new(),
            awaiting: None,
            relaxed: BTreeMap::new(),
            retired: Tombstones::new(model.n(), DEFAULT_TOMBSTONE_WINDOW),
        }
    }

    #[must_use]
    pub fn with_tombstone_window(mut self, window: u64) -> Self {
        self.retired = Tombstones::new(self.model.n(), window);
        self
    }

    /// Sequence of the batch being assembled (or awaiting retirement).
    pub fn batch_seq(&self) -> BatchSeq {
        self.batch_seq
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn log(&self, replica: ReplicaId) -> Option<&ReplicaLog> {
        self.logs.get(&replica)
    }

    pub fn on_log(&mut self, entry: &OrderedLogEntry) -> Result<PavingStatus, CertificationError> {
        let log = self
            .logs
            .get_mut(&entry.replica_id)
            .ok_or(CertificationError::UnknownReplica {
                replica: entry.replica_id,
                n: self.model.n(),
            })?;
        if self.retired.absorb(&entry.tx_hash, entry.replica_id) {
            debug!(hash = %entry.tx_hash.short(), "[qr-02] paving ignores retired hash");
        } else {
            log.append(entry);
        }
        Ok(self.advance())
    }

    /// Drop every trace of a retired batch and restart the cursor.
    pub fn on_retired(&mut self, batch: &RetiredBatch) -> Result<PavingStatus, CertificationError> {
        if self.awaiting != Some(batch.batch_seq) {
            return Err(CertificationError::BatchOutOfOrder {
                expected: self.batch_seq,
                actual: batch.batch_seq,
            });
        }
        self.bury(batch.batch_seq, &batch.members);
        self.batch_seq += 1;
        self.restart();
        Ok(self.advance())
    }

    /// Re-pave the awaiting batch without the withdrawn hashes.
    pub fn on_withdrawn(&mut self, withdrawal: &Withdrawal) -> Result<PavingStatus, CertificationError> {
        if self.awaiting != Some(withdrawal.batch_seq) {
            return Err(CertificationError::BatchOutOfOrder {
                expected: self.batch_seq,
                actual: withdrawal.batch_seq,
            });
        }
        self.bury(withdrawal.batch_seq, &withdrawal.hashes);
        info!(
            batch_seq = self.batch_seq,
            withdrawn = withdrawal.hashes.len(),
            "[qr-02] re-paving batch"
        );
        self.restart();
        Ok(self.advance())
    }

    fn bury(&mut self, batch_seq: BatchSeq, hashes: &BTreeSet<TxHash>) {
        for hash in hashes {
            let mut reporters = Vec::new();
            for (replica, log) in self.logs.iter_mut() {
                if log.remove(hash) {
                    reporters.push(*replica);
                }
            }
            self.retired.bury(batch_seq, hash.clone(), reporters);
        }
    }

    fn restart(&mut self) {
        self.round = 0;
        self.awaiting = None;
        self.members.clear();
        self.relaxed.clear();
    }

    /// Hashes still tombstoned.
    pub fn tombstones(&self) -> usize {
        self.retired.len()
    }

    /// Let the cursor skip the replicas still missing at `key.position`.
    ///
    /// Returns the skipped replicas (the suspects). A key that no longer
    /// matches the cursor is ignored.
    pub fn relax(&mut self, key: StallKey) -> Vec<ReplicaId> {
        if self.awaiting.is_some() || key.batch_seq != self.batch_seq || key.position != self.position()
        {
            return Vec::new();
        }
        let missing = self.missing_at(key.position);
        self.relaxed
            .entry(key.position)
            .or_default()
            .extend(missing.iter().copied());
        missing
    }

    fn position(&self) -> usize {
        (self.round / self.model.n() as u64) as usize + 1
    }

    fn replica(&self) -> ReplicaId {
        self.round % self.model.n() as u64 + 1
    }

    fn filled_at(&self, position: usize) -> usize {
        self.logs.values().filter(|log| log.len() >= position).count()
    }

    fn missing_at(&self, position: usize) -> Vec<ReplicaId> {
        let relaxed = self.relaxed.get(&position);
        self.logs
            .iter()
            .filter(|(replica, log)| {
                log.len() < position && !relaxed.is_some_and(|skip| skip.contains(*replica))
            })
            .map(|(replica, _)| *replica)
            .collect()
    }

    /// Move the cursor as far as the logs allow.
    pub fn advance(&mut self) -> PavingStatus {
        if let Some(batch_seq) = self.awaiting {
            return PavingStatus::AwaitingRetirement(batch_seq);
        }
        loop {
            let position = self.position();
            let replica = self.replica();

            if self.filled_at(position) < self.model.quorum() {
                return PavingStatus::AwaitingQuorum { position };
            }
            if self
                .relaxed
                .get(&position)
                .is_some_and(|skip| skip.contains(&replica))
            {
                self.round += 1;
                continue;
            }

            let cell = self
                .logs
                .get(&replica)
                .and_then(|log| log.get_by_position(position))
                .cloned();
            let Some(hash) = cell else {
                return PavingStatus::Stalled {
                    key: StallKey {
                        batch_seq: self.batch_seq,
                        position,
                    },
                    missing: self.missing_at(position),
                };
            };

            self.members.insert(hash);
            self.round += 1;

            if self.members.len() >= self.capacity {
                let batch = PavedBatch {
                    batch_seq: self.batch_seq,
                    members: self.members.clone(),
                };
                self.awaiting = Some(self.batch_seq);
                debug!(
                    batch_seq = self.batch_seq,
                    rounds = self.round,
                    "[qr-02] batch paved"
                );
                return PavingStatus::Paved(batch);
            }
        }
    }
}
