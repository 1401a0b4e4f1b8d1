//! Graphing: majority-certified priority between every pair of a batch.
//!
//! A batch is resolved member by member. For the member at the front of the
//! waiting queue ("self") every pair `(self, other)` is checked; the first
//! undetermined pair pauses the whole batch until more log entries arrive or
//! the appointing timer relaxes the completion requirement.
//!
//! A batch only starts once every member is verified. Members still short
//! of quorum reporters when the liveness delay runs out are withdrawn, and
//! paving re-paves the batch without them.

use crate::config::DEFAULT_TOMBSTONE_WINDOW;
use crate::domain::{
    CertificationError, RelationCertificate, RelationId, RelationStatus, ReplicaLog, Tombstones,
    Withdrawal,
};
use shared_types::{
    BatchSeq, FaultModel, FinalizedGraph, OrderedLogEntry, PavedBatch, PriorityEdge, ReplicaId,
    TxHash,
};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use tracing::{debug, info};

/// What the graphing liveness timer is counting down for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphingWait {
    /// The batch is paused on an undetermined pair.
    Pair(BatchSeq),
    /// The next batch has members that are not verified yet.
    Members(BatchSeq),
}

struct Resolution {
    batch: PavedBatch,
    waiting: VecDeque<TxHash>,
    edges: Vec<PriorityEdge>,
    blocked_on: Option<RelationId>,
}

impl Resolution {
    fn new(batch: PavedBatch) -> Self {
        let waiting = batch.members.iter().cloned().collect();
        Self {
            batch,
            waiting,
            edges: Vec::new(),
            blocked_on: None,
        }
    }
}

pub struct GraphingState {
    model: FaultModel,
    logs: BTreeMap<ReplicaId, ReplicaLog>,
    verified: HashSet<TxHash>,
    expected_seq: BatchSeq,
    pending: BTreeMap<BatchSeq, PavedBatch>,
    current: Option<Resolution>,
    certs: HashMap<RelationId, RelationCertificate>,
    /// Completion drops from N scanned replicas to quorum.
    relaxed: bool,
    retired: Tombstones,
}

impl GraphingState {
    pub fn new(model: FaultModel) -> Self {
        let logs = model
            .replicas()
            .map(|replica| (replica, ReplicaLog::new(replica)))
            .collect();
        Self {
            model,
            logs,
            verified: HashSet::new(),
            expected_seq: 1,
            pending: BTreeMap::new(),
            current: None,
            certs: HashMap::new(),
            relaxed: false,
            retired: Tombstones::new(model.n(), DEFAULT_TOMBSTONE_WINDOW),
        }
    }

    #[must_use]
    pub fn with_tombstone_window(mut self, window: u64) -> Self {
        self.retired = Tombstones::new(self.model.n(), window);
        self
    }

    pub fn tombstones(&self) -> usize {
        self.retired.len()
    }

    pub fn expected_seq(&self) -> BatchSeq {
        self.expected_seq
    }

    pub fn on_log(
        &mut self,
        entry: &OrderedLogEntry,
    ) -> Result<Vec<FinalizedGraph>, CertificationError> {
        let log = self
            .logs
            .get_mut(&entry.replica_id)
            .ok_or(CertificationError::UnknownReplica {
                replica: entry.replica_id,
                n: self.model.n(),
            })?;
        if self.retired.absorb(&entry.tx_hash, entry.replica_id) {
            return Ok(Vec::new());
        }
        if !log.append(entry) {
            return Ok(Vec::new());
        }
        Ok(self.progress())
    }

    pub fn on_verified(&mut self, hash: TxHash) -> Vec<FinalizedGraph> {
        if self.retired.contains(&hash) || !self.verified.insert(hash) {
            return Vec::new();
        }
        self.progress()
    }

    pub fn on_paved(
        &mut self,
        batch: PavedBatch,
    ) -> Result<Vec<FinalizedGraph>, CertificationError> {
        let in_flight = self
            .current
            .as_ref()
            .is_some_and(|resolution| resolution.batch.batch_seq == batch.batch_seq);
        if batch.batch_seq < self.expected_seq
            || in_flight
            || self.pending.contains_key(&batch.batch_seq)
        {
            return Err(CertificationError::BatchOutOfOrder {
                expected: self.expected_seq,
                actual: batch.batch_seq,
            });
        }
        self.pending.insert(batch.batch_seq, batch);
        Ok(self.progress())
    }

    /// Batch paused on an undetermined pair, if any.
    pub fn blocked_batch(&self) -> Option<BatchSeq> {
        self.current
            .as_ref()
            .filter(|resolution| resolution.blocked_on.is_some())
            .map(|resolution| resolution.batch.batch_seq)
    }

    /// Pair the current batch is waiting on.
    pub fn blocked_pair(&self) -> Option<&RelationId> {
        self.current.as_ref()?.blocked_on.as_ref()
    }

    /// Next batch held back by members that are not verified yet.
    pub fn unverified_batch(&self) -> Option<BatchSeq> {
        if self.current.is_some() {
            return None;
        }
        let batch = self.pending.get(&self.expected_seq)?;
        batch
            .members
            .iter()
            .any(|hash| !self.verified.contains(hash))
            .then_some(batch.batch_seq)
    }

    /// The wait the liveness timer should cover, if any.
    pub fn waiting(&self) -> Option<GraphingWait> {
        self.blocked_batch()
            .map(GraphingWait::Pair)
            .or_else(|| self.unverified_batch().map(GraphingWait::Members))
    }

    fn reporters(&self, hash: &TxHash) -> BTreeSet<ReplicaId> {
        self.logs
            .iter()
            .filter(|(_, log)| log.contains(hash))
            .map(|(replica, _)| *replica)
            .collect()
    }

    /// Pull the members of `batch_seq` that are unverified and logged by
    /// fewer than quorum replicas, and drop the batch so it can be re-paved.
    ///
    /// Members with quorum reporters are only late to verify and are kept.
    /// Returns `None` when nothing qualifies.
    pub fn withdraw_unverified(&mut self, batch_seq: BatchSeq) -> Option<Withdrawal> {
        if self.unverified_batch() != Some(batch_seq) {
            return None;
        }
        let batch = self.pending.get(&batch_seq)?;
        let mut withdrawal = Withdrawal {
            batch_seq,
            hashes: BTreeSet::new(),
            reporters: BTreeSet::new(),
        };
        for hash in &batch.members {
            if self.verified.contains(hash) {
                continue;
            }
            let reporters = self.reporters(hash);
            if reporters.len() < self.model.quorum() {
                withdrawal.hashes.insert(hash.clone());
                withdrawal.reporters.extend(reporters);
            }
        }
        if withdrawal.hashes.is_empty() {
            return None;
        }

        self.pending.remove(&batch_seq);
        for hash in &withdrawal.hashes {
            self.bury(batch_seq, hash);
        }
        info!(
            batch_seq,
            withdrawn = withdrawal.hashes.len(),
            "[qr-02] unverified members withdrawn"
        );
        Some(withdrawal)
    }

    fn bury(&mut self, batch_seq: BatchSeq, hash: &TxHash) {
        let mut reporters = Vec::new();
        for (replica, log) in self.logs.iter_mut() {
            if log.remove(hash) {
                reporters.push(*replica);
            }
        }
        self.verified.remove(hash);
        self.retired.bury(batch_seq, hash.clone(), reporters);
    }

    /// Relax pair completion to quorum for `batch_seq`.
    ///
    /// Returns the replicas that gave no evidence on the blocked pair.
    pub fn relax(&mut self, batch_seq: BatchSeq) -> Vec<ReplicaId> {
        let Some(pair) = self
            .current
            .as_ref()
            .filter(|resolution| resolution.batch.batch_seq == batch_seq)
            .and_then(|resolution| resolution.blocked_on.clone())
        else {
            return Vec::new();
        };
        self.relaxed = true;
        let cert = self.certs.get(&pair);
        self.model
            .replicas()
            .filter(|replica| !cert.is_some_and(|cert| cert.is_scanned(*replica)))
            .collect()
    }

    /// Pairwise priority of `a` over `b`, memoized.
    pub fn check(&mut self, a: &TxHash, b: &TxHash) -> RelationStatus {
        let id = RelationId::new(a.clone(), b.clone());
        let mut cert = self.certs.remove(&id).unwrap_or_default();
        if cert.is_finished() {
            let status = cert.status();
            self.certs.insert(id, cert);
            return status;
        }

        for (replica, log) in &self.logs {
            if cert.is_scanned(*replica) {
                continue;
            }
            if let (Some(seq_a), Some(seq_b)) = (log.sequence_of(a), log.sequence_of(b)) {
                cert.vote(*replica, seq_a < seq_b);
            }
        }

        let required = if self.relaxed {
            self.model.quorum()
        } else {
            self.model.n()
        };
        if !cert.settle_majority(self.model.majority()) {
            cert.settle_exhausted(required);
        }

        let status = cert.status();
        if cert.is_finished() {
            self.certs.insert(id.reversed(), cert.mirrored());
        }
        self.certs.insert(id, cert);
        status
    }

    /// Resolve as much as current evidence allows.
    pub fn progress(&mut self) -> Vec<FinalizedGraph> {
        let mut finalized = Vec::new();
        loop {
            let mut resolution = match self.current.take() {
                Some(resolution) => resolution,
                None => match self.start_next() {
                    Some(resolution) => resolution,
                    None => return finalized,
                },
            };

            if !self.resolve(&mut resolution) {
                self.current = Some(resolution);
                return finalized;
            }
            finalized.push(self.finalize(resolution));
        }
    }

    fn start_next(&mut self) -> Option<Resolution> {
        let batch = self.pending.get(&self.expected_seq)?;
        if !batch.members.iter().all(|hash| self.verified.contains(hash)) {
            return None;
        }
        let batch = self.pending.remove(&self.expected_seq)?;
        debug!(
            batch_seq = batch.batch_seq,
            members = batch.members.len(),
            "[qr-02] graphing batch"
        );
        Some(Resolution::new(batch))
    }

    /// Returns `true` once every pair of the batch is resolved.
    fn resolve(&mut self, resolution: &mut Resolution) -> bool {
        while let Some(this) = resolution.waiting.front().cloned() {
            let others: Vec<TxHash> = resolution
                .batch
                .members
                .iter()
                .filter(|other| **other != this)
                .cloned()
                .collect();

            let mut verdicts = Vec::with_capacity(others.len());
            for other in others {
                let status = self.check(&this, &other);
                if status == RelationStatus::Undetermined {
                    resolution.blocked_on = Some(RelationId::new(this, other));
                    return false;
                }
                verdicts.push((other, status));
            }

            resolution.waiting.pop_front();
            for (other, status) in verdicts {
                // Pairs with already resolved members were derived from their side.
                if !resolution.waiting.contains(&other) {
                    continue;
                }
                match status {
                    RelationStatus::FromFirst => resolution
                        .edges
                        .push(PriorityEdge::new(this.clone(), other)),
                    RelationStatus::ToFirst => resolution
                        .edges
                        .push(PriorityEdge::new(other, this.clone())),
                    RelationStatus::Unordered | RelationStatus::Undetermined => {}
                }
            }
        }
        resolution.blocked_on = None;
        true
    }

    fn finalize(&mut self, resolution: Resolution) -> FinalizedGraph {
        let graph = FinalizedGraph {
            batch_seq: resolution.batch.batch_seq,
            members: resolution.batch.members,
            edges: resolution.edges,
        };
        for hash in &graph.members {
            self.bury(graph.batch_seq, hash);
        }
        self.certs.clear();
        self.relaxed = false;
        self.expected_seq += 1;
        info!(
            batch_seq = graph.batch_seq,
            edges = graph.edges.len(),
            "[qr-02] batch finalized"
        );
        graph
    }
}
