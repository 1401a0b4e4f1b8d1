//! # Loopback Network
//!
//! In-process transport joining N replicas through tokio channels.
//!
//! - Requests go to every replica.
//! - Log entries go to every replica except their author, whose local orderer
//!   already fed them to its own sequencer.
//! - With a non-zero jitter each delivery is delayed independently, so
//!   messages from one source can overtake each other.
//! - Delivery never waits on a full inbox; the send is handed to a task.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use qr_01_sequencing::{SequencingError, Transport};
use rand::Rng;
use shared_types::{OrderedLogEntry, OrderedRequest, ReplicaId};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

/// Everything that crosses the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkMessage {
    Request(OrderedRequest),
    Log(OrderedLogEntry),
}

/// One suspicion raised through [`Transport::suspect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Suspicion {
    /// Endpoint that raised it; `None` for client endpoints.
    pub reporter: Option<ReplicaId>,
    pub suspect: ReplicaId,
}

pub struct LoopbackNetwork {
    peers: BTreeMap<ReplicaId, mpsc::Sender<NetworkMessage>>,
    jitter: Duration,
    muted: RwLock<HashSet<ReplicaId>>,
    suspicions: Mutex<Vec<Suspicion>>,
}

impl LoopbackNetwork {
    /// Build the network and hand back one inbox per replica.
    pub fn new(
        replicas: impl IntoIterator<Item = ReplicaId>,
        capacity: usize,
        jitter: Duration,
    ) -> (Arc<Self>, Vec<(ReplicaId, mpsc::Receiver<NetworkMessage>)>) {
        let mut peers = BTreeMap::new();
        let mut inboxes = Vec::new();
        for replica in replicas {
            let (tx, rx) = mpsc::channel(capacity);
            peers.insert(replica, tx);
            inboxes.push((replica, rx));
        }
        let network = Arc::new(Self {
            peers,
            jitter,
            muted: RwLock::new(HashSet::new()),
            suspicions: Mutex::new(Vec::new()),
        });
        (network, inboxes)
    }

    /// Transport handle for a replica (`Some`) or a client (`None`).
    pub fn endpoint(self: &Arc<Self>, origin: Option<ReplicaId>) -> Arc<LoopbackEndpoint> {
        Arc::new(LoopbackEndpoint {
            network: Arc::clone(self),
            origin,
        })
    }

    /// Drop every log entry `replica` broadcasts from now on.
    pub fn mute(&self, replica: ReplicaId) {
        if self.muted.write().insert(replica) {
            debug!(replica, "[relay] replica muted");
        }
    }

    pub fn unmute(&self, replica: ReplicaId) {
        self.muted.write().remove(&replica);
    }

    pub fn is_muted(&self, replica: ReplicaId) -> bool {
        self.muted.read().contains(&replica)
    }

    pub fn suspicions(&self) -> Vec<Suspicion> {
        self.suspicions.lock().clone()
    }

    pub fn replicas(&self) -> Vec<ReplicaId> {
        self.peers.keys().copied().collect()
    }

    fn delay(&self) -> Option<Duration> {
        if self.jitter.is_zero() {
            return None;
        }
        let max = self.jitter.as_micros() as u64;
        Some(Duration::from_micros(rand::thread_rng().gen_range(0..=max)))
    }

    async fn deliver(&self, to: ReplicaId, message: NetworkMessage) -> Result<(), SequencingError> {
        let Some(peer) = self.peers.get(&to) else {
            return Err(SequencingError::Transport(format!("unknown replica {to}")));
        };
        match self.delay() {
            // Never wait on a full inbox inline: two replicas blocked on each
            // other's inbox would stop draining their own.
            None => match peer.try_send(message) {
                Ok(()) => Ok(()),
                Err(mpsc::error::TrySendError::Full(message)) => {
                    let peer = peer.clone();
                    trace!(to, "[relay] inbox full, delivery deferred");
                    tokio::spawn(async move {
                        if peer.send(message).await.is_err() {
                            trace!(to, "[relay] deferred delivery dropped");
                        }
                    });
                    Ok(())
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    Err(SequencingError::Transport(format!("replica {to} unreachable")))
                }
            },
            Some(delay) => {
                let peer = peer.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    if peer.send(message).await.is_err() {
                        trace!(to, "[relay] delayed delivery dropped");
                    }
                });
                Ok(())
            }
        }
    }

    /// Deliver to every target; the first failure is reported after all
    /// attempts.
    async fn fan_out(
        &self,
        targets: impl Iterator<Item = ReplicaId>,
        message: NetworkMessage,
    ) -> Result<(), SequencingError> {
        let mut first_err = None;
        for to in targets {
            if let Err(err) = self.deliver(to, message.clone()).await {
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

/// [`Transport`] bound to one origin.
pub struct LoopbackEndpoint {
    network: Arc<LoopbackNetwork>,
    origin: Option<ReplicaId>,
}

impl LoopbackEndpoint {
    pub fn origin(&self) -> Option<ReplicaId> {
        self.origin
    }
}

#[async_trait]
impl Transport for LoopbackEndpoint {
    async fn broadcast_request(&self, request: OrderedRequest) -> Result<(), SequencingError> {
        let targets = self.network.replicas();
        self.network
            .fan_out(targets.into_iter(), NetworkMessage::Request(request))
            .await
    }

    async fn broadcast_log(&self, entry: OrderedLogEntry) -> Result<(), SequencingError> {
        if self.network.is_muted(entry.replica_id) {
            trace!(replica = entry.replica_id, seq = entry.sequence, "[relay] muted log dropped");
            return Ok(());
        }
        let author = entry.replica_id;
        let targets = self.network.replicas();
        self.network
            .fan_out(
                targets.into_iter().filter(|to| *to != author),
                NetworkMessage::Log(entry),
            )
            .await
    }

    async fn suspect(&self, replica: ReplicaId) -> Result<(), SequencingError> {
        warn!(reporter = ?self.origin, suspect = replica, "[relay] replica suspected");
        self.network.suspicions.lock().push(Suspicion {
            reporter: self.origin,
            suspect: replica,
        });
        Ok(())
    }
}
