//! Explicit per-source sequencer registry.
//!
//! Every source gets one worker task owning its [`GapSequencer`]. Workers are
//! created only by [`SequencerRegistry::register_source`]; items from a
//! source nobody registered are refused, never used to spawn a worker.

use crate::algorithms::GapSequencer;
use crate::config::SequencingConfig;
use crate::domain::{Sequenced, SequencingError};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// What kind of source a registry orders, for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Client,
    Replica,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client => f.write_str("client"),
            Self::Replica => f.write_str("replica"),
        }
    }
}

struct SourceWorker<T> {
    inbox: mpsc::Sender<T>,
    handle: JoinHandle<()>,
}

pub struct SequencerRegistry<T: Sequenced> {
    kind: SourceKind,
    config: SequencingConfig,
    output: mpsc::Sender<T::Release>,
    shutdown: watch::Receiver<bool>,
    workers: RwLock<HashMap<u64, SourceWorker<T>>>,
}

impl<T: Sequenced> SequencerRegistry<T> {
    /// Released items of every source are merged into `output`.
    pub fn new(
        kind: SourceKind,
        config: SequencingConfig,
        output: mpsc::Sender<T::Release>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            kind,
            config,
            output,
            shutdown,
            workers: RwLock::new(HashMap::new()),
        }
    }

    /// Spawn the worker for `source_id`. Must run inside a tokio runtime.
    pub fn register_source(&self, source_id: u64) -> Result<(), SequencingError> {
        let mut workers = self.workers.write();
        if workers.contains_key(&source_id) {
            return Err(SequencingError::SourceAlreadyRegistered(source_id));
        }

        let (inbox, rx) = mpsc::channel(self.config.channel_capacity);
        let sequencer =
            GapSequencer::with_pending_warning(source_id, self.config.max_pending_per_source);
        let handle = tokio::spawn(run_source(
            self.kind,
            sequencer,
            rx,
            self.output.clone(),
            self.shutdown.clone(),
        ));
        workers.insert(source_id, SourceWorker { inbox, handle });

        info!(kind = %self.kind, source = source_id, "[qr-01] source registered");
        Ok(())
    }

    /// Stop the worker for `source_id` and drop everything it buffered.
    pub fn unregister_source(&self, source_id: u64) -> Result<(), SequencingError> {
        let worker = self
            .workers
            .write()
            .remove(&source_id)
            .ok_or(SequencingError::UnknownSource(source_id))?;
        worker.handle.abort();
        info!(kind = %self.kind, source = source_id, "[qr-01] source unregistered");
        Ok(())
    }

    /// Route `item` to its source's worker.
    pub async fn dispatch(&self, item: T) -> Result<(), SequencingError> {
        let source_id = item.source_id();
        let inbox = self
            .workers
            .read()
            .get(&source_id)
            .map(|worker| worker.inbox.clone())
            .ok_or(SequencingError::UnknownSource(source_id))?;
        inbox
            .send(item)
            .await
            .map_err(|_| SequencingError::SourceStopped(source_id))
    }

    pub fn is_registered(&self, source_id: u64) -> bool {
        self.workers.read().contains_key(&source_id)
    }

    /// Registered ids, ascending.
    pub fn sources(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.workers.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl<T: Sequenced> Drop for SequencerRegistry<T> {
    fn drop(&mut self) {
        for (_, worker) in self.workers.get_mut().drain() {
            worker.handle.abort();
        }
    }
}

async fn run_source<T: Sequenced>(
    kind: SourceKind,
    mut sequencer: GapSequencer<T>,
    mut inbox: mpsc::Receiver<T>,
    output: mpsc::Sender<T::Release>,
    mut shutdown: watch::Receiver<bool>,
) {
    let source = sequencer.source_id();
    loop {
        tokio::select! {
            maybe_item = inbox.recv() => {
                let Some(item) = maybe_item else { break };
                match sequencer.receive(item) {
                    Ok(released) => {
                        for release in released {
                            if output.send(release).await.is_err() {
                                debug!(%kind, source, "[qr-01] output closed, worker exiting");
                                return;
                            }
                        }
                    }
                    Err(
                        err @ (SequencingError::DuplicateSequence { .. }
                        | SequencingError::StaleSequence { .. }),
                    ) => {
                        debug!(%kind, source, error = %err, "[qr-01] dropped repeated item");
                    }
                    Err(err) => {
                        warn!(%kind, source, error = %err, "[qr-01] dropped malformed item");
                    }
                }
            }
            _ = shutdown.changed() => {
                break;
            }
        }
    }
    debug!(%kind, source, counter = sequencer.counter(), "[qr-01] sequencer worker stopped");
}
