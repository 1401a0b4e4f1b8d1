//! Liveness timers.
//!
//! Each stage owns one timer. Arming spawns a task that sleeps for the
//! liveness delay and then sends a [`TimerFired`] back into the stage's
//! select loop. Every arming gets a fresh generation, so a fire that raced a
//! cancellation is recognised as stale and ignored.

use shared_bus::LivenessStage;
use shared_types::{AtomicStatusSet, StatusFlag};
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Delivered to the owning stage when a timer expires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerFired<K> {
    pub key: K,
    generation: u64,
}

struct Armed<K> {
    key: K,
    generation: u64,
    handle: JoinHandle<()>,
}

pub struct LivenessTimer<K> {
    stage: LivenessStage,
    delay: Duration,
    fire_tx: mpsc::Sender<TimerFired<K>>,
    status: Arc<AtomicStatusSet>,
    generation: u64,
    armed: Option<Armed<K>>,
}

pub(crate) fn stage_flag(stage: LivenessStage) -> StatusFlag {
    match stage {
        LivenessStage::Paving => StatusFlag::Paving,
        LivenessStage::Gathering => StatusFlag::Gathering,
        LivenessStage::Appointing => StatusFlag::Appointing,
    }
}

impl<K> LivenessTimer<K>
where
    K: Clone + PartialEq + Debug + Send + 'static,
{
    pub fn new(
        stage: LivenessStage,
        delay: Duration,
        fire_tx: mpsc::Sender<TimerFired<K>>,
        status: Arc<AtomicStatusSet>,
    ) -> Self {
        Self {
            stage,
            delay,
            fire_tx,
            status,
            generation: 0,
            armed: None,
        }
    }

    /// Start the countdown for `key`. Re-arming with the key already
    /// counting down keeps the original deadline.
    pub fn arm(&mut self, key: K) {
        if self.armed.as_ref().is_some_and(|armed| armed.key == key) {
            return;
        }
        self.cancel();

        self.generation += 1;
        let generation = self.generation;
        let fire_tx = self.fire_tx.clone();
        let fired = TimerFired {
            key: key.clone(),
            generation,
        };
        let delay = self.delay;
        let stage = self.stage;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            trace!(?stage, "[qr-02] liveness timer fired");
            // The stage may already be gone during shutdown.
            let _ = fire_tx.send(fired).await;
        });

        self.status.on(stage_flag(self.stage));
        debug!(stage = ?self.stage, ?key, ?delay, "[qr-02] liveness timer armed");
        self.armed = Some(Armed {
            key,
            generation,
            handle,
        });
    }

    pub fn cancel(&mut self) {
        if let Some(armed) = self.armed.take() {
            armed.handle.abort();
            self.status.off(stage_flag(self.stage));
            trace!(stage = ?self.stage, key = ?armed.key, "[qr-02] liveness timer cancelled");
        }
    }

    /// Arm for `Some(key)`, cancel for `None`.
    pub fn sync(&mut self, key: Option<K>) {
        match key {
            Some(key) => self.arm(key),
            None => self.cancel(),
        }
    }

    /// Accept a fire if it belongs to the current arming.
    pub fn take_fired(&mut self, fired: &TimerFired<K>) -> bool {
        let current = self
            .armed
            .as_ref()
            .is_some_and(|armed| armed.generation == fired.generation);
        if current {
            self.armed = None;
            self.status.off(stage_flag(self.stage));
        }
        current
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }
}

impl<K> Drop for LivenessTimer<K> {
    fn drop(&mut self) {
        if let Some(armed) = self.armed.take() {
            armed.handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timer(
        delay_ms: u64,
    ) -> (
        LivenessTimer<u64>,
        mpsc::Receiver<TimerFired<u64>>,
        Arc<AtomicStatusSet>,
    ) {
        let (tx, rx) = mpsc::channel(8);
        let status = Arc::new(AtomicStatusSet::new());
        let timer = LivenessTimer::new(
            LivenessStage::Gathering,
            Duration::from_millis(delay_ms),
            tx,
            Arc::clone(&status),
        );
        (timer, rx, status)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_delay() {
        let (mut timer, mut rx, status) = timer(100);
        timer.arm(7);
        assert!(status.has(StatusFlag::Gathering));

        tokio::time::advance(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());

        let fired = rx.recv().await.unwrap();
        assert_eq!(fired.key, 7);
        assert!(timer.take_fired(&fired));
        assert!(!status.has(StatusFlag::Gathering));
        assert!(!timer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_fire() {
        let (mut timer, mut rx, status) = timer(100);
        timer.arm(1);
        timer.cancel();
        assert!(!status.has(StatusFlag::Gathering));

        tokio::time::advance(Duration::from_millis(200)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_same_key_keeps_deadline() {
        let (mut timer, mut rx, _status) = timer(100);
        timer.arm(1);
        tokio::time::advance(Duration::from_millis(60)).await;
        timer.arm(1);
        tokio::time::advance(Duration::from_millis(60)).await;
        let fired = rx.recv().await.unwrap();
        assert_eq!(fired.key, 1);
        assert!(timer.take_fired(&fired));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_fire_rejected() {
        let (mut timer, mut rx, _status) = timer(100);
        timer.arm(1);
        let stale = TimerFired {
            key: 1,
            generation: 1,
        };
        timer.arm(2);
        assert!(!timer.take_fired(&stale));

        let fired = rx.recv().await.unwrap();
        assert_eq!(fired.key, 2);
        assert!(timer.take_fired(&fired));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_none_cancels() {
        let (mut timer, _rx, status) = timer(100);
        timer.sync(Some(3));
        assert!(timer.is_armed());
        timer.sync(None);
        assert!(!timer.is_armed());
        assert!(!status.has(StatusFlag::Gathering));
    }
}
