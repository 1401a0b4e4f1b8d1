//! # Certification to Graph Engine Flows
//!
//! One replica's certification pipeline feeding its graph engine, with the
//! replica logs supplied by hand so every interleaving is exact.
//!
//! ## Flows Tested:
//!
//! 1. **Identical logs**: the execution order equals the shared log order
//! 2. **Majority disagreement**: the minority replica's order is outvoted
//! 3. **Condorcet cycle**: A→B→C→A collapses into one hash-ordered unit
//! 4. **Consecutive batches**: batches are ordered strictly by sequence

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    use shared_bus::{EventFilter, EventPublisher, EventTopic, InMemoryEventBus, OrderingEvent};
    use shared_types::{OrderedBatch, OrderedLogEntry, ReplicaId, TxHash};

    use qr_02_certification::{CertificationApi, CertificationConfig, Pipeline};
    use qr_03_graph_engine::{EngineConfig, EngineHandle, GraphEngine};

    // =========================================================================
    // TEST FIXTURES
    // =========================================================================

    struct Harness {
        pipeline: Arc<Pipeline>,
        events: shared_bus::Subscription,
        engine: EngineHandle,
    }

    impl Harness {
        fn start(replica_count: usize, batch_capacity: usize) -> Self {
            let bus = Arc::new(InMemoryEventBus::new());
            let events = bus.subscribe(EventFilter::topics(vec![EventTopic::Engine]));
            let publisher: Arc<dyn EventPublisher> = bus;
            let (graph_tx, graph_rx) = mpsc::channel(16);

            let config = CertificationConfig {
                replica_count,
                batch_capacity,
                ..CertificationConfig::default()
            };
            let pipeline = Arc::new(
                Pipeline::new(1, config, Arc::clone(&publisher), graph_tx).unwrap(),
            );
            let engine = EngineHandle::new(
                GraphEngine::new(1, EngineConfig::default()),
                graph_rx,
                publisher,
            );
            engine.start().unwrap();
            pipeline.start().unwrap();

            Self {
                pipeline,
                events,
                engine,
            }
        }

        /// Submit `hashes` as replica `replica`'s log, sequences from 1.
        async fn log(&self, replica: ReplicaId, hashes: &[&str]) {
            for (index, hash) in hashes.iter().enumerate() {
                let sequence = index as u64 + 1;
                let entry = OrderedLogEntry {
                    replica_id: replica,
                    sequence,
                    tx_hash: TxHash::from(*hash),
                    timestamp: sequence,
                };
                self.pipeline.submit(replica, entry).await.unwrap();
            }
        }

        async fn next_ordered(&mut self) -> OrderedBatch {
            let event = timeout(Duration::from_secs(5), self.events.recv())
                .await
                .expect("timeout waiting for ordered batch")
                .expect("bus closed");
            match event {
                OrderingEvent::BatchOrdered { batch, .. } => batch,
                other => panic!("Expected BatchOrdered, got {:?}", other),
            }
        }

        fn stop(&self) {
            self.pipeline.stop();
            self.engine.stop();
        }
    }

    fn hashes(names: &[&str]) -> Vec<TxHash> {
        names.iter().map(|name| TxHash::from(*name)).collect()
    }

    // =========================================================================
    // INTEGRATION TESTS
    // =========================================================================

    #[tokio::test]
    async fn test_identical_logs_keep_log_order() {
        let mut harness = Harness::start(4, 5);
        // Deliberately not in hash order.
        let log = ["t5", "t3", "t1", "t4", "t2"];
        for replica in 1..=4 {
            harness.log(replica, &log).await;
        }

        let batch = harness.next_ordered().await;
        assert_eq!(batch.batch_seq, 1);
        assert_eq!(batch.order, hashes(&log));
        assert!(batch.collapsed.is_empty());
        harness.stop();
    }

    #[tokio::test]
    async fn test_minority_order_outvoted() {
        let mut harness = Harness::start(4, 2);
        for replica in 1..=3 {
            harness.log(replica, &["y", "x"]).await;
        }
        harness.log(4, &["x", "y"]).await;

        let batch = harness.next_ordered().await;
        assert_eq!(batch.order, hashes(&["y", "x"]));
        harness.stop();
    }

    #[tokio::test]
    async fn test_condorcet_cycle_collapses() {
        // N = 3: every pair is won 2-1, and the wins form a cycle.
        let mut harness = Harness::start(3, 3);
        harness.log(1, &["a", "b", "c"]).await;
        harness.log(2, &["b", "c", "a"]).await;
        harness.log(3, &["c", "a", "b"]).await;

        let batch = harness.next_ordered().await;
        assert_eq!(batch.order, hashes(&["a", "b", "c"]));
        assert_eq!(batch.collapsed, vec![hashes(&["a", "b", "c"])]);
        harness.stop();
    }

    #[tokio::test]
    async fn test_consecutive_batches_in_sequence() {
        let mut harness = Harness::start(4, 2);
        let log = ["p", "q", "r", "s"];
        for replica in 1..=4 {
            harness.log(replica, &log).await;
        }

        let first = harness.next_ordered().await;
        let second = harness.next_ordered().await;
        assert_eq!((first.batch_seq, second.batch_seq), (1, 2));
        assert_eq!(first.order, hashes(&["p", "q"]));
        assert_eq!(second.order, hashes(&["r", "s"]));
        harness.stop();
    }
}
