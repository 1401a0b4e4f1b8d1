//! # End-to-End Ordering
//!
//! Full clusters over the loopback network: clients propose, replicas
//! sequence, certify and linearise, and every replica must agree.

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::time::Duration;
    use tokio::time::timeout;

    use qr_01_sequencing::TransactionStore;
    use relay_node::{Cluster, NodeConfig};
    use shared_bus::{EventFilter, EventTopic, OrderingEvent};
    use shared_types::{StatusFlag, TxHash};

    // =========================================================================
    // TEST FIXTURES
    // =========================================================================

    fn config(replica_count: usize, jitter_ms: u64) -> NodeConfig {
        NodeConfig {
            replica_count,
            batch_capacity: 5,
            channel_capacity: 256,
            jitter: Duration::from_millis(jitter_ms),
            ..NodeConfig::default()
        }
    }

    async fn wait(cluster: &Cluster, batches: u64) {
        timeout(Duration::from_secs(20), cluster.wait_for_batches(batches))
            .await
            .expect("timeout waiting for batches")
            .expect("replica stopped");
    }

    // =========================================================================
    // INTEGRATION TESTS
    // =========================================================================

    #[tokio::test]
    async fn test_single_client_order_preserved() {
        let cluster = Cluster::spawn(config(4, 0)).unwrap();
        let proposed = cluster.drive_clients(1, 10).await.unwrap();
        wait(&cluster, 2).await;

        let agreed = cluster.agreed_order().unwrap();
        let flat: Vec<TxHash> = agreed.iter().flat_map(|(_, order)| order.clone()).collect();
        assert_eq!(flat, proposed);
        assert_eq!(cluster.store().len(), 10);
        cluster.shutdown().await;
    }

    #[tokio::test]
    async fn test_seven_replicas_agree() {
        let cluster = Cluster::spawn(config(7, 0)).unwrap();
        let proposed = cluster.drive_clients(1, 5).await.unwrap();
        wait(&cluster, 1).await;

        let agreed = cluster.agreed_order().unwrap();
        assert_eq!(agreed.len(), 1);
        assert_eq!(agreed[0].1, proposed);
        cluster.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_clients_with_jitter_agree() {
        let cluster = Cluster::spawn(config(4, 3)).unwrap();
        let proposed = cluster.drive_clients(3, 5).await.unwrap();
        assert_eq!(proposed.len(), 15);
        wait(&cluster, 3).await;

        // Every replica ordered the same three batches.
        let agreed = cluster.agreed_order().unwrap();
        assert_eq!(agreed.len(), 3);
        for (index, (batch_seq, order)) in agreed.iter().enumerate() {
            assert_eq!(*batch_seq, index as u64 + 1);
            assert_eq!(order.len(), 5);
        }

        // Each proposed transaction is ordered exactly once.
        let ordered: Vec<TxHash> = agreed.iter().flat_map(|(_, order)| order.clone()).collect();
        let unique: BTreeSet<TxHash> = ordered.iter().cloned().collect();
        assert_eq!(unique.len(), ordered.len());
        assert_eq!(unique, proposed.into_iter().collect::<BTreeSet<_>>());
        cluster.shutdown().await;
    }

    #[tokio::test]
    async fn test_bus_reports_every_ordered_batch() {
        let cluster = Cluster::spawn(config(4, 0)).unwrap();
        let mut events = cluster
            .bus()
            .subscribe(EventFilter::topics(vec![EventTopic::Engine]));

        cluster.drive_clients(2, 5).await.unwrap();
        wait(&cluster, 2).await;

        let mut seen = BTreeSet::new();
        for _ in 0..8 {
            let event = timeout(Duration::from_secs(5), events.recv())
                .await
                .expect("timeout waiting for event")
                .expect("bus closed");
            match event {
                OrderingEvent::BatchOrdered { node, batch } => {
                    assert!(seen.insert((node, batch.batch_seq)));
                }
                other => panic!("Expected BatchOrdered, got {:?}", other),
            }
        }
        // Two batches on each of the four replicas.
        assert_eq!(seen.len(), 8);
        cluster.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_marks_pipelines_stopping() {
        let cluster = Cluster::spawn(config(4, 0)).unwrap();
        for replica in cluster.replicas() {
            assert!(replica.status().has(StatusFlag::Running));
        }
        cluster.shutdown().await;
        for replica in cluster.replicas() {
            assert!(replica.status().has(StatusFlag::Stopping));
        }
    }
}
