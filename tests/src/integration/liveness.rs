//! # Liveness Under a Straggler
//!
//! One replica's log entries never leave it. The others must notice the
//! hole through the paving timer, suspect the straggler, and keep ordering
//! with the remaining quorum.
//!
//! Time is paused: the runtime jumps straight to each liveness deadline once
//! every task is idle.

#[cfg(test)]
mod tests {
    use std::time::Duration;
    use tokio::time::timeout;

    use relay_node::{Cluster, NodeConfig, Suspicion};
    use shared_bus::{EventFilter, EventTopic, LivenessStage, OrderingEvent};
    use shared_types::TxHash;

    fn config() -> NodeConfig {
        NodeConfig {
            replica_count: 4,
            batch_capacity: 5,
            channel_capacity: 256,
            ..NodeConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_muted_replica_suspected_and_bypassed() {
        let cluster = Cluster::spawn(config()).unwrap();
        let mut liveness = cluster
            .bus()
            .subscribe(EventFilter::topics(vec![EventTopic::Liveness]));
        cluster.network().mute(4);

        let proposed = cluster.drive_clients(1, 5).await.unwrap();

        for id in 1..=3 {
            let replica = cluster.replica(id).unwrap();
            timeout(Duration::from_secs(120), replica.wait_for_batches(1))
                .await
                .expect("timeout waiting for quorum ordering")
                .unwrap();
            let ordered = replica.ordered();
            assert_eq!(ordered[0].1, proposed);
        }

        let (suspect, stage) = timeout(Duration::from_secs(5), async {
            loop {
                match liveness.recv().await {
                    Some(OrderingEvent::ReplicaSuspected { suspect, stage, .. }) => {
                        break (suspect, stage)
                    }
                    Some(_) => continue,
                    None => panic!("bus closed"),
                }
            }
        })
        .await
        .expect("timeout waiting for suspicion");
        assert_eq!(suspect, 4);
        assert_eq!(stage, LivenessStage::Paving);

        // Suspicions reach the transport, and only the straggler is named.
        let reported = Suspicion {
            reporter: Some(1),
            suspect: 4,
        };
        timeout(Duration::from_secs(5), async {
            while !cluster.network().suspicions().contains(&reported) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("timeout waiting for transport suspicion");
        assert!(cluster
            .network()
            .suspicions()
            .iter()
            .all(|suspicion| suspicion.suspect == 4));
        cluster.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_suspicion_without_straggler() {
        let cluster = Cluster::spawn(config()).unwrap();
        let mut liveness = cluster
            .bus()
            .subscribe(EventFilter::topics(vec![EventTopic::Liveness]));

        let proposed = cluster.drive_clients(1, 5).await.unwrap();
        timeout(Duration::from_secs(120), cluster.wait_for_batches(1))
            .await
            .expect("timeout")
            .unwrap();

        let agreed = cluster.agreed_order().unwrap();
        let ordered: Vec<TxHash> = agreed[0].1.clone();
        assert_eq!(ordered, proposed);
        assert!(liveness.try_recv().unwrap().is_none());
        assert!(cluster.network().suspicions().is_empty());
        cluster.shutdown().await;
    }
}
