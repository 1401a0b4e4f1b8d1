//! Graph engine worker: drains finalized graphs from graphing.

use crate::application::service::GraphEngine;
use shared_bus::{EventPublisher, OrderingEvent};
use shared_types::FinalizedGraph;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info};

pub async fn run_engine(
    mut engine: GraphEngine,
    mut graphs: mpsc::Receiver<FinalizedGraph>,
    bus: Arc<dyn EventPublisher>,
    mut shutdown: watch::Receiver<bool>,
) {
    let node = engine.node();
    info!(node, "[qr-03] graph engine started");
    loop {
        tokio::select! {
            maybe_graph = graphs.recv() => {
                let Some(graph) = maybe_graph else { break };
                let batch_seq = graph.batch_seq;
                match engine.accept(graph) {
                    Ok(ordered) => {
                        for batch in ordered {
                            bus.publish(OrderingEvent::BatchOrdered { node, batch }).await;
                        }
                    }
                    Err(err) => {
                        error!(node, batch_seq, error = %err, "[qr-03] finalized graph rejected");
                    }
                }
            }
            _ = shutdown.changed() => break,
        }
    }
    debug!(node, next = engine.next_seq(), "[qr-03] graph engine stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use shared_bus::{EventFilter, EventTopic, InMemoryEventBus};
    use shared_types::{PriorityEdge, TxHash};
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_worker_publishes_ordered_batches() {
        let bus = Arc::new(InMemoryEventBus::new());
        let mut events = bus.subscribe(EventFilter::topics(vec![EventTopic::Engine]));
        let (graph_tx, graph_rx) = mpsc::channel(8);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(run_engine(
            GraphEngine::new(3, EngineConfig::default()),
            graph_rx,
            bus.clone(),
            shutdown_rx,
        ));

        graph_tx
            .send(FinalizedGraph {
                batch_seq: 1,
                members: [TxHash::from("a"), TxHash::from("b")].into_iter().collect(),
                edges: vec![PriorityEdge::new("b".into(), "a".into())],
            })
            .await
            .unwrap();

        let event = timeout(Duration::from_secs(1), events.recv())
            .await
            .expect("timeout")
            .expect("bus closed");
        match event {
            OrderingEvent::BatchOrdered { node, batch } => {
                assert_eq!(node, 3);
                assert_eq!(batch.order, vec![TxHash::from("b"), TxHash::from("a")]);
            }
            other => panic!("unexpected event {other:?}"),
        }

        shutdown_tx.send(true).unwrap();
        timeout(Duration::from_secs(1), handle)
            .await
            .expect("worker did not stop")
            .unwrap();
    }
}
