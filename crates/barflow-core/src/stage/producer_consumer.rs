use super::item::{recv_batch, DemandConfig, StageItem};
use crate::error::PipelineFault;
use crate::transform::Transform;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Drives a `Transform` over a single upstream (§4.2's ProducerConsumer / ProcessorStage).
/// Pulls up to `demand.max_demand` items per cycle, applies the transform sequentially
/// (preserving order), and emits the results.
pub fn spawn_producer_consumer(
    mut rx: mpsc::Receiver<StageItem>,
    mut transform: Box<dyn Transform>,
    demand: DemandConfig,
    stage_name: String,
) -> (JoinHandle<()>, mpsc::Receiver<StageItem>) {
    let (tx, out_rx) = demand.channel();

    let handle = tokio::spawn(async move {
        debug!(stage = %stage_name, "producer-consumer stage started");
        loop {
            let batch = recv_batch(&mut rx, demand.max_demand).await;
            if batch.is_empty() {
                debug!(stage = %stage_name, "upstream drained, stopping");
                return;
            }
            for item in batch {
                match item {
                    Ok(event) => match transform.apply(event) {
                        Ok(out) => {
                            if tx.send(Ok(out)).await.is_err() {
                                debug!(stage = %stage_name, "last consumer cancelled, terminating immediately");
                                return;
                            }
                        }
                        Err(e) => {
                            error!(stage = %stage_name, error = %e, "transform failed, terminating abnormally");
                            let fault = PipelineFault::new(stage_name.clone(), e);
                            let _ = tx.send(Err(fault)).await;
                            return;
                        }
                    },
                    Err(fault) => {
                        let _ = tx.send(Err(fault)).await;
                        return;
                    }
                }
            }
        }
    });

    (handle, out_rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use barflow_data::MarketEvent;

    struct Passthrough;
    impl Transform for Passthrough {
        fn apply(&mut self, event: MarketEvent) -> Result<MarketEvent, PipelineError> {
            Ok(event)
        }
    }

    struct AlwaysFails;
    impl Transform for AlwaysFails {
        fn apply(&mut self, _event: MarketEvent) -> Result<MarketEvent, PipelineError> {
            Err(PipelineError::UnexpectedDataShape("x".to_string()))
        }
    }

    #[tokio::test]
    async fn forwards_events_and_stops_when_upstream_drains() {
        let (tx, rx) = DemandConfig::default().channel();
        tx.send(Ok(MarketEvent::new())).await.unwrap();
        drop(tx);

        let (handle, mut out_rx) = spawn_producer_consumer(rx, Box::new(Passthrough), DemandConfig::default(), "pc".to_string());
        assert!(out_rx.recv().await.unwrap().is_ok());
        assert!(out_rx.recv().await.is_none());
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn transform_failure_forwards_a_fault_then_stops() {
        let (tx, rx) = DemandConfig::default().channel();
        tx.send(Ok(MarketEvent::new())).await.unwrap();
        tx.send(Ok(MarketEvent::new())).await.unwrap();
        drop(tx);

        let (handle, mut out_rx) = spawn_producer_consumer(rx, Box::new(AlwaysFails), DemandConfig::default(), "pc".to_string());
        let first = out_rx.recv().await.unwrap();
        assert!(first.is_err());
        assert!(out_rx.recv().await.is_none());
        handle.await.unwrap();
    }
}
