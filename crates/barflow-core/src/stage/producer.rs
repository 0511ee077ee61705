use super::item::{DemandConfig, StageItem};
use crate::error::PipelineFault;
use barflow_data::{DataFeed, FeedItem, MarketEvent};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Wraps a `DataFeed` as the source stage of a pipeline (§4.2's Producer / DataFeedStage).
/// Pulls one item per cycle, wraps it as a `MarketEvent` under `stream_name`, and emits it.
/// Exhaustion is normal termination; a feed error is an abnormal one.
pub fn spawn_producer(mut feed: Box<dyn DataFeed>, stream_name: String, demand: DemandConfig) -> (JoinHandle<()>, mpsc::Receiver<StageItem>) {
    let (tx, rx) = demand.channel();
    let stage_name = format!("producer:{stream_name}");

    let handle = tokio::spawn(async move {
        debug!(stage = %stage_name, "producer stage started");
        loop {
            match feed.next_item().await {
                Ok(None) => {
                    info!(stage = %stage_name, "feed exhausted, draining and stopping");
                    break;
                }
                Ok(Some(FeedItem::Tick(tick))) => {
                    let event = MarketEvent::from_feed(stream_name.clone(), tick, tick.time);
                    if tx.send(Ok(event)).await.is_err() {
                        debug!(stage = %stage_name, "last consumer cancelled, terminating immediately");
                        return;
                    }
                }
                Ok(Some(FeedItem::Bar(bar))) => {
                    let event = MarketEvent::from_feed(stream_name.clone(), bar, bar.time);
                    if tx.send(Ok(event)).await.is_err() {
                        debug!(stage = %stage_name, "last consumer cancelled, terminating immediately");
                        return;
                    }
                }
                Err(e) => {
                    error!(stage = %stage_name, error = %e, "feed error, terminating abnormally");
                    let fault = PipelineFault::new(stage_name.clone(), crate::error::PipelineError::Feed(e.to_string()));
                    let _ = tx.send(Err(fault)).await;
                    return;
                }
            }
        }
    });

    (handle, rx)
}
