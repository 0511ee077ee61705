use super::item::{DemandConfig, StageItem};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Fans one upstream out to N downstream consumers (§4.2's Broadcast / BroadcastStage).
/// Every event is enqueued once per consumer; demand is min-reduced across consumers by
/// awaiting every send before pulling the next upstream item, so a slow consumer throttles
/// the whole fan-out. A consumer whose receiver has dropped is removed from the fan-out; the
/// stage itself terminates once every consumer is gone (no audience left).
pub fn spawn_broadcast(mut rx: mpsc::Receiver<StageItem>, fanout: usize, demand: DemandConfig, stage_name: String) -> (JoinHandle<()>, Vec<mpsc::Receiver<StageItem>>) {
    let mut txs = Vec::with_capacity(fanout);
    let mut rxs = Vec::with_capacity(fanout);
    for _ in 0..fanout {
        let (tx, rx) = demand.channel();
        txs.push(tx);
        rxs.push(rx);
    }

    let handle = tokio::spawn(async move {
        debug!(stage = %stage_name, fanout, "broadcast stage started");
        loop {
            let item = match rx.recv().await {
                None => {
                    debug!(stage = %stage_name, "upstream drained, stopping");
                    break;
                }
                Some(item) => item,
            };
            let is_fault = item.is_err();

            let mut next_txs = Vec::with_capacity(txs.len());
            for tx in txs {
                if tx.send(item.clone()).await.is_ok() {
                    next_txs.push(tx);
                }
            }
            txs = next_txs;

            if is_fault {
                break;
            }
            if txs.is_empty() {
                debug!(stage = %stage_name, "last consumer cancelled, terminating immediately");
                break;
            }
        }
    });

    (handle, rxs)
}
