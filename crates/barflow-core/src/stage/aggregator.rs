use super::item::StageItem;
use barflow_data::MarketEvent;
use futures::future::{select_all, BoxFuture};
use std::collections::VecDeque;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Synchronises N upstream branches into one downstream (§4.2's Aggregator / AggregatorStage).
/// Maintains one FIFO queue per upstream; emits the k-th synchronised event — the
/// left-to-right shallow merge of the k-th event from every branch, in ascending index
/// order — only once every queue holds at least `k+1` items. When a branch closes, the
/// aggregator keeps draining whatever full tuples the remaining depths still allow, then
/// terminates normally once every branch has closed (§8's aggregator synchronisation
/// property: exactly `min(|B1|, .., |Bn|)` merged events).
pub fn spawn_aggregator(rxs: Vec<mpsc::Receiver<StageItem>>, buffer_size: usize, stage_name: String) -> (JoinHandle<()>, mpsc::Receiver<StageItem>) {
    let n = rxs.len();
    let (tx, out_rx) = mpsc::channel(buffer_size);

    let handle = tokio::spawn(async move {
        debug!(stage = %stage_name, branches = n, "aggregator stage started");
        let mut queues: Vec<VecDeque<MarketEvent>> = (0..n).map(|_| VecDeque::new()).collect();
        let mut closed = vec![false; n];
        let mut rxs: Vec<Option<mpsc::Receiver<StageItem>>> = rxs.into_iter().map(Some).collect();

        loop {
            while queues.iter().all(|q| !q.is_empty()) {
                let mut merged: Option<MarketEvent> = None;
                for queue in queues.iter_mut() {
                    let event = queue.pop_front().expect("checked non-empty above");
                    match merged.as_mut() {
                        None => merged = Some(event),
                        Some(m) => m.merge_from(&event),
                    }
                }
                if tx.send(Ok(merged.expect("n >= 1"))).await.is_err() {
                    debug!(stage = %stage_name, "last consumer cancelled, terminating immediately");
                    return;
                }
            }

            if closed.iter().all(|&c| c) {
                debug!(stage = %stage_name, "all branches drained, stopping");
                return;
            }

            let futs: Vec<BoxFuture<'_, (usize, Option<StageItem>)>> = rxs
                .iter_mut()
                .enumerate()
                .filter(|(i, _)| !closed[*i])
                .map(|(i, slot)| {
                    let rx = slot.as_mut().expect("open branch always has its receiver");
                    Box::pin(async move { (i, rx.recv().await) }) as BoxFuture<'_, (usize, Option<StageItem>)>
                })
                .collect();
            let ((idx, item), _, _) = select_all(futs).await;

            match item {
                None => {
                    closed[idx] = true;
                    rxs[idx] = None;
                }
                Some(Ok(event)) => queues[idx].push_back(event),
                Some(Err(fault)) => {
                    let _ = tx.send(Err(fault)).await;
                    return;
                }
            }
        }
    });

    (handle, out_rx)
}
