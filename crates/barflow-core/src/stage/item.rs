use crate::error::PipelineFault;
use barflow_data::MarketEvent;
use tokio::sync::mpsc;

/// The payload of every inter-stage channel. `Err` carries the first abnormal termination
/// observed anywhere upstream; every stage forwards it unchanged and then stops (§7).
pub type StageItem = Result<MarketEvent, PipelineFault>;

/// Demand window for a subscription: a stage pulls at most `max_demand` items per cycle
/// (one blocking recv, then non-blocking try_recv up to the rest) and its channel holds at
/// most `buffer_size` pending items.
#[derive(Debug, Clone, Copy)]
pub struct DemandConfig {
    pub max_demand: usize,
    pub buffer_size: usize,
}

impl Default for DemandConfig {
    fn default() -> Self {
        Self {
            max_demand: 10,
            buffer_size: 10_000,
        }
    }
}

impl DemandConfig {
    pub fn channel(&self) -> (mpsc::Sender<StageItem>, mpsc::Receiver<StageItem>) {
        mpsc::channel(self.buffer_size)
    }
}

/// Pull up to `max_demand` items from `rx`: one blocking `recv`, then non-blocking `try_recv`
/// for the rest. An empty result means the channel is closed and drained.
pub async fn recv_batch(rx: &mut mpsc::Receiver<StageItem>, max_demand: usize) -> Vec<StageItem> {
    let mut batch = Vec::with_capacity(max_demand.max(1));
    match rx.recv().await {
        None => return batch,
        Some(item) => batch.push(item),
    }
    while batch.len() < max_demand {
        match rx.try_recv() {
            Ok(item) => batch.push(item),
            Err(_) => break,
        }
    }
    batch
}
