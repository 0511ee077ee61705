//! The four stage roles of §4.2, each an independent cooperative task communicating over
//! bounded channels. See the module-level docs on each submodule for its termination rule.

mod aggregator;
mod broadcast;
mod item;
mod producer;
mod producer_consumer;

pub use aggregator::spawn_aggregator;
pub use broadcast::spawn_broadcast;
pub use item::{recv_batch, DemandConfig, StageItem};
pub use producer::spawn_producer;
pub use producer_consumer::spawn_producer_consumer;
