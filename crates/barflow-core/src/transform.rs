use crate::error::PipelineError;
use barflow_data::MarketEvent;

/// A single-threaded, stateful per-event computation that a ProducerConsumer stage drives.
/// `TickToBarProcessor` and `IndicatorProcessor` are the two concrete implementations
/// (§4 components 4, 4.4).
pub trait Transform: Send {
    fn apply(&mut self, event: MarketEvent) -> Result<MarketEvent, PipelineError>;
}

pub struct ResampleTransform {
    processor: barflow_data::TickToBarProcessor,
}

impl ResampleTransform {
    pub fn new(processor: barflow_data::TickToBarProcessor) -> Self {
        Self { processor }
    }
}

impl Transform for ResampleTransform {
    fn apply(&mut self, event: MarketEvent) -> Result<MarketEvent, PipelineError> {
        Ok(self.processor.next(event)?)
    }
}
