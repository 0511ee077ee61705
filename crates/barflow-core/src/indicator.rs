use crate::error::PipelineError;
use crate::transform::Transform;
use barflow_data::{IndicatorValue, MarketEvent};

/// A stateful, single-value computation over the event map (§4.4). An `Indicator` reads
/// whatever it needs from `event` — typically via the lazy lookup helpers on `MarketEvent`
/// (`extract_value`, `new_bar`, `extract_time`) — and produces one derived value per call.
///
/// Unlike the teacher's `Indicator` trait, this one is not generic over `Input`/`Output`:
/// every indicator here reads from the same `MarketEvent` map and produces `f64`, so a
/// concrete, non-generic trait is the better fit (§9's "model as a single polymorphic
/// capability").
pub trait Indicator: Send {
    fn next(&mut self, event: &MarketEvent) -> Result<IndicatorValue, PipelineError>;
}

/// A factory for one `Indicator` implementation, analogous to the teacher's
/// `IndicatorFactory` but carrying indicator-specific options on the concrete module struct
/// rather than a shared options bag (§9's "keyword/positional options" redesign guidance).
pub trait IndicatorModule {
    /// A short, stable identifier this module is known by (used for default name generation,
    /// snake_cased by the builder).
    fn identifier(&self) -> &str;

    /// Build the running `Indicator` instance for one pipeline position. `data` is the
    /// upstream stream name the instance should read from.
    fn init(&self, data: String) -> Result<Box<dyn Indicator>, PipelineError>;
}

/// Adapts one `Indicator` instance into the `Transform` a ProducerConsumer stage drives:
/// on each event, runs the indicator and writes its output under `output_name`, then
/// forwards the (extended) event (§4.4's `IndicatorProcessor`).
pub struct IndicatorProcessor {
    identifier: String,
    output_name: String,
    indicator: Box<dyn Indicator>,
}

impl IndicatorProcessor {
    pub fn new(identifier: impl Into<String>, output_name: impl Into<String>, indicator: Box<dyn Indicator>) -> Self {
        Self {
            identifier: identifier.into(),
            output_name: output_name.into(),
            indicator,
        }
    }
}

impl Transform for IndicatorProcessor {
    fn apply(&mut self, mut event: MarketEvent) -> Result<MarketEvent, PipelineError> {
        let value = self
            .indicator
            .next(&event)
            .map_err(|e| PipelineError::IndicatorFailed(self.identifier.clone(), e.to_string()))?;
        event.insert(self.output_name.clone(), value);
        Ok(event)
    }
}
