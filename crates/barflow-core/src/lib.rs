//! The stage runtime, indicator adaptor, and topology builder that turn `barflow-data`'s
//! primitives into a running, backpressure-aware streaming pipeline.

pub mod error;
pub mod indicator;
pub mod indicators;
pub mod stage;
pub mod strategy;
pub mod topology;
pub mod transform;

pub use error::{PipelineError, PipelineFault};
pub use indicator::{Indicator, IndicatorModule, IndicatorProcessor};
pub use indicators::{EmaModule, RsiModule, SmaModule};
pub use stage::{DemandConfig, StageItem};
pub use strategy::{BalanceSpec, CommissionSpec, StrategySpec};
pub use topology::{IndicatorRequest, PipelineBuilder, PipelineStream, ResampleRequest};
pub use transform::{ResampleTransform, Transform};
