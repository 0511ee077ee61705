use barflow_data::{LookupError, ResampleError};
use thiserror::Error;

/// The full error taxonomy of the pipeline: configuration errors raised eagerly by the
/// builder, and runtime data errors raised by a running stage.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PipelineError {
    // -- configuration errors, raised eagerly by PipelineBuilder --
    #[error("stream() called with no data feed registered")]
    NoFeed,

    #[error("only one data feed is supported; a feed is already registered")]
    DuplicateFeed,

    #[error("invalid timeframe: {0}")]
    InvalidTimeframe(String),

    #[error("unknown stream `{0}`")]
    UnknownStream(String),

    #[error("duplicate stream name `{0}`")]
    DuplicateName(String),

    #[error("add_indicators_layer called with an empty list of indicators")]
    EmptyLayer,

    #[error("missing required option `{0}`")]
    MissingRequiredOption(String),

    // -- runtime data errors, abnormally terminate the raising stage --
    #[error("expected a different data shape for stream `{0}`")]
    UnexpectedDataShape(String),

    #[error("tick has neither bid nor ask price for stream `{0}`")]
    MissingPrice(String),

    #[error("indicator `{0}` failed: {1}")]
    IndicatorFailed(String, String),

    #[error("resample error: {0}")]
    Resample(#[from] ResampleError),

    #[error("lookup error: {0}")]
    Lookup(#[from] LookupError),

    #[error("feed error: {0}")]
    Feed(String),
}

/// Carries the stage that raised `error`, so a fault can be logged and surfaced with
/// provenance as it propagates downstream through the stage graph.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("stage `{stage}` terminated abnormally: {error}")]
pub struct PipelineFault {
    pub stage: String,
    pub error: PipelineError,
}

impl PipelineFault {
    pub fn new(stage: impl Into<String>, error: PipelineError) -> Self {
        Self {
            stage: stage.into(),
            error,
        }
    }
}
