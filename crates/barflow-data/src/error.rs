use thiserror::Error;

/// Fatal errors raised by the tick-to-bar resampler (§4.3). Both are fatal to the stage that
/// raised them — no retry.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ResampleError {
    #[error("tick under stream `{0}` has neither bid nor ask price")]
    MissingPrice(String),

    #[error("expected a Tick under stream `{0}`, found something else")]
    UnexpectedDataShape(String),
}

/// Errors raised by the lazy temporal-lookup helpers on [`crate::event::MarketEvent`] (§4.4).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LookupError {
    #[error("stream `{0}` is not present in this event")]
    UnknownStream(String),

    #[error("cannot resolve `{field}` for stream `{stream}`: value is not a Tick, Bar, or chained IndicatorValue")]
    Unresolvable { stream: String, field: &'static str },
}

/// Errors raised by a concrete [`crate::feed::DataFeed`] implementation.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("io error reading feed: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error reading feed: {0}")]
    Csv(#[from] csv::Error),

    #[error("could not parse feed row: {0}")]
    Parse(String),
}
