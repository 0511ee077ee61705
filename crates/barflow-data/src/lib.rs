//! Market-data primitives: ticks, bars, timeframes, the heterogeneous event map, the
//! tick-to-bar resampler, and feed sources. This crate has no knowledge of the stage
//! runtime or topology that drives it — see `barflow-core` for that.

pub mod bar;
pub mod error;
pub mod event;
pub mod feed;
pub mod resample;
pub mod tick;
pub mod timeframe;

pub use bar::Bar;
pub use error::{FeedError, LookupError, ResampleError};
pub use event::{ExchangeData, Field, IndicatorValue, MarketEvent, Value};
pub use feed::{CsvTickFeed, DataFeed, FeedItem, InMemoryFeed};
pub use resample::{PriceType, ResampleOptions, TickToBarProcessor};
pub use tick::Tick;
pub use timeframe::{crosses_market_open, Timeframe, Unit};
