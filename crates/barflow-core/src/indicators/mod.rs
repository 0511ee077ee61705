//! Three worked-example `Indicator`/`IndicatorModule` implementations (§4.4, §9's "Three
//! concrete indicators" supplement), adapted from the teacher's `BarData`-input indicators
//! into ones that read `Field::Close` off a `MarketEvent` stream via the lazy lookup helpers.

mod ema;
mod rsi;
mod sma;

pub use ema::EmaModule;
pub use rsi::RsiModule;
pub use sma::SmaModule;
