//! The tick-to-bar resampler state machine (§4.3) — the most algorithmically dense
//! transformation in the pipeline.

use crate::bar::Bar;
use crate::error::ResampleError;
use crate::event::{MarketEvent, Value};
use crate::tick::Tick;
use crate::timeframe::{crosses_market_open, Timeframe, Unit};
use chrono::{DateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// Which side of the quote to resample from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceType {
    Mid,
    Bid,
    Ask,
}

/// Configuration for one [`TickToBarProcessor`] (§4.3).
#[derive(Debug, Clone)]
pub struct ResampleOptions {
    /// Name of the stream carrying the input Ticks.
    pub data: String,
    /// Name to publish the output Bar under (may equal `data`).
    pub name: String,
    pub timeframe: Timeframe,
    pub price_type: PriceType,
    /// When true, a tick with no volume on either side counts as volume 1.0.
    pub fake_volume: bool,
    pub market_open: NaiveTime,
    pub weekly_open: Weekday,
}

impl ResampleOptions {
    pub fn new(data: impl Into<String>, name: impl Into<String>, timeframe: Timeframe) -> Self {
        Self {
            data: data.into(),
            name: name.into(),
            timeframe,
            price_type: PriceType::Mid,
            fake_volume: false,
            market_open: NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
            weekly_open: Weekday::Mon,
        }
    }

    pub fn price_type(mut self, price_type: PriceType) -> Self {
        self.price_type = price_type;
        self
    }

    pub fn fake_volume(mut self, fake_volume: bool) -> Self {
        self.fake_volume = fake_volume;
        self
    }

    pub fn market_open(mut self, market_open: NaiveTime) -> Self {
        self.market_open = market_open;
        self
    }

    pub fn weekly_open(mut self, weekly_open: Weekday) -> Self {
        self.weekly_open = weekly_open;
        self
    }
}

#[derive(Debug, Clone)]
struct ResamplerState {
    current_bar: Option<Bar>,
    next_time: Option<DateTime<Utc>>,
    tick_counter: u32,
}

impl ResamplerState {
    fn new() -> Self {
        Self {
            current_bar: None,
            next_time: None,
            tick_counter: 0,
        }
    }
}

/// Absorbs one tick per [`TickToBarProcessor::next`] call, accumulating it into the bar for
/// its period and emitting the updated bar under `options.name`. One instance backs exactly
/// one `ProducerConsumer` stage (§4.2/§4.3) — it is single-threaded and needs no locking.
pub struct TickToBarProcessor {
    options: ResampleOptions,
    state: ResamplerState,
}

impl TickToBarProcessor {
    pub fn new(options: ResampleOptions) -> Self {
        Self {
            options,
            state: ResamplerState::new(),
        }
    }

    fn extract_price(&self, tick: &Tick) -> Result<f64, ResampleError> {
        match self.options.price_type {
            PriceType::Ask => tick.ask.ok_or_else(|| ResampleError::MissingPrice(self.options.data.clone())),
            PriceType::Bid => tick.bid.ok_or_else(|| ResampleError::MissingPrice(self.options.data.clone())),
            PriceType::Mid => tick.mid().ok_or_else(|| ResampleError::MissingPrice(self.options.data.clone())),
        }
    }

    fn extract_volume(&self, tick: &Tick) -> Option<f64> {
        match tick.combined_volume() {
            Some(v) => Some(v),
            None if self.options.fake_volume => Some(1.0),
            None => None,
        }
    }

    fn starts_new_bar(&self, tick: &Tick) -> bool {
        match self.options.timeframe.unit {
            Unit::Tick => {
                let Some(current) = &self.state.current_bar else {
                    return true;
                };
                self.state.tick_counter >= self.options.timeframe.mult
                    || crosses_market_open(current.time, tick.time, self.options.market_open)
            }
            _ => match self.state.next_time {
                None => true,
                Some(next_time) => tick.time >= next_time,
            },
        }
    }

    /// Absorb `tick` (read from `self.options.data` within `event`) and publish the resulting
    /// bar under `self.options.name`, returning the (possibly mutated) event.
    pub fn next(&mut self, mut event: MarketEvent) -> Result<MarketEvent, ResampleError> {
        let tick = match event.get(&self.options.data) {
            Some(Value::Tick(tick)) => *tick,
            Some(_) => return Err(ResampleError::UnexpectedDataShape(self.options.data.clone())),
            None => return Err(ResampleError::UnexpectedDataShape(self.options.data.clone())),
        };

        let price = self.extract_price(&tick)?;
        let volume = self.extract_volume(&tick);

        let bar = if self.starts_new_bar(&tick) {
            let (open_time, new_market) = match self.options.timeframe.unit {
                Unit::Tick => {
                    let new_market = self
                        .state
                        .current_bar
                        .as_ref()
                        .map(|b| crosses_market_open(b.time, tick.time, self.options.market_open))
                        .unwrap_or(false);
                    self.state.tick_counter = 1;
                    (tick.time, new_market)
                }
                _ => {
                    let aligned = self.options.timeframe.align(tick.time, self.options.market_open, self.options.weekly_open);
                    let previous_open = self.state.current_bar.as_ref().map(|b| b.time);
                    let new_market = previous_open
                        .map(|prev| crosses_market_open(prev, aligned, self.options.market_open))
                        .unwrap_or(false);
                    self.state.next_time = Some(self.options.timeframe.calc_next(aligned, self.options.market_open));
                    (aligned, new_market)
                }
            };
            Bar::opening(open_time, price, volume, new_market)
        } else {
            if matches!(self.options.timeframe.unit, Unit::Tick) {
                self.state.tick_counter += 1;
            }
            let mut bar = self.state.current_bar.expect("starts_new_bar(false) implies a current bar exists");
            bar.update(price, volume);
            bar
        };

        self.state.current_bar = Some(bar);
        event.insert(self.options.name.clone(), bar);
        Ok(event)
    }
}
