use crate::bar::Bar;
use crate::error::LookupError;
use crate::tick::Tick;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An opaque, provider-tagged payload from an exchange feed that the core doesn't interpret.
///
/// External exchange collaborators (§6) are out of scope for this crate; `ExchangeData` is the
/// placeholder shape a future exchange-feed `DataFeed` would wrap raw provider payloads in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeData {
    pub provider: String,
    pub payload: String,
}

/// A derived value produced by an [`crate::resample`]-adjacent indicator, tagged with the name
/// of the stream it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorValue {
    pub value: f64,
    pub data_name: String,
}

impl IndicatorValue {
    pub fn new(value: f64, data_name: impl Into<String>) -> Self {
        Self {
            value,
            data_name: data_name.into(),
        }
    }
}

/// The tagged union stored under each stream name in a [`MarketEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Tick(Tick),
    Bar(Bar),
    Indicator(IndicatorValue),
    Scalar(f64),
    Exchange(ExchangeData),
}

impl From<Tick> for Value {
    fn from(t: Tick) -> Self {
        Value::Tick(t)
    }
}

impl From<Bar> for Value {
    fn from(b: Bar) -> Self {
        Value::Bar(b)
    }
}

impl From<IndicatorValue> for Value {
    fn from(v: IndicatorValue) -> Self {
        Value::Indicator(v)
    }
}

/// The per-tick message that flows between stages: an associative map from stream name to the
/// value produced for it so far, extended (never shrunk) as the event moves through layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MarketEvent {
    pub data: HashMap<String, Value>,
    /// Wall-clock time of the event, when one applies (inherited from the originating tick/bar).
    pub time: Option<DateTime<Utc>>,
    /// The name of the stream this event originated from, for diagnostics and Aggregator merges.
    pub source: Option<String>,
}

impl MarketEvent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct the event a Producer emits for one raw feed item.
    pub fn from_feed(stream: impl Into<String>, value: impl Into<Value>, time: DateTime<Utc>) -> Self {
        let stream = stream.into();
        let mut data = HashMap::new();
        data.insert(stream.clone(), value.into());
        Self {
            data,
            time: Some(time),
            source: Some(stream),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }

    /// Shallow-merge `other` into `self`; on key collision `other`'s entry wins. Used by the
    /// Aggregator to combine the k-th event from each parallel branch (§4.2).
    pub fn merge_from(&mut self, other: &MarketEvent) {
        for (k, v) in &other.data {
            self.data.insert(k.clone(), v.clone());
        }
    }

    fn resolve<'a>(&'a self, name: &str) -> Result<&'a Value, LookupError> {
        self.data
            .get(name)
            .ok_or_else(|| LookupError::UnknownStream(name.to_string()))
    }

    /// `new_bar?(event, name)` — Bar's own flag; Ticks are always a new bar; IndicatorValues
    /// recurse through their `data_name` to find the underlying Bar/Tick.
    pub fn new_bar(&self, name: &str) -> Result<bool, LookupError> {
        match self.resolve(name)? {
            Value::Bar(bar) => Ok(bar.new_bar),
            Value::Tick(_) => Ok(true),
            Value::Indicator(iv) => self.new_bar(&iv.data_name),
            Value::Scalar(_) | Value::Exchange(_) => Err(LookupError::Unresolvable {
                stream: name.to_string(),
                field: "new_bar",
            }),
        }
    }

    /// `new_market?(event, name)` — analogous to [`MarketEvent::new_bar`]; Ticks are never a
    /// market-open boundary on their own.
    pub fn new_market(&self, name: &str) -> Result<bool, LookupError> {
        match self.resolve(name)? {
            Value::Bar(bar) => Ok(bar.new_market),
            Value::Tick(_) => Ok(false),
            Value::Indicator(iv) => self.new_market(&iv.data_name),
            Value::Scalar(_) | Value::Exchange(_) => Err(LookupError::Unresolvable {
                stream: name.to_string(),
                field: "new_market",
            }),
        }
    }

    /// `extract_time(event, name)` — follows the IndicatorValue chain down to the source Bar/Tick.
    pub fn extract_time(&self, name: &str) -> Result<DateTime<Utc>, LookupError> {
        match self.resolve(name)? {
            Value::Bar(bar) => Ok(bar.time),
            Value::Tick(tick) => Ok(tick.time),
            Value::Indicator(iv) => self.extract_time(&iv.data_name),
            Value::Scalar(_) | Value::Exchange(_) => Err(LookupError::Unresolvable {
                stream: name.to_string(),
                field: "time",
            }),
        }
    }

    /// `extract_value(event, name, field)` — the named OHLC/quote field off a Bar/Tick, the raw
    /// value off an IndicatorValue, or the scalar itself.
    pub fn extract_value(&self, name: &str, field: Field) -> Result<f64, LookupError> {
        match self.resolve(name)? {
            Value::Bar(bar) => Ok(match field {
                Field::Open => bar.open,
                Field::High => bar.high,
                Field::Low => bar.low,
                Field::Close => bar.close,
                Field::Volume => bar.volume.unwrap_or(0.0),
                Field::Bid | Field::Ask | Field::Mid => bar.close,
            }),
            Value::Tick(tick) => match field {
                Field::Bid => tick.bid.ok_or(LookupError::Unresolvable {
                    stream: name.to_string(),
                    field: "bid",
                }),
                Field::Ask => tick.ask.ok_or(LookupError::Unresolvable {
                    stream: name.to_string(),
                    field: "ask",
                }),
                Field::Mid | Field::Open | Field::High | Field::Low | Field::Close => {
                    tick.mid().ok_or(LookupError::Unresolvable {
                        stream: name.to_string(),
                        field: "mid",
                    })
                }
                Field::Volume => Ok(tick.combined_volume().unwrap_or(0.0)),
            },
            Value::Indicator(iv) => Ok(iv.value),
            Value::Scalar(s) => Ok(*s),
            Value::Exchange(_) => Err(LookupError::Unresolvable {
                stream: name.to_string(),
                field: "value",
            }),
        }
    }
}

/// Which field to pull off a Bar/Tick in [`MarketEvent::extract_value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Open,
    High,
    Low,
    Close,
    Volume,
    Bid,
    Ask,
    Mid,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, 0, 0).unwrap()
    }

    #[test]
    fn extract_value_follows_indicator_chain_to_scalar() {
        let mut event = MarketEvent::new();
        event.insert("tick", Tick::new(t(10), Some(1.0), Some(1.2)));
        event.insert("sma", IndicatorValue::new(42.0, "tick"));

        assert_eq!(event.extract_value("sma", Field::Close).unwrap(), 42.0);
        assert!((event.extract_value("tick", Field::Mid).unwrap() - 1.1).abs() < 1e-9);
    }

    #[test]
    fn new_bar_recurses_through_indicator_chain() {
        let mut event = MarketEvent::new();
        let mut bar = Bar::opening(t(10), 1.0, None, false);
        bar.new_bar = false;
        event.insert("bar", bar);
        event.insert("sma", IndicatorValue::new(1.0, "bar"));

        assert_eq!(event.new_bar("sma").unwrap(), false);
        assert_eq!(event.new_bar("bar").unwrap(), false);
    }

    #[test]
    fn unknown_stream_is_an_error() {
        let event = MarketEvent::new();
        assert!(matches!(
            event.extract_time("missing"),
            Err(LookupError::UnknownStream(_))
        ));
    }

    #[test]
    fn scalar_value_is_unresolvable_for_time() {
        let mut event = MarketEvent::new();
        event.insert("k", Value::Scalar(3.0));
        assert!(matches!(
            event.extract_time("k"),
            Err(LookupError::Unresolvable { .. })
        ));
    }

    #[test]
    fn merge_from_lets_later_branch_win_on_collision() {
        let mut a = MarketEvent::new();
        a.insert("x", Value::Scalar(1.0));
        let mut b = MarketEvent::new();
        b.insert("x", Value::Scalar(2.0));
        a.merge_from(&b);
        assert_eq!(a.extract_value("x", Field::Close).unwrap(), 2.0);
    }
}
