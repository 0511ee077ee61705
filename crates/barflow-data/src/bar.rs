use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An OHLCV aggregate over a time window produced by the resampler.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Open instant of the bar (subsecond precision preserved from the source tick).
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<f64>,
    /// True for the first event emitted for this bar period; false on subsequent updates.
    pub new_bar: bool,
    /// True iff this bar's open crossed the configured market-open boundary.
    pub new_market: bool,
}

impl Bar {
    #[allow(clippy::too_many_arguments)]
    pub fn opening(time: DateTime<Utc>, price: f64, volume: Option<f64>, new_market: bool) -> Self {
        Self {
            time,
            open: price,
            high: price,
            low: price,
            close: price,
            volume,
            new_bar: true,
            new_market,
        }
    }

    pub fn update(&mut self, price: f64, volume: Option<f64>) {
        self.high = self.high.max(price);
        self.low = self.low.min(price);
        self.close = price;
        self.volume = match (self.volume, volume) {
            (Some(a), Some(b)) => Some(a + b),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        };
        self.new_bar = false;
        self.new_market = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn opening_sets_ohlc_equal_to_price() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let bar = Bar::opening(t, 1.0851, Some(1.0), false);
        assert_eq!(bar.open, bar.high);
        assert_eq!(bar.high, bar.low);
        assert_eq!(bar.low, bar.close);
        assert!(bar.new_bar);
    }

    #[test]
    fn update_extends_range_and_accumulates_volume() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let mut bar = Bar::opening(t, 1.0851, Some(1.0), false);
        bar.update(1.0856, Some(1.0));
        assert_eq!(bar.high, 1.0856);
        assert_eq!(bar.low, 1.0851);
        assert_eq!(bar.close, 1.0856);
        assert_eq!(bar.volume, Some(2.0));
        assert!(!bar.new_bar);
    }
}
