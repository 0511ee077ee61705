use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single quote observation: bid/ask prices and volumes at an instant.
///
/// Either side of the quote may be absent (a one-sided book update); a tick
/// with neither bid nor ask is only rejected when a consumer actually needs
/// a price out of it (see [`crate::resample::TickToBarProcessor`]).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub time: DateTime<Utc>,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub bid_volume: Option<f64>,
    pub ask_volume: Option<f64>,
}

impl Tick {
    pub fn new(time: DateTime<Utc>, bid: Option<f64>, ask: Option<f64>) -> Self {
        Self {
            time,
            bid,
            ask,
            bid_volume: None,
            ask_volume: None,
        }
    }

    pub fn with_volumes(mut self, bid_volume: Option<f64>, ask_volume: Option<f64>) -> Self {
        self.bid_volume = bid_volume;
        self.ask_volume = ask_volume;
        self
    }

    /// Mid price, averaging bid/ask when both are present; otherwise whichever is present.
    pub fn mid(&self) -> Option<f64> {
        match (self.bid, self.ask) {
            (Some(b), Some(a)) => Some((b + a) / 2.0),
            (Some(b), None) => Some(b),
            (None, Some(a)) => Some(a),
            (None, None) => None,
        }
    }

    /// Combined volume: sum of both sides when both are present, otherwise whichever is present.
    pub fn combined_volume(&self) -> Option<f64> {
        match (self.bid_volume, self.ask_volume) {
            (Some(b), Some(a)) => Some(b + a),
            (Some(b), None) => Some(b),
            (None, Some(a)) => Some(a),
            (None, None) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, m, s).unwrap()
    }

    #[test]
    fn mid_averages_both_sides() {
        let tick = Tick::new(t(10, 0, 0), Some(1.0850), Some(1.0852));
        assert!((tick.mid().unwrap() - 1.0851).abs() < 1e-9);
    }

    #[test]
    fn mid_falls_back_to_whichever_side_is_present() {
        assert_eq!(Tick::new(t(10, 0, 0), Some(1.08), None).mid(), Some(1.08));
        assert_eq!(Tick::new(t(10, 0, 0), None, Some(1.09)).mid(), Some(1.09));
        assert_eq!(Tick::new(t(10, 0, 0), None, None).mid(), None);
    }

    #[test]
    fn combined_volume_sums_present_sides() {
        let tick = Tick::new(t(10, 0, 0), Some(1.0), Some(1.1)).with_volumes(Some(2.0), Some(3.0));
        assert_eq!(tick.combined_volume(), Some(5.0));
    }
}
