use crate::error::PipelineError;
use crate::indicator::{Indicator, IndicatorModule};
use barflow_data::{Field, IndicatorValue, MarketEvent};
use std::collections::VecDeque;

/// Factory for a simple moving average over `period` closes, adapted from the teacher's
/// `indicators::trend::SMA` (`BarData`-input) into one reading `Field::Close` off a
/// `MarketEvent` stream.
#[derive(Debug, Clone, Copy)]
pub struct SmaModule {
    pub period: usize,
}

impl SmaModule {
    pub fn new(period: usize) -> Self {
        Self { period }
    }
}

impl IndicatorModule for SmaModule {
    fn identifier(&self) -> &str {
        "sma"
    }

    fn init(&self, data: String) -> Result<Box<dyn Indicator>, PipelineError> {
        if self.period == 0 {
            return Err(PipelineError::MissingRequiredOption("period".to_string()));
        }
        Ok(Box::new(Sma {
            data,
            period: self.period,
            values: VecDeque::with_capacity(self.period),
            sum: 0.0,
        }))
    }
}

struct Sma {
    data: String,
    period: usize,
    values: VecDeque<f64>,
    sum: f64,
}

impl Indicator for Sma {
    fn next(&mut self, event: &MarketEvent) -> Result<IndicatorValue, PipelineError> {
        let close = event.extract_value(&self.data, Field::Close)?;

        self.values.push_back(close);
        self.sum += close;
        if self.values.len() > self.period {
            self.sum -= self.values.pop_front().expect("just checked len > period > 0");
        }

        // Before the window fills, emit the partial running average rather than an Option —
        // the Indicator contract always produces a value.
        let value = self.sum / self.values.len() as f64;
        Ok(IndicatorValue::new(value, self.data.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use barflow_data::Value;

    fn event_with_close(close: f64) -> MarketEvent {
        let mut event = MarketEvent::new();
        event.insert("bar", Value::Scalar(close));
        event
    }

    #[test]
    fn averages_over_the_configured_window() {
        let module = SmaModule::new(3);
        let mut sma = module.init("bar".to_string()).unwrap();

        assert_eq!(sma.next(&event_with_close(100.0)).unwrap().value, 100.0);
        assert_eq!(sma.next(&event_with_close(102.0)).unwrap().value, 101.0);
        let v = sma.next(&event_with_close(103.0)).unwrap().value;
        assert!((v - 101.6666).abs() < 1e-3);
        let v = sma.next(&event_with_close(104.0)).unwrap().value;
        assert!((v - 103.0).abs() < 1e-9);
    }

    #[test]
    fn zero_period_is_a_configuration_error() {
        let module = SmaModule::new(0);
        assert!(module.init("bar".to_string()).is_err());
    }
}
