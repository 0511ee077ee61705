use crate::error::PipelineError;
use crate::indicator::{Indicator, IndicatorModule};
use barflow_data::{Field, IndicatorValue, MarketEvent};
use std::collections::VecDeque;

/// Factory for a Wilder-smoothed RSI over `period` closes, adapted from the teacher's
/// `indicators::momentum::RSI`.
#[derive(Debug, Clone, Copy)]
pub struct RsiModule {
    pub period: usize,
}

impl RsiModule {
    pub fn new(period: usize) -> Self {
        Self { period }
    }
}

impl IndicatorModule for RsiModule {
    fn identifier(&self) -> &str {
        "rsi"
    }

    fn init(&self, data: String) -> Result<Box<dyn Indicator>, PipelineError> {
        if self.period == 0 {
            return Err(PipelineError::MissingRequiredOption("period".to_string()));
        }
        Ok(Box::new(Rsi {
            data,
            period: self.period,
            gains: VecDeque::with_capacity(self.period),
            losses: VecDeque::with_capacity(self.period),
            avg_gain: None,
            avg_loss: None,
            previous_close: None,
        }))
    }
}

struct Rsi {
    data: String,
    period: usize,
    gains: VecDeque<f64>,
    losses: VecDeque<f64>,
    avg_gain: Option<f64>,
    avg_loss: Option<f64>,
    previous_close: Option<f64>,
}

impl Indicator for Rsi {
    fn next(&mut self, event: &MarketEvent) -> Result<IndicatorValue, PipelineError> {
        let close = event.extract_value(&self.data, Field::Close)?;

        let Some(prev) = self.previous_close else {
            self.previous_close = Some(close);
            // No prior close yet: neutral reading, same convention as the warm-up placeholder.
            return Ok(IndicatorValue::new(50.0, self.data.clone()));
        };

        let change = close - prev;
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);
        self.gains.push_back(gain);
        self.losses.push_back(loss);
        if self.gains.len() > self.period {
            self.gains.pop_front();
            self.losses.pop_front();
        }
        self.previous_close = Some(close);

        if self.gains.len() < self.period {
            return Ok(IndicatorValue::new(50.0, self.data.clone()));
        }

        let avg_gain = match self.avg_gain {
            Some(prev_avg) => (prev_avg * (self.period - 1) as f64 + gain) / self.period as f64,
            None => self.gains.iter().sum::<f64>() / self.period as f64,
        };
        let avg_loss = match self.avg_loss {
            Some(prev_avg) => (prev_avg * (self.period - 1) as f64 + loss) / self.period as f64,
            None => self.losses.iter().sum::<f64>() / self.period as f64,
        };
        self.avg_gain = Some(avg_gain);
        self.avg_loss = Some(avg_loss);

        let rsi = if avg_loss == 0.0 {
            100.0
        } else if avg_gain == 0.0 {
            0.0
        } else {
            let rs = avg_gain / avg_loss;
            100.0 - (100.0 / (1.0 + rs))
        };

        Ok(IndicatorValue::new(rsi, self.data.clone()))
    }
}
