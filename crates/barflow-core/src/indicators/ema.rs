use crate::error::PipelineError;
use crate::indicator::{Indicator, IndicatorModule};
use barflow_data::{Field, IndicatorValue, MarketEvent};

/// Factory for an exponential moving average over `period` closes. The teacher has no EMA
/// module (only `trend::SMA`/`momentum::RSI` exist there); this one follows the same shape —
/// a VecDeque-free recurrence, grounded in the textbook EMA formula (`alpha = 2/(period+1)`)
/// used identically by `backtestr-core`'s MACD, which builds on top of one.
#[derive(Debug, Clone, Copy)]
pub struct EmaModule {
    pub period: usize,
}

impl EmaModule {
    pub fn new(period: usize) -> Self {
        Self { period }
    }
}

impl IndicatorModule for EmaModule {
    fn identifier(&self) -> &str {
        "ema"
    }

    fn init(&self, data: String) -> Result<Box<dyn Indicator>, PipelineError> {
        if self.period == 0 {
            return Err(PipelineError::MissingRequiredOption("period".to_string()));
        }
        Ok(Box::new(Ema {
            data,
            alpha: 2.0 / (self.period as f64 + 1.0),
            current: None,
        }))
    }
}

struct Ema {
    data: String,
    alpha: f64,
    current: Option<f64>,
}

impl Indicator for Ema {
    fn next(&mut self, event: &MarketEvent) -> Result<IndicatorValue, PipelineError> {
        let close = event.extract_value(&self.data, Field::Close)?;
        let next = match self.current {
            None => close,
            Some(prev) => self.alpha * close + (1.0 - self.alpha) * prev,
        };
        self.current = Some(next);
        Ok(IndicatorValue::new(next, self.data.clone()))
    }
}
