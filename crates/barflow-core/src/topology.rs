use crate::error::PipelineError;
use crate::indicator::{Indicator, IndicatorModule, IndicatorProcessor};
use crate::stage::{spawn_aggregator, spawn_broadcast, spawn_producer, spawn_producer_consumer, DemandConfig, StageItem};
use crate::strategy::{BalanceSpec, CommissionSpec, StrategySpec};
use crate::transform::ResampleTransform;
use barflow_data::{DataFeed, PriceType, ResampleOptions, Timeframe};
use chrono::{NaiveTime, Weekday};
use std::collections::HashSet;
use std::str::FromStr;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;

/// Per-call options for [`PipelineBuilder::resample`], mirroring §4.1's option set. `data`
/// and `name` are left unset to take their defaulted values (sole feed; `"{data}_{timeframe}"`).
#[derive(Debug, Clone, Default)]
pub struct ResampleRequest {
    pub data: Option<String>,
    pub name: Option<String>,
    pub price_type: Option<PriceType>,
    pub fake_volume: bool,
    pub market_open: Option<NaiveTime>,
    pub weekly_open: Option<Weekday>,
}

impl ResampleRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn price_type(mut self, price_type: PriceType) -> Self {
        self.price_type = Some(price_type);
        self
    }

    pub fn fake_volume(mut self, fake_volume: bool) -> Self {
        self.fake_volume = fake_volume;
        self
    }

    pub fn market_open(mut self, market_open: NaiveTime) -> Self {
        self.market_open = Some(market_open);
        self
    }

    pub fn weekly_open(mut self, weekly_open: Weekday) -> Self {
        self.weekly_open = Some(weekly_open);
        self
    }
}

/// Per-call options for [`PipelineBuilder::add_indicator`] / [`PipelineBuilder::add_indicators_layer`].
#[derive(Debug, Clone, Default)]
pub struct IndicatorRequest {
    pub data: Option<String>,
    pub name: Option<String>,
}

impl IndicatorRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

struct IndicatorEntry {
    module: Box<dyn IndicatorModule>,
    data: String,
    name: String,
}

enum LayerSpec {
    Resample(ResampleOptions),
    Indicators(Vec<IndicatorEntry>),
}

/// Fluent, eagerly-validated pipeline assembly (§4.1). Every operation consumes `self` and
/// returns `Result<Self, PipelineError>`, so a builder misuse fails synchronously at the call
/// site that caused it rather than deferring validation to `stream()`.
pub struct PipelineBuilder {
    feed: Option<(String, Box<dyn DataFeed>)>,
    layers: Vec<LayerSpec>,
    declared_names: HashSet<String>,
    strategy: Option<StrategySpec>,
    balance: Option<BalanceSpec>,
    commission: Option<CommissionSpec>,
    demand: DemandConfig,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            feed: None,
            layers: Vec::new(),
            declared_names: HashSet::new(),
            strategy: None,
            balance: None,
            commission: None,
            demand: DemandConfig::default(),
        }
    }

    /// Override the demand window (default max_demand=10, buffer_size=10,000 per §4.2) used
    /// by every stage this builder materialises.
    pub fn with_demand(mut self, demand: DemandConfig) -> Self {
        self.demand = demand;
        self
    }

    pub fn add_data(mut self, feed: Box<dyn DataFeed>, name: Option<String>) -> Result<Self, PipelineError> {
        if self.feed.is_some() {
            return Err(PipelineError::DuplicateFeed);
        }
        let name = name.unwrap_or_else(|| "0".to_string());
        self.declared_names.insert(name.clone());
        self.feed = Some((name, feed));
        Ok(self)
    }

    fn sole_feed_name(&self) -> Result<&str, PipelineError> {
        self.feed.as_ref().map(|(name, _)| name.as_str()).ok_or(PipelineError::NoFeed)
    }

    fn resolve_data(&self, requested: Option<String>) -> Result<String, PipelineError> {
        match requested {
            Some(name) => {
                if self.declared_names.contains(&name) {
                    Ok(name)
                } else {
                    Err(PipelineError::UnknownStream(name))
                }
            }
            None => self.sole_feed_name().map(|s| s.to_string()),
        }
    }

    fn generate_name(&self, base: &str, also_avoid: &HashSet<String>) -> String {
        if !self.declared_names.contains(base) && !also_avoid.contains(base) {
            return base.to_string();
        }
        let mut n = 1u32;
        loop {
            let candidate = format!("{base}_{n}");
            if !self.declared_names.contains(&candidate) && !also_avoid.contains(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    fn resolve_name(&self, requested: Option<String>, default_base: &str, also_avoid: &HashSet<String>) -> Result<String, PipelineError> {
        match requested {
            Some(name) => {
                if self.declared_names.contains(&name) || also_avoid.contains(&name) {
                    Err(PipelineError::DuplicateName(name))
                } else {
                    Ok(name)
                }
            }
            None => Ok(self.generate_name(default_base, also_avoid)),
        }
    }

    /// Parses `timeframe` per the `<unit>[<mult>]` grammar (§6), failing with
    /// `InvalidTimeframe` rather than requiring the caller to pre-parse it.
    pub fn resample(mut self, timeframe: impl AsRef<str>, request: ResampleRequest) -> Result<Self, PipelineError> {
        let timeframe = Timeframe::from_str(timeframe.as_ref()).map_err(PipelineError::InvalidTimeframe)?;
        let data = self.resolve_data(request.data)?;
        let default_name = format!("{data}_{timeframe}");
        let name = self.resolve_name(request.name, &default_name, &HashSet::new())?;

        let mut options = ResampleOptions::new(data, name.clone(), timeframe);
        if let Some(pt) = request.price_type {
            options = options.price_type(pt);
        }
        options = options.fake_volume(request.fake_volume);
        if let Some(mo) = request.market_open {
            options = options.market_open(mo);
        }
        if let Some(wo) = request.weekly_open {
            options = options.weekly_open(wo);
        }

        self.declared_names.insert(name);
        self.layers.push(LayerSpec::Resample(options));
        Ok(self)
    }

    pub fn add_indicator(mut self, module: Box<dyn IndicatorModule>, request: IndicatorRequest) -> Result<Self, PipelineError> {
        let data = self.resolve_data(request.data)?;
        let default_name = snake_case(module.identifier());
        let name = self.resolve_name(request.name, &default_name, &HashSet::new())?;

        self.declared_names.insert(name.clone());
        self.layers.push(LayerSpec::Indicators(vec![IndicatorEntry { module, data, name }]));
        Ok(self)
    }

    pub fn add_indicators_layer(mut self, specs: Vec<(Box<dyn IndicatorModule>, IndicatorRequest)>) -> Result<Self, PipelineError> {
        if specs.is_empty() {
            return Err(PipelineError::EmptyLayer);
        }

        let mut layer_names = HashSet::new();
        let mut entries = Vec::with_capacity(specs.len());
        for (module, request) in specs {
            let data = self.resolve_data(request.data)?;
            let default_name = snake_case(module.identifier());
            let name = self.resolve_name(request.name, &default_name, &layer_names)?;
            layer_names.insert(name.clone());
            entries.push(IndicatorEntry { module, data, name });
        }

        self.declared_names.extend(layer_names);
        self.layers.push(LayerSpec::Indicators(entries));
        Ok(self)
    }

    pub fn add_strategy(mut self, spec: StrategySpec) -> Self {
        self.strategy = Some(spec);
        self
    }

    pub fn set_balance(mut self, spec: BalanceSpec) -> Self {
        self.balance = Some(spec);
        self
    }

    pub fn set_commission(mut self, spec: CommissionSpec) -> Self {
        self.commission = Some(spec);
        self
    }

    /// Materialise the pipeline and return a pull-driven `Stream` of `MarketEvent`s (§4.1's
    /// `stream()`). Fails eagerly with `NoFeed` if no feed was ever registered.
    pub fn stream(self) -> Result<PipelineStream, PipelineError> {
        let (feed_name, feed) = self.feed.ok_or(PipelineError::NoFeed)?;
        let mut handles = Vec::new();

        let (producer_handle, mut current_rx) = spawn_producer(feed, feed_name, self.demand);
        handles.push(producer_handle);

        for (idx, layer) in self.layers.into_iter().enumerate() {
            match layer {
                LayerSpec::Resample(options) => {
                    let stage_name = format!("resample:{idx}:{}", options.name);
                    let transform = Box::new(ResampleTransform::new(barflow_data::TickToBarProcessor::new(options)));
                    let (handle, out_rx) = spawn_producer_consumer(current_rx, transform, self.demand, stage_name);
                    handles.push(handle);
                    current_rx = out_rx;
                }
                LayerSpec::Indicators(entries) if entries.len() == 1 => {
                    let entry = entries.into_iter().next().expect("len == 1");
                    let stage_name = format!("indicator:{idx}:{}", entry.name);
                    let indicator = entry.module.init(entry.data)?;
                    let transform = Box::new(IndicatorProcessor::new(entry.name.clone(), entry.name, indicator));
                    let (handle, out_rx) = spawn_producer_consumer(current_rx, transform, self.demand, stage_name);
                    handles.push(handle);
                    current_rx = out_rx;
                }
                LayerSpec::Indicators(entries) => {
                    let fanout = entries.len();
                    let broadcast_name = format!("broadcast:{idx}");
                    let (broadcast_handle, branch_rxs) = spawn_broadcast(current_rx, fanout, self.demand, broadcast_name);
                    handles.push(broadcast_handle);

                    let mut branch_out_rxs = Vec::with_capacity(fanout);
                    for (entry, rx) in entries.into_iter().zip(branch_rxs) {
                        let stage_name = format!("indicator:{idx}:{}", entry.name);
                        let indicator: Box<dyn Indicator> = entry.module.init(entry.data)?;
                        let transform = Box::new(IndicatorProcessor::new(entry.name.clone(), entry.name, indicator));
                        let (handle, out_rx) = spawn_producer_consumer(rx, transform, self.demand, stage_name);
                        handles.push(handle);
                        branch_out_rxs.push(out_rx);
                    }

                    let aggregator_name = format!("aggregator:{idx}");
                    let (aggregator_handle, out_rx) = spawn_aggregator(branch_out_rxs, self.demand.buffer_size, aggregator_name);
                    handles.push(aggregator_handle);
                    current_rx = out_rx;
                }
            }
        }

        Ok(PipelineStream {
            _handles: handles,
            rx: current_rx,
        })
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The materialised, running pipeline: a `Stream` of `MarketEvent`s (or the first abnormal
/// termination observed anywhere in the stage graph), owning every spawned stage task.
pub struct PipelineStream {
    _handles: Vec<JoinHandle<()>>,
    rx: tokio::sync::mpsc::Receiver<StageItem>,
}

impl PipelineStream {
    pub fn into_stream(self) -> impl futures::Stream<Item = StageItem> {
        ReceiverStream::new(self.rx)
    }
}

fn snake_case(identifier: &str) -> String {
    let mut out = String::with_capacity(identifier.len() + 4);
    for (i, c) in identifier.chars().enumerate() {
        if c.is_uppercase() {
            if i != 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
