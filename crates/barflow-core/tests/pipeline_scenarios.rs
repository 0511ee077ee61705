use barflow_core::error::PipelineError;
use barflow_core::indicator::{Indicator, IndicatorModule};
use barflow_core::stage::DemandConfig;
use barflow_core::topology::{IndicatorRequest, PipelineBuilder, ResampleRequest};
use barflow_data::{Field, IndicatorValue, InMemoryFeed, MarketEvent, SmaModule, Tick, Value};
use chrono::{TimeZone, Utc};
use futures::StreamExt;
use std::time::{Duration, Instant};

/// Mirrors the teacher's own test/bench harnesses wiring `tracing-subscriber` for readable
/// `cargo test -- --nocapture` output; safe to call from every test since `try_init` no-ops
/// once a global subscriber is already set.
fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn t(h: u32, m: u32, s: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, h, m, s).unwrap()
}

/// A constant-offset indicator standing in for S3's literal "Add +N" example.
struct AddConstant {
    data: String,
    offset: f64,
}

impl Indicator for AddConstant {
    fn next(&mut self, event: &MarketEvent) -> Result<IndicatorValue, PipelineError> {
        let base = event.extract_value(&self.data, Field::Close)?;
        Ok(IndicatorValue::new(base + self.offset, self.data.clone()))
    }
}

struct AddConstantModule {
    identifier: &'static str,
    offset: f64,
}

impl IndicatorModule for AddConstantModule {
    fn identifier(&self) -> &str {
        self.identifier
    }

    fn init(&self, data: String) -> Result<Box<dyn Indicator>, PipelineError> {
        Ok(Box::new(AddConstant { data, offset: self.offset }))
    }
}

fn five_ticks() -> Vec<Tick> {
    (0..5)
        .map(|i| Tick::new(t(10, i, 0), Some(100.0 + i as f64), Some(100.0 + i as f64)))
        .collect()
}

/// S3 — fan-out/fan-in indicator layer: resample then two parallel indicators, proving
/// aggregation synchronisation and name disjointness.
#[tokio::test]
async fn s3_fan_out_fan_in_indicator_layer() {
    init_tracing();
    let feed = InMemoryFeed::from_ticks(five_ticks());
    let builder = PipelineBuilder::new()
        .add_data(Box::new(feed), None)
        .unwrap()
        .resample("m5", ResampleRequest::new().fake_volume(true))
        .unwrap()
        .add_indicators_layer(vec![
            (
                Box::new(AddConstantModule { identifier: "add_10", offset: 10.0 }),
                IndicatorRequest::new().data("0_m5"),
            ),
            (
                Box::new(AddConstantModule { identifier: "add_20", offset: 20.0 }),
                IndicatorRequest::new().data("0_m5"),
            ),
        ])
        .unwrap();

    let mut stream = Box::pin(builder.stream().unwrap().into_stream());

    let mut count = 0;
    while let Some(item) = stream.next().await {
        let event = item.unwrap();
        assert!(event.get("0").is_some(), "original tick retained");
        assert!(event.get("0_m5").is_some(), "resampled bar present");
        let add10 = event.extract_value("add_10", Field::Close).unwrap();
        let add20 = event.extract_value("add_20", Field::Close).unwrap();
        assert!((add20 - add10 - 10.0).abs() < 1e-9);
        count += 1;
    }
    assert_eq!(count, 5);
}

/// S5 — default-name collision avoidance and explicit-name collision failure.
#[tokio::test]
async fn s5_default_name_collision_avoidance() {
    init_tracing();
    let feed = InMemoryFeed::from_ticks(five_ticks());
    let builder = PipelineBuilder::new()
        .add_data(Box::new(feed), None)
        .unwrap()
        .add_indicator(Box::new(SmaModuleAlias::new(3)), IndicatorRequest::new())
        .unwrap()
        .add_indicator(Box::new(SmaModuleAlias::new(3)), IndicatorRequest::new())
        .unwrap()
        .add_indicator(Box::new(SmaModuleAlias::new(3)), IndicatorRequest::new())
        .unwrap();

    let mut stream = Box::pin(builder.stream().unwrap().into_stream());
    let first = stream.next().await.unwrap().unwrap();
    assert!(first.get("sma").is_some());
    assert!(first.get("sma_1").is_some());
    assert!(first.get("sma_2").is_some());
}

#[test]
fn s5_explicit_name_collision_fails() {
    init_tracing();
    let feed = InMemoryFeed::from_ticks(five_ticks());
    let result = PipelineBuilder::new()
        .add_data(Box::new(feed), None)
        .unwrap()
        .add_indicator(Box::new(SmaModuleAlias::new(3)), IndicatorRequest::new())
        .unwrap()
        .add_indicator(Box::new(SmaModuleAlias::new(3)), IndicatorRequest::new())
        .unwrap()
        .add_indicator(Box::new(SmaModuleAlias::new(3)), IndicatorRequest::new().name("sma_1"));

    assert!(matches!(result, Err(PipelineError::DuplicateName(_))));
}

/// S6 — an empty feed terminates normally with zero emitted events.
#[tokio::test]
async fn s6_empty_feed_terminates_normally() {
    init_tracing();
    let feed = InMemoryFeed::new(std::iter::empty());
    let builder = PipelineBuilder::new().add_data(Box::new(feed), None).unwrap();
    let mut stream = Box::pin(builder.stream().unwrap().into_stream());
    assert!(stream.next().await.is_none());
}

#[test]
fn stream_without_a_feed_fails_with_no_feed() {
    init_tracing();
    let builder = PipelineBuilder::new();
    assert!(matches!(builder.stream(), Err(PipelineError::NoFeed)));
}

#[test]
fn resample_rejects_an_unparsable_timeframe_string() {
    init_tracing();
    let feed = InMemoryFeed::from_ticks(five_ticks());
    let result = PipelineBuilder::new()
        .add_data(Box::new(feed), None)
        .unwrap()
        .resample("not-a-timeframe", ResampleRequest::new());

    assert!(matches!(result, Err(PipelineError::InvalidTimeframe(_))));
}

/// An indicator that blocks the worker thread for a fixed duration before returning, standing
/// in for a slow branch. `Indicator::next` is synchronous, so this blocks the task it runs in
/// (its own `ProducerConsumer` stage) rather than yielding — correct here since each stage is
/// its own `tokio::spawn`ed task.
struct SlowEcho {
    data: String,
    delay: Duration,
}

impl Indicator for SlowEcho {
    fn next(&mut self, event: &MarketEvent) -> Result<IndicatorValue, PipelineError> {
        std::thread::sleep(self.delay);
        let base = event.extract_value(&self.data, Field::Close)?;
        Ok(IndicatorValue::new(base, self.data.clone()))
    }
}

struct SlowEchoModule {
    delay: Duration,
}

impl IndicatorModule for SlowEchoModule {
    fn identifier(&self) -> &str {
        "slow_echo"
    }

    fn init(&self, data: String) -> Result<Box<dyn Indicator>, PipelineError> {
        Ok(Box::new(SlowEcho { data, delay: self.delay }))
    }
}

/// S4 — a slow indicator branch throttles the whole fan-out. The `Broadcast` stage awaits
/// every branch's send before pulling its next upstream item (§4.2's min-demand rule), so with
/// a buffer of 1 the fast branch cannot race ahead of the slow one: total wall-clock is bounded
/// below by `delay * tick_count`, not by the fast branch's near-zero cost alone.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn s4_slow_indicator_branch_throttles_the_fast_branch() {
    init_tracing();
    let delay = Duration::from_millis(20);
    let ticks = five_ticks();
    let tick_count = ticks.len();
    let feed = InMemoryFeed::from_ticks(ticks);

    let builder = PipelineBuilder::new()
        .with_demand(DemandConfig { max_demand: 1, buffer_size: 1 })
        .add_data(Box::new(feed), None)
        .unwrap()
        .add_indicators_layer(vec![
            (
                Box::new(AddConstantModule { identifier: "fast", offset: 1.0 }),
                IndicatorRequest::new(),
            ),
            (
                Box::new(SlowEchoModule { delay }),
                IndicatorRequest::new(),
            ),
        ])
        .unwrap();

    let mut stream = Box::pin(builder.stream().unwrap().into_stream());

    let start = Instant::now();
    let mut count = 0;
    while let Some(item) = stream.next().await {
        let event = item.unwrap();
        assert!(event.get("fast").is_some());
        assert!(event.get("slow_echo").is_some());
        count += 1;
    }
    let elapsed = start.elapsed();

    assert_eq!(count, tick_count);
    assert!(
        elapsed >= delay * tick_count as u32,
        "fast branch outran the slow branch: elapsed {elapsed:?} < {:?}",
        delay * tick_count as u32
    );
}

#[test]
fn second_feed_fails_with_duplicate_feed() {
    init_tracing();
    let feed_a = InMemoryFeed::new(std::iter::empty());
    let feed_b = InMemoryFeed::new(std::iter::empty());
    let result = PipelineBuilder::new()
        .add_data(Box::new(feed_a), None)
        .unwrap()
        .add_data(Box::new(feed_b), None);
    assert!(matches!(result, Err(PipelineError::DuplicateFeed)));
}

// `SmaModule` takes a period in its constructor but carries no `Clone`, so each call site in
// these tests builds its own instance through a thin alias to keep the scenarios readable.
type SmaModuleAlias = SmaModule;
