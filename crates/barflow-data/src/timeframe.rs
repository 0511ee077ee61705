use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The seven timeframe units from the grammar `<unit>[<mult>]`. Case is significant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    Tick,
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
}

impl Unit {
    fn from_char(c: char) -> Option<Self> {
        match c {
            't' => Some(Unit::Tick),
            's' => Some(Unit::Second),
            'm' => Some(Unit::Minute),
            'h' => Some(Unit::Hour),
            'D' => Some(Unit::Day),
            'W' => Some(Unit::Week),
            'M' => Some(Unit::Month),
            _ => None,
        }
    }

    fn as_char(self) -> char {
        match self {
            Unit::Tick => 't',
            Unit::Second => 's',
            Unit::Minute => 'm',
            Unit::Hour => 'h',
            Unit::Day => 'D',
            Unit::Week => 'W',
            Unit::Month => 'M',
        }
    }

    /// Whether bar boundaries for this unit are driven by elapsed ticks rather than wall-clock time.
    pub fn is_tick_based(self) -> bool {
        matches!(self, Unit::Tick)
    }
}

/// A `(unit, mult)` pair describing a bar period, per the `<unit>[<mult>]` grammar (§6).
///
/// Missing `mult` defaults to 1. Parsing never normalizes across units (`h1` and `m60` parse
/// to distinct values) — the resampler treats them identically via [`Timeframe::duration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Timeframe {
    pub unit: Unit,
    pub mult: u32,
}

impl Timeframe {
    pub fn new(unit: Unit, mult: u32) -> Self {
        Self { unit, mult }
    }

    /// Fixed-length duration for time-based units. `None` for the tick-based unit, and for `M`
    /// (month length is variable — see [`Timeframe::calc_next`] instead).
    pub fn duration(&self) -> Option<Duration> {
        match self.unit {
            Unit::Tick => None,
            Unit::Second => Some(Duration::seconds(self.mult as i64)),
            Unit::Minute => Some(Duration::minutes(self.mult as i64)),
            Unit::Hour => Some(Duration::hours(self.mult as i64)),
            Unit::Day => Some(Duration::days(self.mult as i64)),
            Unit::Week => Some(Duration::weeks(self.mult as i64)),
            Unit::Month => None,
        }
    }

    /// Align a tick instant down to the start of its bar period, per §4.3.
    pub fn align(&self, time: DateTime<Utc>, market_open: NaiveTime, weekly_open: Weekday) -> DateTime<Utc> {
        match self.unit {
            Unit::Tick => time,
            Unit::Second => {
                let sec = time.second() - (time.second() % self.mult.max(1));
                time.with_nanosecond(0).unwrap().with_second(sec).unwrap()
            }
            Unit::Minute => {
                let minute = time.minute() - (time.minute() % self.mult.max(1));
                time.with_nanosecond(0)
                    .unwrap()
                    .with_second(0)
                    .unwrap()
                    .with_minute(minute)
                    .unwrap()
            }
            Unit::Hour => {
                let hour = time.hour() - (time.hour() % self.mult.max(1));
                time.with_nanosecond(0)
                    .unwrap()
                    .with_second(0)
                    .unwrap()
                    .with_minute(0)
                    .unwrap()
                    .with_hour(hour)
                    .unwrap()
            }
            Unit::Day => time.date_naive().and_time(market_open).and_utc(),
            Unit::Week => {
                let date = time.date_naive();
                let days_since_open = (date.weekday().num_days_from_monday() as i64
                    - weekly_open.num_days_from_monday() as i64)
                    .rem_euclid(7);
                let week_start = date - Duration::days(days_since_open);
                week_start.and_time(market_open).and_utc()
            }
            Unit::Month => {
                let date = time.date_naive();
                let first_of_month = date.with_day(1).unwrap();
                first_of_month.and_time(market_open).and_utc()
            }
        }
    }

    /// The open-instant of the *next* bar after `aligned` (itself the result of [`Timeframe::align`]).
    pub fn calc_next(&self, aligned: DateTime<Utc>, market_open: NaiveTime) -> DateTime<Utc> {
        match self.unit {
            Unit::Tick => aligned,
            Unit::Second | Unit::Minute | Unit::Hour => {
                let plain_next = aligned + self.duration().unwrap();
                let next_session_open = next_market_open_after(aligned, market_open);
                plain_next.min(next_session_open)
            }
            Unit::Day => aligned + Duration::days(self.mult.max(1) as i64),
            Unit::Week => aligned + Duration::weeks(self.mult.max(1) as i64),
            Unit::Month => add_months(aligned, self.mult.max(1)),
        }
    }
}

fn next_market_open_after(from: DateTime<Utc>, market_open: NaiveTime) -> DateTime<Utc> {
    let today_open = from.date_naive().and_time(market_open).and_utc();
    if today_open > from {
        today_open
    } else {
        (from.date_naive() + Duration::days(1))
            .and_time(market_open)
            .and_utc()
    }
}

/// Add `months` calendar months to `time`, clamping the day-of-month for short months and
/// rolling the year over as needed.
fn add_months(time: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    let date = time.date_naive();
    let total_months = date.year() * 12 + (date.month0() as i32) + months as i32;
    let year = total_months.div_euclid(12);
    let month0 = total_months.rem_euclid(12);
    let day = date.day();
    let mut naive = None;
    let mut d = day;
    while naive.is_none() {
        naive = chrono::NaiveDate::from_ymd_opt(year, month0 as u32 + 1, d);
        if d == 1 {
            break;
        }
        d -= 1;
    }
    let naive = naive.expect("at least the first of the month is always valid");
    naive.and_time(time.time()).and_utc()
}

/// Boundary crossing: did `tick_time`'s time-of-day cross `market_open` since `previous_time`?
pub fn crosses_market_open(previous_time: DateTime<Utc>, tick_time: DateTime<Utc>, market_open: NaiveTime) -> bool {
    previous_time.time() < market_open && market_open <= tick_time.time()
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.unit.as_char(), self.mult)
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let unit_char = chars.next().ok_or_else(|| "empty timeframe string".to_string())?;
        let unit = Unit::from_char(unit_char).ok_or_else(|| format!("invalid timeframe unit `{unit_char}` in `{s}`"))?;
        let rest: String = chars.collect();
        let mult = if rest.is_empty() {
            1
        } else {
            rest.parse::<u32>()
                .map_err(|_| format!("invalid timeframe multiplier `{rest}` in `{s}`"))?
        };
        if mult == 0 {
            return Err(format!("timeframe multiplier must be positive in `{s}`"));
        }
        Ok(Timeframe { unit, mult })
    }
}
