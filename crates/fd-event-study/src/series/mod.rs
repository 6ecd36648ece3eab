//! Typed, date-indexed price and return series.
//!
//! Raw frames from a [`PriceSource`](crate::PriceSource) enter the pipeline
//! through [`normalize`], which performs the only tabular-to-typed conversion.
//! Everything downstream works on the row structs defined here.

pub mod normalize;

pub use normalize::{REQUIRED_COLUMNS, normalize};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A row that is keyed by a calendar date.
pub trait Dated {
    /// Date of the observation.
    fn date(&self) -> NaiveDate;
}

/// One normalized trading day of a ticker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    /// Trading date
    pub date: NaiveDate,
    /// Closing price
    pub close: f64,
    /// Traded volume; `NaN` when the source had no value
    pub volume: f64,
    /// Simple return against the previous bar; `None` for the first bar
    pub ret: Option<f64>,
}

impl Dated for PriceBar {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

/// Canonical per-ticker price series.
///
/// Dates are strictly increasing. Instances are produced by [`normalize`] and
/// never mutated afterwards; derived series are new values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    ticker: String,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub(crate) const fn new(ticker: String, bars: Vec<PriceBar>) -> Self {
        Self { ticker, bars }
    }

    /// Ticker symbol of the series.
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    /// All bars in date order.
    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    /// Number of bars.
    pub const fn len(&self) -> usize {
        self.bars.len()
    }

    /// Whether the series has no bars.
    pub const fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Whether `date` is a trading day of this series.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.bars.binary_search_by_key(&date, |b| b.date).is_ok()
    }

    /// Derived daily return series.
    pub fn returns(&self) -> ReturnSeries {
        ReturnSeries {
            ticker: self.ticker.clone(),
            points: self
                .bars
                .iter()
                .map(|b| ReturnPoint {
                    date: b.date,
                    value: b.ret,
                })
                .collect(),
        }
    }
}

/// A single daily return observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnPoint {
    /// Trading date
    pub date: NaiveDate,
    /// Simple return, `None` when there is no prior close
    pub value: Option<f64>,
}

impl Dated for ReturnPoint {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

/// Date-indexed daily simple returns of one ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnSeries {
    ticker: String,
    points: Vec<ReturnPoint>,
}

impl ReturnSeries {
    /// Build a return series from points already in strictly increasing date order.
    pub const fn from_points(ticker: String, points: Vec<ReturnPoint>) -> Self {
        Self { ticker, points }
    }

    /// Ticker symbol of the series.
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    /// Observations in date order.
    pub fn points(&self) -> &[ReturnPoint] {
        &self.points
    }
}
