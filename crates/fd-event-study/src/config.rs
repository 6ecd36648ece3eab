//! Batch configuration.
//!
//! A [`StudyConfig`] describes one multi-window run: which events to analyze,
//! against which benchmark, over which history, and how windows and tests are
//! parameterised. Every knob has a default so a configuration file only needs
//! to list its events.

use crate::{EventStudyError, Result};
use chrono::{Days, NaiveDate};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// One event to analyze.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventSpec {
    /// Ticker symbol of the stock
    #[serde(alias = "stock_symbol")]
    pub ticker: String,
    /// Date of the announcement
    pub event_date: NaiveDate,
}

impl EventSpec {
    /// Create a new event spec.
    pub fn new(ticker: impl Into<String>, event_date: NaiveDate) -> Self {
        Self {
            ticker: ticker.into(),
            event_date,
        }
    }
}

/// Inclusive range of dates to fetch history for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First date (inclusive)
    pub start: NaiveDate,
    /// Last date (inclusive)
    pub end: NaiveDate,
}

impl DateRange {
    /// Create a range, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(EventStudyError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Whether `date` lies inside the range.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// A labelled window size in days.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowSpec {
    /// Label carried into every summary record, e.g. `1w`
    pub label: String,
    /// Window half-width in days
    pub days: u32,
}

impl WindowSpec {
    /// Create a labelled window.
    pub fn new(label: impl Into<String>, days: u32) -> Self {
        Self {
            label: label.into(),
            days,
        }
    }

    /// One week, one month and one year.
    pub fn defaults() -> Vec<Self> {
        vec![Self::new("1w", 7), Self::new("1m", 30), Self::new("1y", 365)]
    }
}

/// How window sizes are counted.
#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowMode {
    /// Calendar days on either side of the event
    #[default]
    CalendarDays,
    /// Trading days (rows) on either side of the event; partitions must be full
    TradingDays,
}

/// Alternative hypothesis of a t-test.
#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestDirection {
    /// Mean differs from zero
    #[default]
    TwoSided,
    /// Mean is greater than zero
    Greater,
    /// Mean is less than zero
    Less,
}

/// Which returns the pre/post volatility is measured on.
#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityBasis {
    /// Raw stock returns
    #[default]
    StockReturns,
    /// Benchmark-relative abnormal returns
    AbnormalReturns,
}

/// Configuration for a multi-window event study.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyConfig {
    /// Events to analyze, in output order
    pub events: Vec<EventSpec>,
    /// Benchmark ticker
    pub benchmark: String,
    /// History to fetch; derived from the events when absent
    pub history: Option<DateRange>,
    /// Window sizes, each producing an independent batch
    pub windows: Vec<WindowSpec>,
    /// How window sizes are counted
    pub window_mode: WindowMode,
    /// Alternative hypothesis for the abnormal-return test
    pub test_direction: TestDirection,
    /// Returns used for pre/post volatility
    pub volatility_basis: VolatilityBasis,
    /// Maximum number of concurrent price fetches
    pub max_concurrency: usize,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            benchmark: "^GSPC".to_string(),
            history: None,
            windows: WindowSpec::defaults(),
            window_mode: WindowMode::default(),
            test_direction: TestDirection::default(),
            volatility_basis: VolatilityBasis::default(),
            max_concurrency: 4,
        }
    }
}

impl StudyConfig {
    /// Parse a configuration from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Reject malformed configurations before any data is fetched.
    pub fn validate(&self) -> Result<()> {
        if self.events.is_empty() {
            return Err(EventStudyError::InvalidConfig("no events configured".into()));
        }
        if let Some(spec) = self.events.iter().find(|e| e.ticker.trim().is_empty()) {
            return Err(EventStudyError::InvalidConfig(format!(
                "event on {} has an empty ticker",
                spec.event_date
            )));
        }
        if self.benchmark.trim().is_empty() {
            return Err(EventStudyError::InvalidConfig("benchmark ticker is empty".into()));
        }
        if self.windows.is_empty() {
            return Err(EventStudyError::InvalidConfig("no windows configured".into()));
        }
        let mut labels = HashSet::new();
        for window in &self.windows {
            if window.days == 0 {
                return Err(EventStudyError::InvalidConfig(format!(
                    "window {} has zero days",
                    window.label
                )));
            }
            if !labels.insert(window.label.as_str()) {
                return Err(EventStudyError::InvalidConfig(format!(
                    "duplicate window label {}",
                    window.label
                )));
            }
        }
        if self.max_concurrency == 0 {
            return Err(EventStudyError::InvalidConfig("max_concurrency must be positive".into()));
        }
        if let Some(range) = self.history {
            DateRange::new(range.start, range.end)?;
        }
        Ok(())
    }

    /// History range to request from the price source.
    ///
    /// Without an explicit `history`, spans twice the largest window on each
    /// side of the earliest and latest event.
    pub fn fetch_range(&self) -> Result<DateRange> {
        if let Some(range) = self.history {
            return DateRange::new(range.start, range.end);
        }
        let (Some(first), Some(last)) = (
            self.events.iter().map(|e| e.event_date).min(),
            self.events.iter().map(|e| e.event_date).max(),
        ) else {
            return Err(EventStudyError::InvalidConfig("no events configured".into()));
        };
        let widest = self.windows.iter().map(|w| w.days).max().unwrap_or(0);
        let pad = Days::new(2 * u64::from(widest));
        DateRange::new(
            first.checked_sub_days(pad).unwrap_or(NaiveDate::MIN),
            last.checked_add_days(pad).unwrap_or(NaiveDate::MAX),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn config() -> StudyConfig {
        StudyConfig {
            events: vec![
                EventSpec::new("AAPL", date(2020, 8, 31)),
                EventSpec::new("TSLA", date(2020, 8, 31)),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_minimal_json() {
        let json = r#"{
            "events": [
                {"stock_symbol": "T", "event_date": "2018-06-14"},
                {"ticker": "NVDA", "event_date": "2021-07-20"}
            ],
            "windows": [{"label": "1m", "days": 30}],
            "window_mode": "trading_days",
            "test_direction": "greater"
        }"#;

        let cfg = StudyConfig::from_json_str(json).unwrap();
        assert_eq!(cfg.events[0], EventSpec::new("T", date(2018, 6, 14)));
        assert_eq!(cfg.benchmark, "^GSPC");
        assert_eq!(cfg.window_mode, WindowMode::TradingDays);
        assert_eq!(cfg.test_direction, TestDirection::Greater);
        assert_eq!(cfg.volatility_basis, VolatilityBasis::StockReturns);
        assert_eq!(cfg.max_concurrency, 4);
        cfg.validate().unwrap();
    }

    #[test]
    fn test_defaults_validate() {
        let cfg = config();
        cfg.validate().unwrap();
        assert_eq!(cfg.windows.len(), 3);
    }

    #[rstest]
    #[case::no_events(StudyConfig { events: vec![], ..config() })]
    #[case::no_windows(StudyConfig { windows: vec![], ..config() })]
    #[case::zero_window(StudyConfig { windows: vec![WindowSpec::new("0d", 0)], ..config() })]
    #[case::duplicate_label(StudyConfig {
        windows: vec![WindowSpec::new("1w", 7), WindowSpec::new("1w", 5)],
        ..config()
    })]
    #[case::empty_benchmark(StudyConfig { benchmark: " ".into(), ..config() })]
    #[case::zero_concurrency(StudyConfig { max_concurrency: 0, ..config() })]
    #[case::inverted_history(StudyConfig {
        history: Some(DateRange { start: date(2025, 1, 1), end: date(2010, 1, 1) }),
        ..config()
    })]
    fn test_invalid_configs_are_fatal(#[case] cfg: StudyConfig) {
        let err = cfg.validate().unwrap_err();
        assert!(err.is_fatal(), "{err}");
    }

    #[test]
    fn test_fetch_range_padding() {
        let cfg = StudyConfig {
            events: vec![
                EventSpec::new("A", date(2020, 3, 1)),
                EventSpec::new("B", date(2020, 1, 1)),
            ],
            windows: vec![WindowSpec::new("1w", 7), WindowSpec::new("1m", 30)],
            ..Default::default()
        };
        let range = cfg.fetch_range().unwrap();
        assert_eq!(range.start, date(2019, 11, 2));
        assert_eq!(range.end, date(2020, 4, 30));
        assert!(range.contains(date(2020, 2, 1)));
    }

    #[test]
    fn test_explicit_history_wins() {
        let history = DateRange::new(date(2010, 1, 1), date(2025, 1, 1)).unwrap();
        let cfg = StudyConfig {
            history: Some(history),
            ..config()
        };
        assert_eq!(cfg.fetch_range().unwrap(), history);
    }
}
