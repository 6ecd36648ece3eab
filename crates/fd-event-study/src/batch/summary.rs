//! Summary records and their per-batch table.

use crate::{Result, significance::SignificanceTester, significance::TestOutcome};
use chrono::NaiveDate;
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Summary of one successfully analyzed event.
///
/// Percent fields are scaled by 100; volumes are raw means.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventResult {
    /// Ticker symbol
    pub ticker: String,
    /// Label of the window size, e.g. `1w`
    pub window_label: String,
    /// Event date
    pub event_date: NaiveDate,
    /// Cumulative abnormal return from the event day to the window end, in percent
    pub car_post_pct: f64,
    /// Cumulative abnormal return over the whole symmetric window, in percent
    pub car_full_pct: f64,
    /// t statistic of the post-event abnormal returns
    pub t_stat: f64,
    /// p-value of the post-event abnormal returns
    pub p_value: f64,
    /// Pre-event volatility, in percent
    pub pre_volatility_pct: f64,
    /// Post-event volatility, in percent
    pub post_volatility_pct: f64,
    /// Mean pre-event volume
    pub pre_avg_volume: f64,
    /// Mean post-event volume
    pub post_avg_volume: f64,
    /// Stock minus benchmark gross return over the pre-event window, in percent
    pub pre_relative_return_pct: Option<f64>,
    /// Stock minus benchmark gross return over the post-event window, in percent
    pub post_relative_return_pct: Option<f64>,
}

/// Ordering applied to a [`SummaryTable`] on request.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Ticker, then input order
    Ticker,
    /// Event date, then input order
    EventDate,
}

/// Insertion-ordered summary records of one batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SummaryTable {
    rows: Vec<EventResult>,
}

impl SummaryTable {
    /// Create an empty table.
    pub const fn new() -> Self {
        Self { rows: Vec::new() }
    }

    /// Append a record.
    pub fn push(&mut self, result: EventResult) {
        self.rows.push(result);
    }

    /// Append every record of `other`, keeping both orders.
    pub fn merge(&mut self, other: Self) {
        self.rows.extend(other.rows);
    }

    /// Records in table order.
    pub fn rows(&self) -> &[EventResult] {
        &self.rows
    }

    /// Iterate over the records.
    pub fn iter(&self) -> std::slice::Iter<'_, EventResult> {
        self.rows.iter()
    }

    /// Number of records.
    pub const fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table is empty.
    pub const fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Stable sort by `key`.
    pub fn sort_by(&mut self, key: SortKey) {
        match key {
            SortKey::Ticker => self.rows.sort_by(|a, b| a.ticker.cmp(&b.ticker)),
            SortKey::EventDate => self.rows.sort_by_key(|r| r.event_date),
        }
    }

    /// Paired t-test of pre- versus post-event volatility across all records.
    ///
    /// Records with a non-finite volatility on either side are omitted.
    pub fn volatility_shift_test(&self, tester: &SignificanceTester) -> Result<TestOutcome> {
        let before: Vec<Option<f64>> = self.rows.iter().map(|r| Some(r.pre_volatility_pct)).collect();
        let after: Vec<Option<f64>> = self.rows.iter().map(|r| Some(r.post_volatility_pct)).collect();
        tester.paired(&before, &after)
    }
}

impl IntoIterator for SummaryTable {
    type Item = EventResult;
    type IntoIter = std::vec::IntoIter<EventResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a SummaryTable {
    type Item = &'a EventResult;
    type IntoIter = std::slice::Iter<'a, EventResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

impl FromIterator<EventResult> for SummaryTable {
    fn from_iter<I: IntoIterator<Item = EventResult>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventStudyError;
    use approx::assert_abs_diff_eq;

    fn record(ticker: &str, day: u32, pre: f64, post: f64) -> EventResult {
        EventResult {
            ticker: ticker.to_string(),
            window_label: "1w".to_string(),
            event_date: NaiveDate::from_ymd_opt(2020, 6, day).unwrap(),
            car_post_pct: 0.0,
            car_full_pct: 0.0,
            t_stat: 0.0,
            p_value: 1.0,
            pre_volatility_pct: pre,
            post_volatility_pct: post,
            pre_avg_volume: 0.0,
            post_avg_volume: 0.0,
            pre_relative_return_pct: None,
            post_relative_return_pct: None,
        }
    }

    #[test]
    fn test_sort_is_stable_and_optional() {
        let mut table: SummaryTable = [
            record("MSFT", 3, 1.0, 1.0),
            record("AAPL", 9, 1.0, 1.0),
            record("MSFT", 1, 1.0, 1.0),
        ]
        .into_iter()
        .collect();

        let tickers: Vec<_> = table.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(tickers, ["MSFT", "AAPL", "MSFT"]);

        table.sort_by(SortKey::Ticker);
        let days: Vec<_> = table.iter().map(|r| r.event_date.format("%d").to_string()).collect();
        assert_eq!(days, ["09", "03", "01"]);

        table.sort_by(SortKey::EventDate);
        assert_eq!(table.rows()[0].event_date, NaiveDate::from_ymd_opt(2020, 6, 1).unwrap());
    }

    #[test]
    fn test_merge_keeps_order() {
        let mut weekly = SummaryTable::new();
        weekly.push(record("A", 1, 1.0, 1.0));
        let mut monthly = SummaryTable::new();
        monthly.push(record("B", 2, 1.0, 1.0));
        monthly.push(record("C", 3, 1.0, 1.0));

        weekly.merge(monthly);
        let tickers: Vec<_> = weekly.into_iter().map(|r| r.ticker).collect();
        assert_eq!(tickers, ["A", "B", "C"]);
    }

    #[test]
    fn test_volatility_shift_test() {
        let table: SummaryTable = [
            record("A", 1, 1.0, 2.0),
            record("B", 2, 2.0, 4.0),
            record("C", 3, 3.0, 6.0),
            record("D", 4, f64::NAN, 1.0),
        ]
        .into_iter()
        .collect();

        let outcome = table.volatility_shift_test(&SignificanceTester::default()).unwrap();
        assert_eq!(outcome.observations, 3);
        assert_abs_diff_eq!(outcome.statistic, -3.464_101_615, epsilon = 1e-8);

        let err = SummaryTable::new()
            .volatility_shift_test(&SignificanceTester::default())
            .unwrap_err();
        assert!(matches!(err, EventStudyError::EmptySample));
    }

    #[test]
    fn test_serializes_as_list() {
        let table: SummaryTable = std::iter::once(record("A", 1, 1.0, 2.0)).collect();
        let json = serde_json::to_value(&table).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["ticker"], "A");
        assert_eq!(json[0]["event_date"], "2020-06-01");
    }
}
