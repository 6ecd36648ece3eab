//! Benchmark-relative abnormal returns.
//!
//! The abnormal return of a stock on day `t` is its realized return minus the
//! benchmark's realized return on the same day:
//! `AR_t = R_stock,t - R_bench,t`
//!
//! The cumulative abnormal return is the running sum
//! `CAR_k = Σ_{t ≤ k} AR_t` over the joined, date-ordered rows.

use crate::series::{Dated, ReturnSeries};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One joined day of stock and benchmark returns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AbnormalReturn {
    /// Trading date present in both inputs
    pub date: NaiveDate,
    /// Stock return on the date
    pub stock_return: f64,
    /// Benchmark return on the date
    pub benchmark_return: f64,
    /// `stock_return - benchmark_return`
    pub abnormal_return: f64,
    /// Running sum of `abnormal_return` up to and including this row
    pub cumulative_abnormal_return: f64,
}

impl Dated for AbnormalReturn {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

/// Abnormal returns on the inner join of two return series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AbnormalReturnSeries {
    rows: Vec<AbnormalReturn>,
}

impl AbnormalReturnSeries {
    /// Joined rows in date order.
    pub fn rows(&self) -> &[AbnormalReturn] {
        &self.rows
    }

    /// Number of joined rows.
    pub const fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the join produced no rows.
    pub const fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Computes abnormal and cumulative abnormal returns against a benchmark.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbnormalReturnEngine;

impl AbnormalReturnEngine {
    /// Join `stock` and `benchmark` on date and derive abnormal returns.
    ///
    /// A date enters the output only when both series carry a return for it.
    /// Dates missing from either side, or whose return is missing on either
    /// side, are left out entirely, so the running sum simply carries over
    /// them.
    pub fn compute(stock: &ReturnSeries, benchmark: &ReturnSeries) -> AbnormalReturnSeries {
        let lhs = stock.points();
        let rhs = benchmark.points();
        let mut rows = Vec::with_capacity(lhs.len().min(rhs.len()));
        let mut cumulative = 0.0;

        let (mut i, mut j) = (0, 0);
        while i < lhs.len() && j < rhs.len() {
            match lhs[i].date.cmp(&rhs[j].date) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    if let (Some(s), Some(b)) = (lhs[i].value, rhs[j].value) {
                        let abnormal = s - b;
                        cumulative += abnormal;
                        rows.push(AbnormalReturn {
                            date: lhs[i].date,
                            stock_return: s,
                            benchmark_return: b,
                            abnormal_return: abnormal,
                            cumulative_abnormal_return: cumulative,
                        });
                    }
                    i += 1;
                    j += 1;
                }
            }
        }

        AbnormalReturnSeries { rows }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::ReturnPoint;
    use approx::assert_relative_eq;
    use rand::{Rng, SeedableRng, rngs::StdRng};
    use std::collections::HashSet;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 6, d).unwrap()
    }

    fn series(ticker: &str, points: &[(u32, Option<f64>)]) -> ReturnSeries {
        ReturnSeries::from_points(
            ticker.to_string(),
            points
                .iter()
                .map(|&(d, value)| ReturnPoint {
                    date: day(d),
                    value,
                })
                .collect(),
        )
    }

    #[test]
    fn test_join_keeps_only_shared_valid_dates() {
        let stock = series(
            "X",
            &[(1, None), (2, Some(0.01)), (3, Some(0.02)), (5, Some(-0.01)), (8, Some(0.03))],
        );
        let bench = series(
            "B",
            &[(1, None), (2, Some(0.005)), (4, Some(0.0)), (5, None), (8, Some(0.01))],
        );

        let joined = AbnormalReturnEngine::compute(&stock, &bench);
        let dates: Vec<_> = joined.rows().iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![day(2), day(8)]);

        let stock_dates: HashSet<_> = stock.points().iter().map(|p| p.date).collect();
        let bench_dates: HashSet<_> = bench.points().iter().map(|p| p.date).collect();
        for row in joined.rows() {
            assert!(stock_dates.contains(&row.date));
            assert!(bench_dates.contains(&row.date));
        }

        assert_relative_eq!(joined.rows()[0].abnormal_return, 0.005, epsilon = 1e-12);
        assert_relative_eq!(joined.rows()[1].abnormal_return, 0.02, epsilon = 1e-12);
        assert_relative_eq!(joined.rows()[1].cumulative_abnormal_return, 0.025, epsilon = 1e-12);
    }

    #[test]
    fn test_flat_benchmark_leaves_stock_returns() {
        let stock = series("X", &[(1, Some(0.01)), (2, Some(-0.02)), (3, Some(0.03))]);
        let bench = series("B", &[(1, Some(0.0)), (2, Some(0.0)), (3, Some(0.0))]);

        let joined = AbnormalReturnEngine::compute(&stock, &bench);
        for (row, point) in joined.rows().iter().zip(stock.points()) {
            assert_eq!(row.abnormal_return, point.value.unwrap());
        }
    }

    #[test]
    fn test_disjoint_series_join_is_empty() {
        let stock = series("X", &[(1, Some(0.01)), (3, Some(0.02))]);
        let bench = series("B", &[(2, Some(0.01)), (4, Some(0.02))]);
        assert!(AbnormalReturnEngine::compute(&stock, &bench).is_empty());
    }

    #[test]
    fn test_cumulative_is_prefix_sum() {
        let mut rng = StdRng::seed_from_u64(17);
        let mut stock_points = Vec::new();
        let mut bench_points = Vec::new();
        for d in 1..=30 {
            if rng.gen_range(0.0..1.0) > 0.2 {
                stock_points.push((d, Some(rng.gen_range(-0.05..0.05))));
            }
            if rng.gen_range(0.0..1.0) > 0.2 {
                bench_points.push((d, Some(rng.gen_range(-0.02..0.02))));
            }
        }

        let joined = AbnormalReturnEngine::compute(
            &series("X", &stock_points),
            &series("B", &bench_points),
        );
        assert!(!joined.is_empty());

        let mut expected = 0.0;
        for row in joined.rows() {
            assert_relative_eq!(
                row.abnormal_return,
                row.stock_return - row.benchmark_return,
                epsilon = 1e-15
            );
            expected += row.abnormal_return;
            assert_relative_eq!(row.cumulative_abnormal_return, expected, epsilon = 1e-12);
        }
    }
}
