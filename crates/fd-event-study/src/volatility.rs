//! Pre-event versus post-event volatility and volume.
//!
//! Volatility is the sample standard deviation of daily returns over a
//! partition; volume is the arithmetic mean over the same partition. Both
//! partitions come from the strict pre/post windows of
//! [`EventWindowExtractor`](crate::EventWindowExtractor), so the event day is
//! never counted on either side.

use crate::{EventStudyError, Result, series::PriceBar};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Volatility and volume on either side of an event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolatilityComparison {
    /// Standard deviation of pre-event returns
    pub pre_volatility: f64,
    /// Standard deviation of post-event returns
    pub post_volatility: f64,
    /// Mean pre-event volume
    pub pre_avg_volume: f64,
    /// Mean post-event volume
    pub post_avg_volume: f64,
}

/// Compares return volatility and volume across the event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VolatilityVolumeComparator;

impl VolatilityVolumeComparator {
    /// Minimum number of returns per partition for a standard deviation.
    pub const MIN_OBSERVATIONS: usize = 2;

    /// Compare pre- and post-event partitions.
    ///
    /// Non-finite returns and volumes are ignored.
    ///
    /// # Errors
    /// [`EventStudyError::InsufficientWindow`] when either partition has
    /// fewer than [`Self::MIN_OBSERVATIONS`] returns or no volume.
    pub fn compare(
        pre_returns: &[f64],
        post_returns: &[f64],
        pre_volume: &[f64],
        post_volume: &[f64],
    ) -> Result<VolatilityComparison> {
        Ok(VolatilityComparison {
            pre_volatility: sample_std(pre_returns)?,
            post_volatility: sample_std(post_returns)?,
            pre_avg_volume: mean(pre_volume)?,
            post_avg_volume: mean(post_volume)?,
        })
    }
}

/// Sample standard deviation (`n - 1` denominator) of the finite values.
pub fn sample_std(values: &[f64]) -> Result<f64> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let n = finite.len();
    if n < VolatilityVolumeComparator::MIN_OBSERVATIONS {
        return Err(EventStudyError::InsufficientWindow {
            required: VolatilityVolumeComparator::MIN_OBSERVATIONS,
            available: n,
        });
    }
    Ok(finite.iter().std_dev())
}

/// Arithmetic mean of the finite values.
pub fn mean(values: &[f64]) -> Result<f64> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return Err(EventStudyError::InsufficientWindow {
            required: 1,
            available: 0,
        });
    }
    Ok(finite.iter().mean())
}

/// Gross return over a run of bars: `last.close / first.close - 1`.
///
/// Returns `None` for fewer than two bars.
pub fn gross_return(bars: &[PriceBar]) -> Option<f64> {
    match bars {
        [first, .., last] => Some(last.close / first.close - 1.0),
        _ => None,
    }
}
