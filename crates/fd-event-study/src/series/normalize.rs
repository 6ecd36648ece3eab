//! Price series normalization.
//!
//! Turns a raw source frame into a canonical [`PriceSeries`] and derives the
//! daily simple return `r_t = close_t / close_{t-1} - 1`.
//!
//! Non-trading days are simply absent from the output; rows without a close
//! are dropped rather than zero-filled.

use super::{PriceBar, PriceSeries};
use crate::{EventStudyError, Result};
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;

/// Columns a raw price frame must carry.
pub const REQUIRED_COLUMNS: [&str; 3] = ["date", "close", "volume"];

/// Days from 0001-01-01 to 1970-01-01, the epoch of polars `Date` values.
const UNIX_EPOCH_FROM_CE: i32 = 719_163;

/// Normalize a raw price frame into a typed [`PriceSeries`].
///
/// The `date` column may be a `Date`, a `Datetime` or a string column in
/// `YYYY-MM-DD` form (zero padding optional, trailing time ignored); `close`
/// and `volume` may be any numeric type. Rows are ordered by the parsed date.
/// The input frame is not modified.
///
/// # Errors
/// - [`EventStudyError::MissingData`] when the frame has no usable rows
/// - [`EventStudyError::MissingColumn`] when a required column is absent
/// - [`EventStudyError::InvalidDate`] when a date string cannot be parsed
/// - [`EventStudyError::DuplicateDate`] when a date occurs twice
pub fn normalize(ticker: &str, raw: &DataFrame) -> Result<PriceSeries> {
    if raw.height() == 0 {
        return Err(EventStudyError::MissingData {
            ticker: ticker.to_string(),
        });
    }
    for name in REQUIRED_COLUMNS {
        if raw.column(name).is_err() {
            return Err(EventStudyError::MissingColumn(name.to_string()));
        }
    }

    let frame = with_typed_dates(raw.clone())?
        .lazy()
        .select([
            col("date").cast(DataType::Int32).alias("day"),
            col("close").cast(DataType::Float64),
            col("volume")
                .cast(DataType::Float64)
                .fill_null(lit(f64::NAN)),
        ])
        .filter(col("day").is_not_null().and(col("close").is_not_null()))
        .sort(["day"], SortMultipleOptions::default())
        .with_column(col("close").shift(lit(1)).alias("close_lag"))
        .with_column((col("close") / col("close_lag") - lit(1.0)).alias("return"))
        .collect()?;

    if frame.height() == 0 {
        return Err(EventStudyError::MissingData {
            ticker: ticker.to_string(),
        });
    }

    let days = frame.column("day")?.i32()?;
    let closes = frame.column("close")?.f64()?;
    let volumes = frame.column("volume")?.f64()?;
    let returns = frame.column("return")?.f64()?;

    let mut bars: Vec<PriceBar> = Vec::with_capacity(frame.height());
    let rows = days
        .into_iter()
        .zip(closes.into_iter())
        .zip(volumes.into_iter())
        .zip(returns.into_iter());
    for (((day, close), volume), ret) in rows {
        let date = day.and_then(from_epoch_days).ok_or_else(|| {
            EventStudyError::InvalidDate(format!("day {day:?} out of range for {ticker}"))
        })?;
        let close = close.ok_or_else(|| {
            EventStudyError::Computation(format!("null close for {ticker} on {date}"))
        })?;
        match bars.last() {
            Some(prev) if prev.date == date => {
                return Err(EventStudyError::DuplicateDate {
                    ticker: ticker.to_string(),
                    date,
                });
            }
            Some(prev) if prev.date > date => {
                return Err(EventStudyError::Computation(format!(
                    "{ticker}: {date} follows {}",
                    prev.date
                )));
            }
            _ => {}
        }
        bars.push(PriceBar {
            date,
            close,
            volume: volume.unwrap_or(f64::NAN),
            ret,
        });
    }

    Ok(PriceSeries::new(ticker.to_string(), bars))
}

/// Replace the `date` column of `frame` with a polars `Date` column.
///
/// String dates go through [`parse_date`]; every other type is cast.
pub(crate) fn with_typed_dates(mut frame: DataFrame) -> Result<DataFrame> {
    if frame.column("date")?.dtype() == &DataType::Date {
        return Ok(frame);
    }
    let raw = frame.column("date")?;
    let typed = match raw.dtype() {
        DataType::String => {
            let days = raw
                .str()?
                .into_iter()
                .map(|v| v.map(|s| parse_date(s).map(epoch_days)).transpose())
                .collect::<Result<Vec<Option<i32>>>>()?;
            Column::new("date".into(), days).cast(&DataType::Date)?
        }
        _ => raw.cast(&DataType::Date)?,
    };
    frame.with_column(typed)?;
    Ok(frame)
}

/// Days since 1970-01-01, the physical value of a polars `Date`.
pub(crate) fn epoch_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_FROM_CE
}

fn from_epoch_days(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(UNIX_EPOCH_FROM_CE)?)
}

/// Parse an ISO date, tolerating a trailing time component.
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    let day = value.split([' ', 'T']).next().unwrap_or(value);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|e| EventStudyError::InvalidDate(format!("{value}: {e}")))
}
