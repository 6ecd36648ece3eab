//! Price data sources.
//!
//! The engine does not download anything itself. A [`PriceSource`] hands it a
//! raw frame with `date`, `close` and `volume` columns for a ticker and date
//! range. An empty frame means "no data" and leads to a skipped event, never
//! to a failed batch.

use crate::{
    DateRange, EventStudyError, Result,
    series::normalize::{epoch_days, with_typed_dates},
};
use async_trait::async_trait;
use polars::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Provider of raw daily price history.
#[async_trait]
pub trait PriceSource: Send + Sync + std::fmt::Debug {
    /// Fetch daily bars of `ticker` within `range`.
    ///
    /// Returns an empty frame when the provider has no data for the ticker.
    async fn fetch(&self, ticker: &str, range: &DateRange) -> Result<DataFrame>;
}

/// Keep only rows dated inside `range`.
///
/// The `date` column is converted to a typed `Date` column first, so string
/// dates compare as calendar dates whatever their padding. Frames without a
/// `date` column are returned as is and rejected later by the normalizer.
///
/// # Errors
/// [`EventStudyError::InvalidDate`] when a date string cannot be parsed.
pub fn restrict_to_range(frame: DataFrame, range: &DateRange) -> Result<DataFrame> {
    if frame.height() == 0 || frame.column("date").is_err() {
        return Ok(frame);
    }
    let day = || col("date").cast(DataType::Int32);
    let filter = day()
        .gt_eq(lit(epoch_days(range.start)))
        .and(day().lt_eq(lit(epoch_days(range.end))));
    Ok(with_typed_dates(frame)?.lazy().filter(filter).collect()?)
}

/// Source backed by frames held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    frames: HashMap<String, DataFrame>,
}

impl InMemorySource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the frame of a ticker.
    pub fn insert(&mut self, ticker: impl Into<String>, frame: DataFrame) {
        self.frames.insert(ticker.into(), frame);
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, ticker: impl Into<String>, frame: DataFrame) -> Self {
        self.insert(ticker, frame);
        self
    }
}

#[async_trait]
impl PriceSource for InMemorySource {
    async fn fetch(&self, ticker: &str, range: &DateRange) -> Result<DataFrame> {
        match self.frames.get(ticker) {
            Some(frame) => restrict_to_range(frame.clone(), range),
            None => Ok(DataFrame::empty()),
        }
    }
}

/// Source reading `<dir>/<TICKER>.csv` files.
///
/// Column names are matched case-insensitively, so `Date,Close,Volume` exports
/// work unchanged. A missing file is treated as "no data". Files are read on
/// the tokio blocking pool, so this source must be polled inside a tokio
/// runtime.
#[derive(Debug, Clone)]
pub struct CsvDirectorySource {
    dir: PathBuf,
}

impl CsvDirectorySource {
    /// Create a source over `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the CSV files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{ticker}.csv"))
    }
}

/// Read one price file, `None` when it does not exist.
fn read_price_file(path: &Path) -> PolarsResult<Option<DataFrame>> {
    if !path.is_file() {
        return Ok(None);
    }
    let mut frame = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    let names: Vec<String> = frame
        .get_column_names()
        .iter()
        .map(|n| n.to_lowercase())
        .collect();
    frame.set_column_names(names)?;
    Ok(Some(frame))
}

#[async_trait]
impl PriceSource for CsvDirectorySource {
    async fn fetch(&self, ticker: &str, range: &DateRange) -> Result<DataFrame> {
        let path = self.path_for(ticker);
        let source_error = |message: String| EventStudyError::Source {
            ticker: ticker.to_string(),
            message,
        };
        let read = {
            let path = path.clone();
            tokio::task::spawn_blocking(move || read_price_file(&path))
        };
        let frame = read
            .await
            .map_err(|e| source_error(e.to_string()))?
            .map_err(|e| source_error(e.to_string()))?;
        match frame {
            Some(frame) => restrict_to_range(frame, range),
            None => {
                tracing::debug!(ticker, path = %path.display(), "no price file");
                Ok(DataFrame::empty())
            }
        }
    }
}
