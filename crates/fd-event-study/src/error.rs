//! Error types for event-study computations.

use chrono::NaiveDate;
use thiserror::Error;

/// Result type for event-study operations.
pub type Result<T> = std::result::Result<T, EventStudyError>;

/// Errors that can occur while analyzing events.
///
/// Everything except the configuration variants is recovered at the
/// per-event boundary of the batch runner and turned into a skip.
#[derive(Debug, Error)]
pub enum EventStudyError {
    /// The data source returned no rows for a ticker
    #[error("No price data for {ticker}")]
    MissingData {
        /// Ticker with the empty series
        ticker: String,
    },

    /// The event date is not a trading day of the stock
    #[error("Event date {date} not in trading calendar of {ticker}")]
    EventDateAbsent {
        /// Ticker being analyzed
        ticker: String,
        /// Requested event date
        date: NaiveDate,
    },

    /// A pre/post partition holds fewer observations than needed
    #[error("Insufficient window: need {required} observations, got {available}")]
    InsufficientWindow {
        /// Required number of observations
        required: usize,
        /// Available number of observations
        available: usize,
    },

    /// A statistical test was asked to run on zero valid observations
    #[error("Empty sample: no valid observations to test")]
    EmptySample,

    /// Missing required column in a source frame
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// A source frame repeats a date
    #[error("Duplicate date {date} in price series of {ticker}")]
    DuplicateDate {
        /// Ticker of the offending series
        ticker: String,
        /// Repeated date
        date: NaiveDate,
    },

    /// A date value could not be parsed
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// The price source failed for a ticker
    #[error("Price source failed for {ticker}: {message}")]
    Source {
        /// Ticker being fetched
        ticker: String,
        /// Failure description
        message: String,
    },

    /// Polars DataFrame error
    #[error("DataFrame error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Distribution construction error
    #[error("Statistics error: {0}")]
    Statistics(String),

    /// Computation error
    #[error("Computation error: {0}")]
    Computation(String),

    /// Malformed batch configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid date range
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        /// Start date of the range
        start: NaiveDate,
        /// End date of the range
        end: NaiveDate,
    },

    /// Configuration file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EventStudyError {
    /// Whether this error must abort a run instead of skipping one event.
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig(_) | Self::InvalidDateRange { .. } | Self::Io(_) | Self::Json(_)
        )
    }
}
