#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/event-study/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod abnormal;
pub mod batch;
pub mod config;
pub mod error;
pub mod series;
pub mod significance;
pub mod source;
pub mod volatility;
pub mod window;

// Re-export core types
pub use abnormal::{AbnormalReturn, AbnormalReturnEngine, AbnormalReturnSeries};
pub use batch::{
    BatchReport, BatchRunner, EventAnalysis, EventResult, SkippedEvent, SortKey, SummaryTable,
    analyze_event,
};
pub use config::{
    DateRange, EventSpec, StudyConfig, TestDirection, VolatilityBasis, WindowMode, WindowSpec,
};
pub use error::{EventStudyError, Result};
pub use series::{Dated, PriceBar, PriceSeries, ReturnPoint, ReturnSeries, normalize};
pub use significance::{SignificanceTester, TestOutcome};
pub use source::{CsvDirectorySource, InMemorySource, PriceSource};
pub use volatility::{VolatilityComparison, VolatilityVolumeComparator};
pub use window::{EventWindow, EventWindowExtractor};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
