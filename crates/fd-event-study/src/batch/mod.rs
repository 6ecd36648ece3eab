//! Multi-event batches.
//!
//! A batch runs every configured event for one window size and produces a
//! [`BatchReport`]. Reports are returned to the caller; nothing accumulates
//! across calls.

pub mod runner;
pub mod summary;

pub use runner::{BatchReport, BatchRunner, EventAnalysis, SkippedEvent, analyze_event};
pub use summary::{EventResult, SortKey, SummaryTable};
