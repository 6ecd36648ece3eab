//! Event window extraction.
//!
//! Slices any date-ordered series around an event date and pairs each row with
//! its signed distance from the event in calendar days.
//!
//! Two windowing modes are supported:
//! - [`WindowMode::CalendarDays`]: `[A-W, A+W]`, strict pre `[A-W, A-1]`,
//!   strict post `[A+1, A+W]`
//! - [`WindowMode::TradingDays`]: the `W` rows before the event, the `W` rows
//!   after it, and for the symmetric window both plus the event row itself
//!
//! Strict pre/post windows never contain the event date, so they are disjoint.

use crate::{
    EventStudyError, Result, abnormal::AbnormalReturn, config::WindowMode, series::Dated,
};
use chrono::{Days, NaiveDate};
use serde::Serialize;

/// A contiguous slice of a series around an event date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventWindow<T> {
    anchor: NaiveDate,
    rows: Vec<T>,
    day_offsets: Vec<i64>,
}

impl<T: Dated + Clone> EventWindow<T> {
    fn from_slice(anchor: NaiveDate, rows: &[T]) -> Self {
        let day_offsets = rows
            .iter()
            .map(|r| (r.date() - anchor).num_days())
            .collect();
        Self {
            anchor,
            rows: rows.to_vec(),
            day_offsets,
        }
    }
}

impl<T> EventWindow<T> {
    /// Event date the window is anchored on.
    pub const fn anchor(&self) -> NaiveDate {
        self.anchor
    }

    /// Rows in date order.
    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    /// Calendar-day offset of each row from the anchor.
    pub fn day_offsets(&self) -> &[i64] {
        &self.day_offsets
    }

    /// Number of rows.
    pub const fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the window is empty.
    pub const fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows paired with their day offsets.
    pub fn iter(&self) -> impl Iterator<Item = (i64, &T)> + '_ {
        self.day_offsets.iter().copied().zip(self.rows.iter())
    }

    /// Rows from the event day onwards (`day_offset >= 0`).
    pub fn from_event(&self) -> impl Iterator<Item = &T> + '_ {
        self.split_at_event().1.iter()
    }

    /// Rows before the event and rows from the event day onwards.
    pub fn split_at_event(&self) -> (&[T], &[T]) {
        let at = self.day_offsets.partition_point(|d| *d < 0);
        self.rows.split_at(at)
    }
}

impl EventWindow<AbnormalReturn> {
    /// Cumulative abnormal return restarted at zero on the first window row.
    pub fn rebased_cumulative(&self) -> Vec<f64> {
        self.rows
            .iter()
            .scan(0.0, |acc, r| {
                *acc += r.abnormal_return;
                Some(*acc)
            })
            .collect()
    }
}

/// Extracts event windows of a fixed size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventWindowExtractor {
    window: u32,
    mode: WindowMode,
}

impl EventWindowExtractor {
    /// Create an extractor for a window of `window` days in the given mode.
    pub const fn new(window: u32, mode: WindowMode) -> Self {
        Self { window, mode }
    }

    /// Window size in days.
    pub const fn window(&self) -> u32 {
        self.window
    }

    /// Windowing mode.
    pub const fn mode(&self) -> WindowMode {
        self.mode
    }

    /// Symmetric window around `anchor`.
    ///
    /// The anchor does not have to be present in `rows`; whatever falls in
    /// range is returned.
    pub fn around<T: Dated + Clone>(&self, rows: &[T], anchor: NaiveDate) -> EventWindow<T> {
        let (start, end) = match self.mode {
            WindowMode::CalendarDays => (
                lower_bound(rows, self.lo(anchor)),
                upper_bound(rows, self.hi(anchor)),
            ),
            WindowMode::TradingDays => {
                let before = lower_bound(rows, anchor);
                let after = upper_bound(rows, anchor);
                (
                    before.saturating_sub(self.window as usize),
                    (after + self.window as usize).min(rows.len()),
                )
            }
        };
        EventWindow::from_slice(anchor, &rows[start..end])
    }

    /// Strict pre-event window, never containing `anchor`.
    ///
    /// # Errors
    /// In trading-day mode, [`EventStudyError::InsufficientWindow`] when fewer
    /// than `window` rows precede the anchor.
    pub fn before<T: Dated + Clone>(&self, rows: &[T], anchor: NaiveDate) -> Result<EventWindow<T>> {
        let end = lower_bound(rows, anchor);
        let start = match self.mode {
            WindowMode::CalendarDays => lower_bound(rows, self.lo(anchor)),
            WindowMode::TradingDays => {
                self.ensure_full(end)?;
                end - self.window as usize
            }
        };
        Ok(EventWindow::from_slice(anchor, &rows[start..end]))
    }

    /// Strict post-event window, never containing `anchor`.
    ///
    /// # Errors
    /// In trading-day mode, [`EventStudyError::InsufficientWindow`] when fewer
    /// than `window` rows follow the anchor.
    pub fn after<T: Dated + Clone>(&self, rows: &[T], anchor: NaiveDate) -> Result<EventWindow<T>> {
        let start = upper_bound(rows, anchor);
        let end = match self.mode {
            WindowMode::CalendarDays => upper_bound(rows, self.hi(anchor)),
            WindowMode::TradingDays => {
                self.ensure_full(rows.len() - start)?;
                start + self.window as usize
            }
        };
        Ok(EventWindow::from_slice(anchor, &rows[start..end]))
    }

    fn ensure_full(&self, available: usize) -> Result<()> {
        let required = self.window as usize;
        if available < required {
            return Err(EventStudyError::InsufficientWindow {
                required,
                available,
            });
        }
        Ok(())
    }

    fn lo(&self, anchor: NaiveDate) -> NaiveDate {
        anchor
            .checked_sub_days(Days::new(u64::from(self.window)))
            .unwrap_or(NaiveDate::MIN)
    }

    fn hi(&self, anchor: NaiveDate) -> NaiveDate {
        anchor
            .checked_add_days(Days::new(u64::from(self.window)))
            .unwrap_or(NaiveDate::MAX)
    }
}

/// Index of the first row dated on or after `date`.
fn lower_bound<T: Dated>(rows: &[T], date: NaiveDate) -> usize {
    rows.partition_point(|r| r.date() < date)
}

/// Index one past the last row dated on or before `date`.
fn upper_bound<T: Dated>(rows: &[T], date: NaiveDate) -> usize {
    rows.partition_point(|r| r.date() <= date)
}
