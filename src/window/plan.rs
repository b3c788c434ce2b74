//! Calendar windowing of the collection range.
//!
//! The API caps every response at a fixed number of records, so the full
//! range is queried in fixed-size calendar windows. Window `k` starts at
//! `start + k * months`, measured from the original start to avoid month-end
//! drift, and ends the day before window `k + 1` starts. The last window is
//! cut at `end`.

use std::iter::FusedIterator;

use chrono::{Months, NaiveDate};

use crate::domain::QueryWindow;
use crate::error::AppError;

/// Validated description of a windowed range. Iterate it as often as needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPlan {
    start: NaiveDate,
    end: NaiveDate,
    months: u32,
}

impl WindowPlan {
    pub fn new(start: NaiveDate, end: NaiveDate, months: u32) -> Result<Self, AppError> {
        if months == 0 {
            return Err(AppError::config("Window size must be at least one month."));
        }
        if end < start {
            return Err(AppError::config(format!(
                "Collection end {end} is before collection start {start}."
            )));
        }
        Ok(Self { start, end, months })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn months(&self) -> u32 {
        self.months
    }

    /// Fresh iterator from the first window.
    pub fn iter(&self) -> Windows {
        Windows {
            plan: *self,
            index: 0,
            done: false,
        }
    }
}

impl IntoIterator for &WindowPlan {
    type Item = QueryWindow;
    type IntoIter = Windows;

    fn into_iter(self) -> Windows {
        self.iter()
    }
}

/// Lazy iterator over the windows of a [`WindowPlan`].
#[derive(Debug, Clone)]
pub struct Windows {
    plan: WindowPlan,
    index: u32,
    done: bool,
}

impl Windows {
    fn nth_start(&self, k: u32) -> Option<NaiveDate> {
        let offset = k.checked_mul(self.plan.months)?;
        self.plan.start.checked_add_months(Months::new(offset))
    }
}

impl Iterator for Windows {
    type Item = QueryWindow;

    fn next(&mut self) -> Option<QueryWindow> {
        if self.done {
            return None;
        }

        let Some(start) = self.nth_start(self.index) else {
            self.done = true;
            return None;
        };
        if start > self.plan.end {
            self.done = true;
            return None;
        }

        let end = match self.nth_start(self.index + 1).and_then(|next| next.pred_opt()) {
            Some(day_before_next) if day_before_next < self.plan.end => day_before_next,
            _ => {
                self.done = true;
                self.plan.end
            }
        };

        self.index += 1;
        Some(QueryWindow { start, end })
    }
}

impl FusedIterator for Windows {}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn plan_windows(start: NaiveDate, end: NaiveDate, months: u32) -> Result<Vec<QueryWindow>, AppError> {
        Ok(WindowPlan::new(start, end, months)?.iter().collect())
    }

    fn assert_contiguous_cover(windows: &[QueryWindow], start: NaiveDate, end: NaiveDate) {
        assert!(!windows.is_empty());
        assert_eq!(windows[0].start, start);
        assert_eq!(windows[windows.len() - 1].end, end);
        for w in windows {
            assert!(w.start <= w.end, "inverted window {w}");
        }
        for pair in windows.windows(2) {
            assert_eq!(pair[0].end.succ_opt().unwrap(), pair[1].start, "gap or overlap at {}", pair[0]);
        }
    }

    #[test]
    fn half_year_windows_up_to_mid_2024() {
        let today = d(2024, 6, 15);
        let windows = plan_windows(d(2018, 1, 1), today, 6).unwrap();

        assert_eq!(windows.len(), 13);
        assert_eq!(windows[0], QueryWindow { start: d(2018, 1, 1), end: d(2018, 6, 30) });
        assert_eq!(windows[1], QueryWindow { start: d(2018, 7, 1), end: d(2018, 12, 31) });
        assert_eq!(windows[11], QueryWindow { start: d(2023, 7, 1), end: d(2023, 12, 31) });
        assert_eq!(windows[12], QueryWindow { start: d(2024, 1, 1), end: today });
        assert_contiguous_cover(&windows, d(2018, 1, 1), today);
    }

    #[test]
    fn windows_never_extend_past_end() {
        let end = d(2025, 10, 3);
        for months in [1, 2, 3, 6, 12] {
            let windows = plan_windows(d(2018, 1, 1), end, months).unwrap();
            assert!(windows.iter().all(|w| w.end <= end));
            assert_contiguous_cover(&windows, d(2018, 1, 1), end);
        }
    }

    #[test]
    fn month_end_start_does_not_drift() {
        let windows = plan_windows(d(2020, 1, 31), d(2020, 12, 31), 1).unwrap();
        assert_contiguous_cover(&windows, d(2020, 1, 31), d(2020, 12, 31));
        assert_eq!(windows[1].start, d(2020, 2, 29));
        assert_eq!(windows[2].start, d(2020, 3, 31));
    }

    #[test]
    fn single_day_range_yields_one_window() {
        let windows = plan_windows(d(2024, 3, 1), d(2024, 3, 1), 6).unwrap();
        assert_eq!(windows, vec![QueryWindow { start: d(2024, 3, 1), end: d(2024, 3, 1) }]);
    }

    #[test]
    fn end_on_boundary_closes_the_last_full_window() {
        let windows = plan_windows(d(2018, 1, 1), d(2018, 12, 31), 6).unwrap();
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[1].end, d(2018, 12, 31));

        let windows = plan_windows(d(2018, 1, 1), d(2019, 1, 1), 6).unwrap();
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[2], QueryWindow { start: d(2019, 1, 1), end: d(2019, 1, 1) });
    }

    #[test]
    fn plan_is_restartable() {
        let plan = WindowPlan::new(d(2018, 1, 1), d(2020, 5, 5), 6).unwrap();
        assert_eq!(plan.months(), 6);
        let first: Vec<_> = plan.iter().collect();
        let second: Vec<_> = (&plan).into_iter().collect();
        assert_eq!(first, second);

        let mut it = plan.iter();
        while it.next().is_some() {}
        assert!(it.next().is_none());
    }

    #[test]
    fn rejects_bad_inputs() {
        assert!(WindowPlan::new(d(2018, 1, 1), d(2019, 1, 1), 0).is_err());
        assert!(WindowPlan::new(d(2019, 1, 1), d(2018, 1, 1), 6).is_err());
    }
}
