// ABOUTME: Inclusive calendar date range with overlap checks and day iteration
// ABOUTME: Construction rejects ranges whose end precedes their start
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::MaterializationError;

/// Inclusive `[start, end]` span of calendar dates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Build a range, rejecting `end < start`
    ///
    /// # Errors
    ///
    /// Returns `InvalidRange` if `end` precedes `start`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, MaterializationError> {
        if end < start {
            return Err(MaterializationError::InvalidRange(format!(
                "end {end} precedes start {start}"
            )));
        }
        Ok(Self { start, end })
    }

    /// First date
    #[must_use]
    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last date
    #[must_use]
    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days covered
    #[must_use]
    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Whether `date` falls inside the range
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Whether the two ranges share at least one date
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Dates in ascending order
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start
            .iter_days()
            .take_while(move |date| *date <= end)
    }

    /// The day before `start`
    #[must_use]
    pub fn day_before_start(&self) -> Option<NaiveDate> {
        self.start.checked_sub_days(Days::new(1))
    }

    /// Dates a run over this range reads or writes: the seed day plus the range
    #[must_use]
    pub fn with_seed_day(&self) -> Self {
        Self {
            start: self.day_before_start().unwrap_or(self.start),
            end: self.end,
        }
    }

    /// Whether `next` starts on the day after this range ends
    #[must_use]
    pub fn is_followed_by(&self, next: &Self) -> bool {
        self.end.succ_opt() == Some(next.start)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap_or_default()
    }

    #[test]
    fn test_reversed_range_is_rejected() {
        assert!(DateRange::new(date(5), date(4)).is_err());
        assert!(DateRange::new(date(5), date(5)).is_ok());
    }

    #[test]
    fn test_overlap_is_inclusive_at_edges() {
        let a = DateRange::new(date(1), date(10)).unwrap_or_else(|_| unreachable!());
        let b = DateRange::new(date(10), date(20)).unwrap_or_else(|_| unreachable!());
        let c = DateRange::new(date(11), date(20)).unwrap_or_else(|_| unreachable!());
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn test_seed_day_joins_adjacent_ranges() {
        let a = DateRange::new(date(1), date(10)).unwrap_or_else(|_| unreachable!());
        let b = DateRange::new(date(11), date(20)).unwrap_or_else(|_| unreachable!());
        assert!(!a.overlaps(&b));
        assert!(a.is_followed_by(&b));
        assert!(!b.is_followed_by(&a));
        assert_eq!(b.with_seed_day().start(), date(10));
        assert!(a.with_seed_day().overlaps(&b.with_seed_day()));
    }

    #[test]
    fn test_days_iterates_every_date() {
        let range = DateRange::new(date(1), date(7)).unwrap_or_else(|_| unreachable!());
        let days: Vec<_> = range.days().collect();
        assert_eq!(days.len(), 7);
        assert_eq!(range.len_days(), 7);
        assert_eq!(days.first(), Some(&date(1)));
        assert_eq!(days.last(), Some(&date(7)));
    }
}
