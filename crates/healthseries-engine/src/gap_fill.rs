// ABOUTME: Forward-fill value source over admitted readings of one metric
// ABOUTME: Returns the reading on a date, else the most recent admitted prior reading
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Value resolved for a date
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilledValue {
    /// Value in kg
    pub value: f64,
    /// Date the value was actually observed
    pub source_date: NaiveDate,
    /// Whether the value was observed on the requested date
    pub observed: bool,
}

/// Admitted readings of a single metric keyed by date
#[derive(Debug, Clone, Default)]
pub struct GapFillSource {
    readings: BTreeMap<NaiveDate, f64>,
}

impl GapFillSource {
    /// Empty source
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an admitted reading
    pub fn admit(&mut self, date: NaiveDate, value: f64) {
        self.readings.insert(date, value);
    }

    /// Reading on `date` if admitted, else the latest admitted reading before it
    ///
    /// `None` only when nothing has been admitted on or before `date`.
    #[must_use]
    pub fn resolve_value(&self, date: NaiveDate) -> Option<FilledValue> {
        self.readings
            .range(..=date)
            .next_back()
            .map(|(source_date, value)| FilledValue {
                value: *value,
                source_date: *source_date,
                observed: *source_date == date,
            })
    }

    /// Admitted reading on exactly `date`
    #[must_use]
    pub fn observed_on(&self, date: NaiveDate) -> Option<f64> {
        self.readings.get(&date).copied()
    }
}
