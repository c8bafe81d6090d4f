// ABOUTME: In-process registry of date ranges owned by running materializations
// ABOUTME: Overlapping acquisitions are rejected; guards release their range on drop
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

use std::sync::{Arc, Mutex};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::MaterializationError;
use crate::models::DateRange;

/// Ranges currently held by runs
#[derive(Debug, Default)]
pub struct RangeLockRegistry {
    held: Mutex<Vec<(Uuid, DateRange)>>,
}

impl RangeLockRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, Vec<(Uuid, DateRange)>> {
        self.held.lock().unwrap_or_else(|poisoned| {
            warn!("Range lock registry poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Claim `range` and its seed day for `run_id`
    ///
    /// A run reads the day before its start, so two runs conflict when either
    /// one writes a date the other reads or writes.
    ///
    /// # Errors
    ///
    /// `RangeLocked` if any held footprint overlaps this one
    pub fn try_acquire(
        self: &Arc<Self>,
        run_id: Uuid,
        range: DateRange,
    ) -> Result<RangeLockGuard, MaterializationError> {
        let footprint = range.with_seed_day();
        let mut held = self.entries();
        if let Some((owner, _)) = held.iter().find(|(_, other)| other.overlaps(&footprint)) {
            debug!(%run_id, blocking_run = %owner, %range, "Range lock rejected");
            return Err(MaterializationError::RangeLocked {
                start: range.start(),
                end: range.end(),
            });
        }
        held.push((run_id, footprint));
        drop(held);

        debug!(%run_id, %range, "Range lock acquired");
        Ok(RangeLockGuard {
            registry: Arc::clone(self),
            run_id,
        })
    }

    /// Whether any held range overlaps `range`
    #[must_use]
    pub fn is_locked(&self, range: &DateRange) -> bool {
        self.entries().iter().any(|(_, other)| other.overlaps(range))
    }

    /// Number of ranges currently held
    #[must_use]
    pub fn held_count(&self) -> usize {
        self.entries().len()
    }

    /// Whether `run_id` currently holds a range
    #[must_use]
    pub fn holds(&self, run_id: Uuid) -> bool {
        self.entries().iter().any(|(owner, _)| *owner == run_id)
    }

    fn release(&self, run_id: Uuid) {
        self.entries().retain(|(owner, _)| *owner != run_id);
        debug!(%run_id, "Range lock released");
    }
}

/// Held range; released when dropped
#[derive(Debug)]
pub struct RangeLockGuard {
    registry: Arc<RangeLockRegistry>,
    run_id: Uuid,
}

impl Drop for RangeLockGuard {
    fn drop(&mut self) {
        self.registry.release(self.run_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn range(start: u32, end: u32) -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 5, start).unwrap_or_default(),
            NaiveDate::from_ymd_opt(2024, 5, end).unwrap_or_default(),
        )
        .unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn test_overlapping_range_rejected_until_release() {
        let registry = Arc::new(RangeLockRegistry::new());
        let guard = registry.try_acquire(Uuid::new_v4(), range(1, 10));
        assert!(guard.is_ok());

        let clash = registry.try_acquire(Uuid::new_v4(), range(10, 20));
        assert!(matches!(clash, Err(MaterializationError::RangeLocked { .. })));

        drop(guard);
        assert_eq!(registry.held_count(), 0);
        assert!(registry.try_acquire(Uuid::new_v4(), range(10, 20)).is_ok());
    }

    #[test]
    fn test_disjoint_ranges_coexist() {
        let registry = Arc::new(RangeLockRegistry::new());
        let first_id = Uuid::new_v4();
        let first = registry.try_acquire(first_id, range(1, 8));
        let second = registry.try_acquire(Uuid::new_v4(), range(10, 20));
        assert!(first.is_ok() && second.is_ok());
        assert_eq!(registry.held_count(), 2);
        assert!(registry.is_locked(&range(5, 5)));
        assert!(registry.holds(first_id));
    }

    #[test]
    fn test_range_starting_after_a_held_range_waits_for_its_seed_day() {
        let registry = Arc::new(RangeLockRegistry::new());
        let earlier = registry.try_acquire(Uuid::new_v4(), range(1, 9));
        assert!(earlier.is_ok());

        let follower = registry.try_acquire(Uuid::new_v4(), range(10, 20));
        assert!(matches!(follower, Err(MaterializationError::RangeLocked { .. })));

        drop(earlier);
        assert!(registry.try_acquire(Uuid::new_v4(), range(10, 20)).is_ok());
    }
}
