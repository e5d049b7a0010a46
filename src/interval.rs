//! Half-open time intervals on the day's timeline.
//!
//! Every interval is `[start, end)`: two intervals that merely touch at an
//! endpoint do not overlap.

use crate::task::Task;
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Whether `[a_start, a_end)` and `[b_start, b_end)` overlap.
#[inline]
pub fn overlaps(
    a_start: NaiveDateTime,
    a_end: NaiveDateTime,
    b_start: NaiveDateTime,
    b_end: NaiveDateTime,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// A plain `[start, end)` range, used for free intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeSlot {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    #[inline]
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        overlaps(self.start, self.end, other.start, other.end)
    }

    pub fn contains(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        self.start <= start && end <= self.end
    }

    /// Part of this slot inside `[floor, ceiling)`, if any.
    pub fn clip(&self, floor: NaiveDateTime, ceiling: NaiveDateTime) -> Option<TimeSlot> {
        let clipped = TimeSlot::new(self.start.max(floor), self.end.min(ceiling));
        (!clipped.is_empty()).then_some(clipped)
    }
}

/// An immovable occupation of the day (meal, class).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedInterval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub label: String,
}

impl FixedInterval {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime, label: impl Into<String>) -> Self {
        Self {
            start,
            end,
            label: label.into(),
        }
    }

    pub fn slot(&self) -> TimeSlot {
        TimeSlot::new(self.start, self.end)
    }
}

/// A range of the day held by a task or task fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct OccupiedInterval {
    start: NaiveDateTime,
    end: NaiveDateTime,
    task: Task,
}

impl OccupiedInterval {
    pub(crate) fn new(start: NaiveDateTime, end: NaiveDateTime, task: Task) -> Self {
        Self { start, end, task }
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn slot(&self) -> TimeSlot {
        TimeSlot::new(self.start, self.end)
    }

    pub(crate) fn into_task(self) -> Task {
        self.task
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn touching_endpoints_do_not_overlap() {
        assert!(!overlaps(at(8, 0), at(9, 0), at(9, 0), at(10, 0)));
        assert!(overlaps(at(8, 0), at(9, 1), at(9, 0), at(10, 0)));
        assert!(overlaps(at(8, 0), at(12, 0), at(9, 0), at(10, 0)));
    }

    #[test]
    fn clip_drops_empty_remainders() {
        let slot = TimeSlot::new(at(8, 0), at(12, 0));
        assert_eq!(
            slot.clip(at(9, 0), at(11, 0)),
            Some(TimeSlot::new(at(9, 0), at(11, 0)))
        );
        assert_eq!(slot.clip(at(12, 0), at(13, 0)), None);
    }
}
