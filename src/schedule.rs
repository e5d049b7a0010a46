use crate::interval::{FixedInterval, OccupiedInterval, TimeSlot, overlaps};
use crate::settings::{DayOverrides, Settings};
use crate::task::{Task, TaskId};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{debug, warn};

/// Step used by [`Schedule::find_available_slot`] when probing candidate starts.
pub const SLOT_PROBE_STEP_MINUTES: i64 = 15;

const DEFAULT_DAY_START: (u32, u32) = (8, 0);
const DEFAULT_DAY_END: (u32, u32) = (23, 0);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("day window {start} - {end} must end after it starts")]
    EmptyDay {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
    #[error("interval {start} - {end} must end after it starts")]
    EmptyInterval {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
    #[error("interval {start} - {end} lies outside the day window {day_start} - {day_end}")]
    OutOfBounds {
        start: NaiveDateTime,
        end: NaiveDateTime,
        day_start: NaiveDateTime,
        day_end: NaiveDateTime,
    },
    #[error("interval {start} - {end} overlaps '{conflict}'")]
    Overlap {
        start: NaiveDateTime,
        end: NaiveDateTime,
        conflict: String,
    },
    #[error("task '{name}' has no assigned start/end")]
    Unassigned { name: String },
}

/// One day's timeline: the outer window, the fixed occupations and the task intervals.
///
/// No two intervals (fixed or occupied) overlap, every interval lies inside
/// `[start, end]`, and occupied intervals stay sorted by start.
#[derive(Debug, Clone)]
pub struct Schedule {
    date: NaiveDate,
    start: NaiveDateTime,
    end: NaiveDateTime,
    fixed: Vec<FixedInterval>,
    occupied: Vec<OccupiedInterval>,
}

impl Schedule {
    pub fn new(
        date: NaiveDate,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Self, ScheduleError> {
        if end <= start {
            return Err(ScheduleError::EmptyDay { start, end });
        }
        Ok(Self {
            date,
            start,
            end,
            fixed: Vec::new(),
            occupied: Vec::new(),
        })
    }

    /// A day with the default 08:00 - 23:00 window.
    pub fn for_day(date: NaiveDate) -> Self {
        let at = |(h, m): (u32, u32)| {
            date.and_time(NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN))
        };
        Self {
            date,
            start: at(DEFAULT_DAY_START),
            end: at(DEFAULT_DAY_END),
            fixed: Vec::new(),
            occupied: Vec::new(),
        }
    }

    /// Builds the day from the user's settings: the wake/sleep window plus meals
    /// (after `overrides`) and the weekday's classes as fixed intervals.
    ///
    /// Entries reaching outside the window are clipped to it; entries left empty or
    /// colliding with an earlier entry are skipped.
    pub fn from_settings(
        date: NaiveDate,
        settings: &Settings,
        overrides: &DayOverrides,
    ) -> Result<Self, ScheduleError> {
        let mut schedule = Self::new(
            date,
            date.and_time(settings.wake_up),
            date.and_time(settings.sleep),
        )?;
        for fixed in settings.fixed_intervals_for(date, overrides) {
            let Some(slot) = fixed.slot().clip(schedule.start, schedule.end) else {
                warn!(label = %fixed.label, "fixed interval outside the day window, skipped");
                continue;
            };
            if slot != fixed.slot() {
                warn!(label = %fixed.label, "fixed interval clipped to the day window");
            }
            if let Err(err) = schedule.add_fixed_interval(slot.start, slot.end, fixed.label.clone()) {
                warn!(label = %fixed.label, error = %err, "fixed interval skipped");
            }
        }
        Ok(schedule)
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn window(&self) -> TimeSlot {
        TimeSlot::new(self.start, self.end)
    }

    pub fn fixed_intervals(&self) -> &[FixedInterval] {
        &self.fixed
    }

    pub fn occupied_intervals(&self) -> &[OccupiedInterval] {
        &self.occupied
    }

    /// Tasks currently holding an interval, in start order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.occupied.iter().map(OccupiedInterval::task)
    }

    pub fn find_task(&self, id: TaskId) -> Option<&Task> {
        self.tasks().find(|task| task.id() == id)
    }

    pub fn add_fixed_interval(
        &mut self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        label: impl Into<String>,
    ) -> Result<(), ScheduleError> {
        self.check_insertable(start, end)?;
        self.fixed.push(FixedInterval::new(start, end, label));
        self.fixed.sort_by_key(|interval| interval.start);
        Ok(())
    }

    pub fn clear_fixed_intervals(&mut self) {
        self.fixed.clear();
    }

    /// True iff `[start, end)` lies inside the day and overlaps nothing already placed.
    pub fn is_available(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        start < end && self.in_bounds(start, end) && self.conflict_label(start, end).is_none()
    }

    /// First start, probing from the day start in 15-minute steps, at which
    /// `duration` fits.
    pub fn find_available_slot(&self, duration: Duration) -> Option<NaiveDateTime> {
        self.find_available_slot_in_range(duration, None, None)
    }

    /// Like [`find_available_slot`](Self::find_available_slot), but starting no
    /// earlier than `earliest` and ending no later than `latest`.
    pub fn find_available_slot_in_range(
        &self,
        duration: Duration,
        earliest: Option<NaiveDateTime>,
        latest: Option<NaiveDateTime>,
    ) -> Option<NaiveDateTime> {
        let step = Duration::minutes(SLOT_PROBE_STEP_MINUTES);
        let ceiling = latest.map_or(self.end, |latest| latest.min(self.end));
        let mut current = earliest.map_or(self.start, |earliest| earliest.max(self.start));

        while current + duration <= ceiling {
            if self.is_available(current, current + duration) {
                return Some(current);
            }
            current += step;
        }
        None
    }

    /// Inserts a task that already carries its assigned start/end.
    pub fn add_task_interval(&mut self, task: Task) -> Result<(), ScheduleError> {
        let (Some(start), Some(end)) = (task.start(), task.end()) else {
            return Err(ScheduleError::Unassigned {
                name: task.display_name(),
            });
        };
        self.check_insertable(start, end)?;
        debug!(task = %task.display_name(), %start, %end, "task interval added");
        let idx = self.occupied.partition_point(|interval| interval.start() <= start);
        self.occupied.insert(idx, OccupiedInterval::new(start, end, task));
        Ok(())
    }

    /// Removes the interval held by the task with `id`, returning that task.
    pub fn remove_task_interval(&mut self, id: TaskId) -> Option<Task> {
        let idx = self
            .occupied
            .iter()
            .position(|interval| interval.task().id() == id)?;
        let removed = self.occupied.remove(idx).into_task();
        debug!(task = %removed.display_name(), "task interval removed");
        Some(removed)
    }

    /// Swaps the task held in an interval for `replacement`, which must occupy
    /// exactly the same range.
    pub(crate) fn replace_task(&mut self, id: TaskId, replacement: Task) -> bool {
        let Some(interval) = self
            .occupied
            .iter_mut()
            .find(|interval| interval.task().id() == id)
        else {
            return false;
        };
        if replacement.start() != Some(interval.start()) || replacement.end() != Some(interval.end()) {
            return false;
        }
        *interval = OccupiedInterval::new(interval.start(), interval.end(), replacement);
        true
    }

    /// Maximal gaps of the day not covered by any fixed or occupied interval.
    pub fn free_intervals(&self) -> Vec<TimeSlot> {
        let mut taken: Vec<TimeSlot> = self
            .fixed
            .iter()
            .map(FixedInterval::slot)
            .chain(self.occupied.iter().map(OccupiedInterval::slot))
            .collect();
        taken.sort();

        let mut free = Vec::new();
        let mut cursor = self.start;
        for slot in taken {
            if cursor < slot.start {
                free.push(TimeSlot::new(cursor, slot.start));
            }
            cursor = cursor.max(slot.end);
        }
        if cursor < self.end {
            free.push(TimeSlot::new(cursor, self.end));
        }
        free
    }

    pub fn total_free_time(&self) -> Duration {
        self.free_intervals()
            .iter()
            .fold(Duration::zero(), |total, slot| total + slot.duration())
    }

    fn in_bounds(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        start >= self.start && end <= self.end
    }

    fn conflict_label(&self, start: NaiveDateTime, end: NaiveDateTime) -> Option<String> {
        if let Some(fixed) = self
            .fixed
            .iter()
            .find(|fixed| overlaps(start, end, fixed.start, fixed.end))
        {
            return Some(fixed.label.clone());
        }
        self.occupied
            .iter()
            .find(|interval| overlaps(start, end, interval.start(), interval.end()))
            .map(|interval| interval.task().display_name())
    }

    fn check_insertable(&self, start: NaiveDateTime, end: NaiveDateTime) -> Result<(), ScheduleError> {
        if end <= start {
            return Err(ScheduleError::EmptyInterval { start, end });
        }
        if !self.in_bounds(start, end) {
            return Err(ScheduleError::OutOfBounds {
                start,
                end,
                day_start: self.start,
                day_end: self.end,
            });
        }
        if let Some(conflict) = self.conflict_label(start, end) {
            return Err(ScheduleError::Overlap {
                start,
                end,
                conflict,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        day().and_hms_opt(h, m, 0).unwrap()
    }

    fn placed(name: &str, minutes: u32, start: NaiveDateTime) -> Task {
        let mut task = Task::new(name, minutes, 3).unwrap();
        task.assign(start);
        task
    }

    #[test]
    fn free_intervals_partition_the_day() {
        let mut schedule = Schedule::for_day(day());
        schedule.add_fixed_interval(at(12, 0), at(13, 40), "Lunch").unwrap();
        schedule.add_fixed_interval(at(8, 0), at(8, 30), "Breakfast").unwrap();
        schedule.add_task_interval(placed("cs", 50, at(13, 50))).unwrap();

        let free = schedule.free_intervals();
        assert_eq!(
            free,
            vec![
                TimeSlot::new(at(8, 30), at(12, 0)),
                TimeSlot::new(at(13, 40), at(13, 50)),
                TimeSlot::new(at(14, 40), at(23, 0)),
            ]
        );

        let mut covered: Vec<TimeSlot> = free;
        covered.extend(schedule.fixed_intervals().iter().map(FixedInterval::slot));
        covered.extend(schedule.occupied_intervals().iter().map(OccupiedInterval::slot));
        covered.sort();
        assert_eq!(covered.first().unwrap().start, schedule.start());
        assert_eq!(covered.last().unwrap().end, schedule.end());
        for pair in covered.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[test]
    fn overlapping_fixed_interval_is_rejected_without_mutation() {
        let mut schedule = Schedule::for_day(day());
        schedule.add_fixed_interval(at(12, 0), at(13, 0), "Lunch").unwrap();
        let err = schedule
            .add_fixed_interval(at(12, 30), at(14, 0), "Seminar")
            .unwrap_err();
        assert!(matches!(err, ScheduleError::Overlap { ref conflict, .. } if conflict == "Lunch"));
        assert_eq!(schedule.fixed_intervals().len(), 1);
    }

    #[test]
    fn occupied_intervals_stay_sorted() {
        let mut schedule = Schedule::for_day(day());
        schedule.add_task_interval(placed("b", 30, at(15, 0))).unwrap();
        schedule.add_task_interval(placed("a", 30, at(9, 0))).unwrap();
        schedule.add_task_interval(placed("c", 30, at(11, 0))).unwrap();
        let names: Vec<&str> = schedule.tasks().map(Task::name).collect();
        assert_eq!(names, vec!["a", "c", "b"]);
    }

    #[test]
    fn slot_search_uses_quarter_hour_steps() {
        let mut schedule = Schedule::for_day(day());
        schedule.add_fixed_interval(at(8, 0), at(8, 10), "Coffee").unwrap();
        assert_eq!(schedule.find_available_slot(Duration::minutes(30)), Some(at(8, 15)));
        assert_eq!(
            schedule.find_available_slot_in_range(
                Duration::minutes(30),
                Some(at(9, 5)),
                Some(at(9, 30))
            ),
            None
        );
        assert_eq!(schedule.find_available_slot(Duration::hours(16)), None);
    }
}
