use crate::clock::TimeRange;
use crate::interval::FixedInterval;
use crate::schedule::{Schedule, ScheduleError};
use crate::settings::{DayOverrides, Meal, Settings};
use crate::task::{Task, TaskId, TaskRecord};
use crate::task_validation::TaskValidationError;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Error as SerdeJsonError;
use std::fmt;
use std::io;

#[derive(Debug)]
pub enum PersistenceError {
    Serialization(SerdeJsonError),
    Io(io::Error),
    #[cfg(feature = "sqlite")]
    Sqlite(rusqlite::Error),
    Csv(csv::Error),
    Task(TaskValidationError),
    Schedule(ScheduleError),
    InvalidData(String),
    NotFound,
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceError::Serialization(err) => write!(f, "serialization error: {err}"),
            PersistenceError::Io(err) => write!(f, "io error: {err}"),
            #[cfg(feature = "sqlite")]
            PersistenceError::Sqlite(err) => write!(f, "sqlite error: {err}"),
            PersistenceError::Csv(err) => write!(f, "csv error: {err}"),
            PersistenceError::Task(err) => write!(f, "invalid stored task: {err}"),
            PersistenceError::Schedule(err) => write!(f, "stored day does not fit: {err}"),
            PersistenceError::InvalidData(msg) => write!(f, "invalid data: {msg}"),
            PersistenceError::NotFound => write!(f, "nothing stored for that day or task"),
        }
    }
}

impl std::error::Error for PersistenceError {}

impl From<SerdeJsonError> for PersistenceError {
    fn from(value: SerdeJsonError) -> Self {
        Self::Serialization(value)
    }
}

impl From<io::Error> for PersistenceError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for PersistenceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<csv::Error> for PersistenceError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

impl From<TaskValidationError> for PersistenceError {
    fn from(value: TaskValidationError) -> Self {
        Self::Task(value)
    }
}

impl From<ScheduleError> for PersistenceError {
    fn from(value: ScheduleError) -> Self {
        Self::Schedule(value)
    }
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// The window and fixed occupations a stored day was planned with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayMeta {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub breakfast: Option<TimeRange>,
    pub lunch: Option<TimeRange>,
    pub dinner: Option<TimeRange>,
    #[serde(default)]
    pub fixed: Vec<FixedInterval>,
}

impl DayMeta {
    /// Meta for `schedule`, with the meal windows that applied to it.
    pub fn for_schedule(schedule: &Schedule, settings: &Settings, overrides: &DayOverrides) -> Self {
        Self {
            start: schedule.start(),
            end: schedule.end(),
            breakfast: overrides.meal(Meal::Breakfast, settings),
            lunch: overrides.meal(Meal::Lunch, settings),
            dinner: overrides.meal(Meal::Dinner, settings),
            fixed: schedule.fixed_intervals().to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTaskRecord {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub task: TaskRecord,
}

/// One day's finalized plan as it is stored.
#[derive(Debug, Clone, PartialEq)]
pub struct DayRecord {
    pub date: NaiveDate,
    pub meta: DayMeta,
    pub tasks: Vec<ScheduledTaskRecord>,
}

impl DayRecord {
    pub fn from_schedule(schedule: &Schedule, meta: &DayMeta) -> Self {
        let tasks = schedule
            .occupied_intervals()
            .iter()
            .map(|interval| ScheduledTaskRecord {
                start: interval.start(),
                end: interval.end(),
                task: TaskRecord::from(interval.task()),
            })
            .collect();
        Self {
            date: schedule.date(),
            meta: meta.clone(),
            tasks,
        }
    }

    /// Rebuilds the day, re-validating every task and interval.
    pub fn to_schedule(&self) -> PersistenceResult<Schedule> {
        let mut schedule = Schedule::new(self.date, self.meta.start, self.meta.end)?;
        for fixed in &self.meta.fixed {
            schedule.add_fixed_interval(fixed.start, fixed.end, fixed.label.clone())?;
        }
        for task in self.placed_tasks()? {
            schedule.add_task_interval(task)?;
        }
        Ok(schedule)
    }

    /// Stored tasks with their intervals assigned.
    pub fn placed_tasks(&self) -> PersistenceResult<Vec<Task>> {
        let mut tasks = Vec::with_capacity(self.tasks.len());
        for record in &self.tasks {
            let mut task = Task::try_from(record.task.clone())?;
            task.assign(record.start);
            if task.end() != Some(record.end) {
                return Err(PersistenceError::InvalidData(format!(
                    "task '{}' lasts {} minutes but is stored as {} - {}",
                    task.display_name(),
                    task.estimated_minutes(),
                    record.start,
                    record.end
                )));
            }
            tasks.push(task);
        }
        crate::task_validation::validate_task_collection(&tasks)?;
        Ok(tasks)
    }

    /// Flags the stored task with `id` as done. Returns `false` if there is none.
    pub fn mark_completed(&mut self, id: TaskId) -> bool {
        match self.tasks.iter_mut().find(|record| record.task.id == id) {
            Some(record) => {
                record.task.completed = true;
                true
            }
            None => false,
        }
    }
}

/// A date-keyed home for finalized days.
pub trait DayStore {
    /// Stores `record`, replacing anything already kept for its date.
    fn save_day(&self, record: &DayRecord) -> PersistenceResult<()>;
    fn load_day(&self, date: NaiveDate) -> PersistenceResult<Option<DayRecord>>;
    /// Stored dates, ascending.
    fn list_days(&self) -> PersistenceResult<Vec<NaiveDate>>;

    fn mark_completed(&self, date: NaiveDate, id: TaskId) -> PersistenceResult<()> {
        let mut record = self.load_day(date)?.ok_or(PersistenceError::NotFound)?;
        if !record.mark_completed(id) {
            return Err(PersistenceError::NotFound);
        }
        self.save_day(&record)
    }
}

/// Body of a stored day; the date is the key it is stored under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StoredDay {
    pub(crate) meta: DayMeta,
    #[serde(default)]
    pub(crate) tasks: Vec<ScheduledTaskRecord>,
}

impl StoredDay {
    pub(crate) fn from_record(record: &DayRecord) -> Self {
        Self {
            meta: record.meta.clone(),
            tasks: record.tasks.clone(),
        }
    }

    pub(crate) fn into_record(self, date: NaiveDate) -> DayRecord {
        DayRecord {
            date,
            meta: self.meta,
            tasks: self.tasks,
        }
    }
}

pub(crate) const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

pub(crate) fn parse_date_key(key: &str) -> PersistenceResult<NaiveDate> {
    NaiveDate::parse_from_str(key, DATE_KEY_FORMAT)
        .map_err(|_| PersistenceError::InvalidData(format!("invalid day key '{key}'")))
}

pub(crate) fn date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod file;

pub use file::{JsonDayStore, export_day_to_csv};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDayStore;
