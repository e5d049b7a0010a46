pub mod clock;
pub mod display;
pub mod interval;
pub mod persistence;
pub mod schedule;
pub mod scheduler;
pub mod settings;
pub mod task;
pub mod task_validation;

pub use clock::TimeRange;
pub use interval::{FixedInterval, OccupiedInterval, TimeSlot};
pub use persistence::{DayMeta, DayRecord, DayStore, JsonDayStore, PersistenceError};
pub use schedule::{Schedule, ScheduleError};
pub use scheduler::{
    FailedTask, PinnedFallback, ScheduleOutcome, Scheduler, SchedulerOptions, merge_fragments,
};
pub use settings::{DayOverrides, Meal, Settings};
pub use task::{Task, TaskId};
pub use task_validation::TaskValidationError;
