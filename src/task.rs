use crate::task_validation::{self, TaskValidationError};
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub const MIN_IMPORTANCE: u8 = 1;
pub const MAX_IMPORTANCE: u8 = 5;

/// Stable identifier of a task. Fragments get their own id and point back to the
/// logical task through [`Task::origin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

impl From<Uuid> for TaskId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

/// One unit of work to place on the day's timeline.
///
/// Fields are validated once at construction (see [`TaskBuilder::build`]) and are
/// read-only afterwards, except for the completion flag and the assigned interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TaskRecord", into = "TaskRecord")]
pub struct Task {
    id: TaskId,
    name: String,
    estimated_minutes: u32,
    importance: u8,
    deadline: Option<NaiveDateTime>,
    earliest_start: Option<NaiveDateTime>,
    completed: bool,
    note: Option<String>,
    splittable: bool,
    origin: Option<TaskId>,
    part: Option<u32>,
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
}

impl Task {
    pub fn new(
        name: impl Into<String>,
        estimated_minutes: u32,
        importance: u8,
    ) -> Result<Self, TaskValidationError> {
        Self::builder(name, estimated_minutes, importance).build()
    }

    pub fn builder(name: impl Into<String>, estimated_minutes: u32, importance: u8) -> TaskBuilder {
        TaskBuilder::new(name, estimated_minutes, importance)
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name decorated with the part number for fragments, e.g. `walk - Part 2`.
    pub fn display_name(&self) -> String {
        match self.part {
            Some(part) => format!("{} - Part {}", self.name, part),
            None => self.name.clone(),
        }
    }

    pub fn estimated_minutes(&self) -> u32 {
        self.estimated_minutes
    }

    pub fn estimated_duration(&self) -> Duration {
        Duration::minutes(i64::from(self.estimated_minutes))
    }

    pub fn importance(&self) -> u8 {
        self.importance
    }

    pub fn deadline(&self) -> Option<NaiveDateTime> {
        self.deadline
    }

    pub fn earliest_start(&self) -> Option<NaiveDateTime> {
        self.earliest_start
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn is_splittable(&self) -> bool {
        self.splittable
    }

    /// Id of the logical task this fragment was cut from.
    pub fn origin(&self) -> Option<TaskId> {
        self.origin
    }

    pub fn part(&self) -> Option<u32> {
        self.part
    }

    pub fn is_fragment(&self) -> bool {
        self.origin.is_some()
    }

    /// Identity shared by every fragment of the same logical task.
    pub fn lineage(&self) -> TaskId {
        self.origin.unwrap_or(self.id)
    }

    pub fn start(&self) -> Option<NaiveDateTime> {
        self.start
    }

    pub fn end(&self) -> Option<NaiveDateTime> {
        self.end
    }

    pub fn is_scheduled(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }

    pub fn mark_completed(&mut self) {
        self.completed = true;
    }

    /// Places the task at `start` for its full estimated duration.
    pub fn assign(&mut self, start: NaiveDateTime) {
        self.start = Some(start);
        self.end = Some(start + self.estimated_duration());
    }

    pub fn clear_assignment(&mut self) {
        self.start = None;
        self.end = None;
    }

    /// Builds a placed fragment of this task covering `minutes` from `start`.
    pub(crate) fn fragment(&self, part: u32, minutes: u32, start: NaiveDateTime) -> Task {
        let mut fragment = Task {
            id: TaskId::new(),
            name: self.name.clone(),
            estimated_minutes: minutes,
            importance: self.importance,
            deadline: self.deadline,
            earliest_start: None,
            completed: false,
            note: self.note.clone(),
            splittable: self.splittable,
            origin: Some(self.lineage()),
            part: Some(part),
            start: None,
            end: None,
        };
        fragment.assign(start);
        fragment
    }

    /// Same task stretched to `end`, now covering `minutes`.
    pub(crate) fn spanning(mut self, minutes: u32, end: NaiveDateTime) -> Task {
        self.estimated_minutes = minutes;
        self.end = Some(end);
        self
    }

    pub(crate) fn renumbered(mut self, part: u32) -> Task {
        if self.origin.is_some() {
            self.part = Some(part);
        }
        self
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} min, importance {})",
            self.display_name(),
            self.estimated_minutes,
            self.importance
        )
    }
}

#[derive(Debug, Clone)]
pub struct TaskBuilder {
    task: Task,
}

impl TaskBuilder {
    pub fn new(name: impl Into<String>, estimated_minutes: u32, importance: u8) -> Self {
        Self {
            task: Task {
                id: TaskId::new(),
                name: name.into(),
                estimated_minutes,
                importance,
                deadline: None,
                earliest_start: None,
                completed: false,
                note: None,
                splittable: true,
                origin: None,
                part: None,
                start: None,
                end: None,
            },
        }
    }

    pub fn id(mut self, id: TaskId) -> Self {
        self.task.id = id;
        self
    }

    pub fn deadline(mut self, deadline: Option<NaiveDateTime>) -> Self {
        self.task.deadline = deadline;
        self
    }

    pub fn earliest_start(mut self, earliest_start: Option<NaiveDateTime>) -> Self {
        self.task.earliest_start = earliest_start;
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        let note = note.into();
        self.task.note = if note.trim().is_empty() {
            None
        } else {
            Some(note)
        };
        self
    }

    pub fn splittable(mut self, splittable: bool) -> Self {
        self.task.splittable = splittable;
        self
    }

    pub fn completed(mut self, completed: bool) -> Self {
        self.task.completed = completed;
        self
    }

    pub fn lineage(mut self, origin: Option<TaskId>, part: Option<u32>) -> Self {
        self.task.origin = origin;
        self.task.part = part;
        self
    }

    pub fn build(self) -> Result<Task, TaskValidationError> {
        task_validation::validate_task(&self.task)?;
        Ok(self.task)
    }
}

/// Serialized field set of a task, as stored in the day file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    #[serde(default)]
    pub id: TaskId,
    pub name: String,
    pub estimated_time: u32,
    pub importance: u8,
    #[serde(default)]
    pub deadline: Option<NaiveDateTime>,
    #[serde(default)]
    pub earliest_start_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default = "default_splittable")]
    pub splittable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part: Option<u32>,
}

fn default_splittable() -> bool {
    true
}

impl From<Task> for TaskRecord {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            name: task.name,
            estimated_time: task.estimated_minutes,
            importance: task.importance,
            deadline: task.deadline,
            earliest_start_time: task.earliest_start,
            completed: task.completed,
            note: task.note,
            splittable: task.splittable,
            origin: task.origin,
            part: task.part,
        }
    }
}

impl From<&Task> for TaskRecord {
    fn from(task: &Task) -> Self {
        TaskRecord::from(task.clone())
    }
}

impl TryFrom<TaskRecord> for Task {
    type Error = TaskValidationError;

    fn try_from(record: TaskRecord) -> Result<Self, Self::Error> {
        let mut builder = TaskBuilder::new(record.name, record.estimated_time, record.importance)
            .id(record.id)
            .deadline(record.deadline)
            .earliest_start(record.earliest_start_time)
            .splittable(record.splittable)
            .completed(record.completed)
            .lineage(record.origin, record.part);
        if let Some(note) = record.note {
            builder = builder.note(note);
        }
        builder.build()
    }
}
