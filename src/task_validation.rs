use crate::task::{MAX_IMPORTANCE, MIN_IMPORTANCE, Task, TaskId};
use chrono::NaiveDateTime;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskValidationError {
    #[error("task name must not be empty")]
    EmptyName,

    #[error("task '{name}' must have a positive estimated duration")]
    ZeroDuration { name: String },

    #[error("task '{name}' has importance {importance} (must be between 1 and 5)")]
    ImportanceOutOfRange { name: String, importance: u8 },

    #[error("task '{name}' deadline {deadline} is not after its earliest start {earliest_start}")]
    DeadlineNotAfterEarliestStart {
        name: String,
        earliest_start: NaiveDateTime,
        deadline: NaiveDateTime,
    },

    #[error("task '{name}' carries a part number without an origin task")]
    OrphanPart { name: String },

    #[error("task '{name}' has part number 0 (parts are numbered from 1)")]
    ZeroPart { name: String },

    #[error("duplicate task id {id}")]
    DuplicateId { id: TaskId },
}

pub fn validate_task(task: &Task) -> Result<(), TaskValidationError> {
    if task.name().trim().is_empty() {
        return Err(TaskValidationError::EmptyName);
    }

    if task.estimated_minutes() == 0 {
        return Err(TaskValidationError::ZeroDuration {
            name: task.name().to_string(),
        });
    }

    if !(MIN_IMPORTANCE..=MAX_IMPORTANCE).contains(&task.importance()) {
        return Err(TaskValidationError::ImportanceOutOfRange {
            name: task.name().to_string(),
            importance: task.importance(),
        });
    }

    if let (Some(earliest_start), Some(deadline)) = (task.earliest_start(), task.deadline()) {
        if deadline <= earliest_start {
            return Err(TaskValidationError::DeadlineNotAfterEarliestStart {
                name: task.name().to_string(),
                earliest_start,
                deadline,
            });
        }
    }

    match (task.origin(), task.part()) {
        (None, Some(_)) => {
            return Err(TaskValidationError::OrphanPart {
                name: task.name().to_string(),
            });
        }
        (_, Some(0)) => {
            return Err(TaskValidationError::ZeroPart {
                name: task.name().to_string(),
            });
        }
        _ => {}
    }

    Ok(())
}

pub fn validate_task_collection(tasks: &[Task]) -> Result<(), TaskValidationError> {
    let mut seen_ids = HashSet::with_capacity(tasks.len());
    for task in tasks {
        if !seen_ids.insert(task.id()) {
            return Err(TaskValidationError::DuplicateId { id: task.id() });
        }
        validate_task(task)?;
    }
    Ok(())
}
