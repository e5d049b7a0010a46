//! Placement of a task list onto one day's [`Schedule`].
//!
//! A run has three passes: tasks with an earliest start are pinned first, the
//! remaining work fills the free time segment by segment, and adjacent fragments of
//! the same task are merged at the end.

mod fill;
mod merge;
mod pinned;
mod state;

pub use merge::merge_fragments;

use crate::schedule::Schedule;
use crate::task::Task;
use crate::task_validation::{self, TaskValidationError};
use state::RunState;
use tracing::{info, warn};

/// What happens to a pinned task whose earliest-start slot is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PinnedFallback {
    /// Forget the earliest start; the task competes like any other.
    #[default]
    DropConstraint,
    /// Keep the earliest start as a lower bound while filling free time.
    KeepAsFloor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerOptions {
    pub pinned_fallback: PinnedFallback,
    /// Leave the fragments of tasks that could not be fully placed on the schedule.
    pub keep_partial: bool,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            pinned_fallback: PinnedFallback::default(),
            keep_partial: true,
        }
    }
}

/// A task that did not get its full estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedTask {
    pub task: Task,
    /// Fragments of the task still on the schedule.
    pub placed: Vec<Task>,
    pub missing_minutes: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScheduleOutcome {
    /// Everything placed during the run, in start order.
    pub scheduled: Vec<Task>,
    pub failed: Vec<FailedTask>,
}

impl ScheduleOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn scheduled_minutes(&self) -> u32 {
        self.scheduled.iter().map(Task::estimated_minutes).sum()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    options: SchedulerOptions,
}

impl Scheduler {
    pub fn new(options: SchedulerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> SchedulerOptions {
        self.options
    }

    /// Places `tasks` into the free time of `schedule`, mutating it in place.
    ///
    /// Completed tasks are ignored. Tasks that cannot be fully placed are reported
    /// in [`ScheduleOutcome::failed`]; that is not an error. The only error is an
    /// invalid task list (e.g. duplicate ids), detected before anything is placed.
    pub fn schedule_tasks(
        &self,
        tasks: &[Task],
        schedule: &mut Schedule,
    ) -> Result<ScheduleOutcome, TaskValidationError> {
        task_validation::validate_task_collection(tasks)?;

        let mut state = RunState::new(tasks.iter().filter(|task| !task.is_completed()));
        let mut placed = Vec::new();

        pinned::place_pinned(
            &mut state,
            schedule,
            &mut placed,
            self.options.pinned_fallback,
        );
        fill::fill_free_time(&mut state, schedule, &mut placed);
        let merged = merge_fragments(placed, schedule);

        let outcome = self.finalize(&state, schedule, merged);
        info!(
            date = %schedule.date(),
            placed = outcome.scheduled.len(),
            minutes = outcome.scheduled_minutes(),
            failed = outcome.failed.len(),
            "scheduling run finished"
        );
        Ok(outcome)
    }

    fn finalize(&self, state: &RunState, schedule: &mut Schedule, mut placed: Vec<Task>) -> ScheduleOutcome {
        let mut failed = Vec::new();

        for entry in state.entries() {
            let lineage = entry.task.lineage();
            let pieces: Vec<usize> = placed
                .iter()
                .enumerate()
                .filter(|(_, task)| task.lineage() == lineage)
                .map(|(idx, _)| idx)
                .collect();
            let minutes: u32 = pieces.iter().map(|&idx| placed[idx].estimated_minutes()).sum();
            let estimate = entry.task.estimated_minutes();

            if minutes >= estimate {
                if let [idx] = pieces[..] {
                    restore_identity(&entry.task, &mut placed[idx], schedule);
                }
                continue;
            }

            let mut kept = Vec::new();
            let mut kept_minutes = minutes;
            if self.options.keep_partial {
                kept = pieces.iter().map(|&idx| placed[idx].clone()).collect();
            } else if !pieces.is_empty() {
                for &idx in &pieces {
                    schedule.remove_task_interval(placed[idx].id());
                }
                placed.retain(|task| task.lineage() != lineage);
                kept_minutes = 0;
            }
            warn!(
                task = %entry.task.name(),
                placed_minutes = kept_minutes,
                estimate,
                "task not fully scheduled"
            );
            failed.push(FailedTask {
                task: entry.task.clone(),
                placed: kept,
                missing_minutes: estimate - kept_minutes,
            });
        }

        placed.sort_by_key(|task| task.start());
        ScheduleOutcome {
            scheduled: placed,
            failed,
        }
    }
}

/// A task placed as one piece of its full length is shown as itself, not as a part.
fn restore_identity(original: &Task, piece: &mut Task, schedule: &mut Schedule) {
    if piece.id() == original.id() {
        return;
    }
    let Some(start) = piece.start() else {
        return;
    };
    let mut restored = original.clone();
    restored.assign(start);
    if schedule.replace_task(piece.id(), restored.clone()) {
        *piece = restored;
    }
}
