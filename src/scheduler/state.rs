use crate::task::{Task, TaskId};
use chrono::{Duration, NaiveDateTime};
use std::collections::HashMap;

/// Bookkeeping for one logical task during a scheduling run.
#[derive(Debug, Clone)]
pub(crate) struct Pending {
    pub(crate) task: Task,
    pub(crate) remaining: Duration,
    pub(crate) parts: u32,
    /// Placement may not start before this instant.
    pub(crate) floor: Option<NaiveDateTime>,
    /// Set when the schedule refused one of this task's fragments.
    pub(crate) blocked: bool,
    pub(crate) order: usize,
}

impl Pending {
    pub(crate) fn is_open(&self) -> bool {
        !self.blocked && self.remaining > Duration::zero()
    }

    pub(crate) fn is_started(&self) -> bool {
        self.parts > 0
    }
}

/// Remaining duration and fragment count per logical task, in input order.
#[derive(Debug, Default)]
pub(crate) struct RunState {
    entries: Vec<Pending>,
    index: HashMap<TaskId, usize>,
}

impl RunState {
    pub(crate) fn new<'a, I>(tasks: I) -> Self
    where
        I: IntoIterator<Item = &'a Task>,
    {
        let mut state = RunState::default();
        for task in tasks {
            let mut task = task.clone();
            task.clear_assignment();
            let order = state.entries.len();
            state.index.insert(task.id(), order);
            state.entries.push(Pending {
                remaining: task.estimated_duration(),
                task,
                parts: 0,
                floor: None,
                blocked: false,
                order,
            });
        }
        state
    }

    pub(crate) fn entries(&self) -> &[Pending] {
        &self.entries
    }

    pub(crate) fn get(&self, id: TaskId) -> Option<&Pending> {
        self.index.get(&id).map(|&idx| &self.entries[idx])
    }

    pub(crate) fn get_mut(&mut self, id: TaskId) -> Option<&mut Pending> {
        self.index.get(&id).map(|&idx| &mut self.entries[idx])
    }

    pub(crate) fn open(&self) -> impl Iterator<Item = &Pending> {
        self.entries.iter().filter(|entry| entry.is_open())
    }

    pub(crate) fn has_open(&self) -> bool {
        self.open().next().is_some()
    }

    /// Distinct deadlines of work that is still unplaced, ascending.
    pub(crate) fn outstanding_deadlines(&self) -> Vec<NaiveDateTime> {
        let mut deadlines: Vec<NaiveDateTime> =
            self.open().filter_map(|entry| entry.task.deadline()).collect();
        deadlines.sort();
        deadlines.dedup();
        deadlines
    }

    /// Earliest start floor of open work lying strictly inside `(after, before)`.
    pub(crate) fn next_floor_between(
        &self,
        after: NaiveDateTime,
        before: NaiveDateTime,
    ) -> Option<NaiveDateTime> {
        self.open()
            .filter_map(|entry| entry.floor)
            .filter(|floor| *floor > after && *floor < before)
            .min()
    }

    pub(crate) fn record_fill(&mut self, id: TaskId, filled: Duration) {
        if let Some(entry) = self.get_mut(id) {
            entry.remaining = (entry.remaining - filled).max(Duration::zero());
            entry.parts += 1;
        }
    }

    pub(crate) fn block(&mut self, id: TaskId) {
        if let Some(entry) = self.get_mut(id) {
            entry.blocked = true;
        }
    }
}
