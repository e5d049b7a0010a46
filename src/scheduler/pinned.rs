//! Tasks with an earliest start are tried first, at exactly that instant.

use super::PinnedFallback;
use super::state::RunState;
use crate::schedule::Schedule;
use crate::task::Task;
use tracing::debug;

pub(crate) fn place_pinned(
    state: &mut RunState,
    schedule: &mut Schedule,
    placed: &mut Vec<Task>,
    fallback: PinnedFallback,
) {
    let mut pinned: Vec<_> = state
        .open()
        .filter_map(|entry| {
            entry
                .task
                .earliest_start()
                .map(|start| (start, entry.order, entry.task.id()))
        })
        .collect();
    pinned.sort();

    for (start, _, id) in pinned {
        let Some(entry) = state.get(id) else {
            continue;
        };
        let mut task = entry.task.clone();
        task.assign(start);
        let (Some(begin), Some(end)) = (task.start(), task.end()) else {
            continue;
        };
        let meets_deadline = task.deadline().is_none_or(|deadline| end <= deadline);

        if meets_deadline
            && schedule.is_available(begin, end)
            && schedule.add_task_interval(task.clone()).is_ok()
        {
            debug!(task = %task.name(), %begin, %end, "pinned task placed");
            state.record_fill(id, task.estimated_duration());
            placed.push(task);
            continue;
        }

        debug!(task = %task.name(), %begin, "pinned slot unavailable, deferring");
        if let Some(entry) = state.get_mut(id) {
            entry.floor = match fallback {
                PinnedFallback::DropConstraint => None,
                PinnedFallback::KeepAsFloor => Some(start),
            };
        }
    }
}
