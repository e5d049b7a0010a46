//! Coalescing of back-to-back fragments of the same task.

use crate::schedule::Schedule;
use crate::task::{Task, TaskId};
use std::collections::HashMap;
use std::mem;
use tracing::{debug, warn};

/// Joins fragments of the same logical task (and importance) that end exactly
/// where the next one starts, replacing their intervals in `schedule` with one
/// interval carrying the summed duration. Part numbers are then made consecutive
/// per task, in start order.
///
/// Running it again on its own output changes nothing.
pub fn merge_fragments(fragments: Vec<Task>, schedule: &mut Schedule) -> Vec<Task> {
    let mut sorted = fragments;
    sorted.sort_by_key(|task| task.start());

    let mut merged = Vec::with_capacity(sorted.len());
    let mut run: Vec<Task> = Vec::new();
    for task in sorted {
        if run.last().is_some_and(|last| !continues(last, &task)) {
            merged.extend(coalesce(mem::take(&mut run), schedule));
        }
        run.push(task);
    }
    merged.extend(coalesce(run, schedule));

    renumber(&mut merged, schedule);
    merged
}

fn continues(previous: &Task, next: &Task) -> bool {
    previous.lineage() == next.lineage()
        && previous.importance() == next.importance()
        && previous.end().is_some()
        && previous.end() == next.start()
}

fn coalesce(run: Vec<Task>, schedule: &mut Schedule) -> Vec<Task> {
    let (Some(first), Some(last)) = (run.first(), run.last()) else {
        return run;
    };
    if run.len() == 1 {
        return run;
    }
    let Some(end) = last.end() else {
        return run;
    };
    let minutes = run.iter().map(Task::estimated_minutes).sum();
    let combined = first.clone().spanning(minutes, end);

    for task in &run {
        schedule.remove_task_interval(task.id());
    }
    match schedule.add_task_interval(combined.clone()) {
        Ok(()) => {
            debug!(task = %combined.name(), pieces = run.len(), minutes, "fragments merged");
            vec![combined]
        }
        Err(err) => {
            warn!(task = %combined.name(), error = %err, "merge rejected, keeping fragments");
            for task in &run {
                if let Err(err) = schedule.add_task_interval(task.clone()) {
                    warn!(task = %task.display_name(), error = %err, "fragment could not be restored");
                }
            }
            run
        }
    }
}

fn renumber(tasks: &mut [Task], schedule: &mut Schedule) {
    let mut next_part: HashMap<TaskId, u32> = HashMap::new();
    for task in tasks.iter_mut().filter(|task| task.is_fragment()) {
        let part = next_part.entry(task.lineage()).or_insert(0);
        *part += 1;
        if task.part() != Some(*part) {
            let updated = task.clone().renumbered(*part);
            schedule.replace_task(task.id(), updated.clone());
            *task = updated;
        }
    }
}
