//! Greedy fill of the free time, segment by segment.
//!
//! Each free interval is cut at every outstanding deadline, so a sub-segment never
//! straddles a deadline. Inside a sub-segment a cursor walks forward; at each step one
//! task is chosen and given as much of the remaining time as the reservations allow.
//!
//! Tasks whose deadline is the sub-segment end ("must complete here"), and tasks that
//! cannot finish in the free time after this sub-segment ("needs reserved space"),
//! hold back their remaining duration from everyone else. A task whose start floor lies
//! ahead of the cursor holds back only what fits between its floor and the segment end.
//!
//! Fragments are whole minutes, so capacity is counted in whole minutes too.

use super::state::{Pending, RunState};
use crate::interval::TimeSlot;
use crate::schedule::Schedule;
use crate::task::{Task, TaskId};
use chrono::{Duration, NaiveDateTime};
use std::cmp::{Ordering, Reverse};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Urgency {
    /// Deadline equals the sub-segment end.
    MustCompleteHere,
    /// Later deadline, but not enough free time after this sub-segment.
    NeedsReservedSpace,
    Normal,
}

impl Urgency {
    fn reserves(self) -> bool {
        !matches!(self, Urgency::Normal)
    }
}

#[derive(Debug, Clone)]
struct Candidate {
    id: TaskId,
    remaining: Duration,
    importance: u8,
    started: bool,
    splittable: bool,
    order: usize,
    urgency: Urgency,
    /// False while the cursor is before the task's start floor.
    ready: bool,
    /// Time held back from normal candidates when `urgency` reserves.
    reserve: Duration,
}

impl Candidate {
    /// Higher importance first, then input order.
    fn rank(&self) -> (u8, Reverse<usize>) {
        (self.importance, Reverse(self.order))
    }
}

pub(crate) fn fill_free_time(state: &mut RunState, schedule: &mut Schedule, placed: &mut Vec<Task>) {
    if !state.has_open() {
        return;
    }
    let free = schedule.free_intervals();
    let deadlines = state.outstanding_deadlines();

    for (idx, interval) in free.iter().enumerate() {
        for segment in split_at(*interval, &deadlines) {
            fill_segment(state, schedule, placed, &free[idx..], segment);
        }
    }
}

/// Cuts `interval` at every boundary strictly inside it.
fn split_at(interval: TimeSlot, boundaries: &[NaiveDateTime]) -> Vec<TimeSlot> {
    let mut segments = Vec::new();
    let mut start = interval.start;
    for &boundary in boundaries {
        if boundary > start && boundary < interval.end {
            segments.push(TimeSlot::new(start, boundary));
            start = boundary;
        }
    }
    segments.push(TimeSlot::new(start, interval.end));
    segments
}

/// `free_ahead` starts with the free interval containing `segment`.
fn fill_segment(
    state: &mut RunState,
    schedule: &mut Schedule,
    placed: &mut Vec<Task>,
    free_ahead: &[TimeSlot],
    segment: TimeSlot,
) {
    let mut cursor = segment.start;
    while cursor < segment.end {
        let left = segment.end - cursor;
        if left < Duration::minutes(1) {
            break;
        }
        let candidates = classify(state, free_ahead, segment, cursor);
        let reserved = candidates
            .iter()
            .filter(|c| c.urgency.reserves())
            .fold(Duration::zero(), |sum, c| sum + c.reserve);
        let unreserved = whole_minutes(left - reserved);

        let Some(choice) = select(&candidates, cursor, segment.end, unreserved) else {
            // Nothing may start here yet; skip ahead to the next start floor, if any.
            match state.next_floor_between(cursor, segment.end) {
                Some(floor) => {
                    cursor = floor;
                    continue;
                }
                None => break,
            }
        };

        let cap = if choice.urgency.reserves() {
            left
        } else {
            left.min(unreserved)
        };
        let filled = choice.remaining.min(cap);
        let Ok(minutes) = u32::try_from(filled.num_minutes()) else {
            break;
        };
        if minutes == 0 {
            break;
        }
        let filled = Duration::minutes(i64::from(minutes));

        let Some(entry) = state.get(choice.id) else {
            break;
        };
        let fragment = entry.task.fragment(entry.parts + 1, minutes, cursor);
        match schedule.add_task_interval(fragment.clone()) {
            Ok(()) => {
                debug!(
                    task = %fragment.display_name(),
                    start = %cursor,
                    minutes,
                    urgency = ?choice.urgency,
                    "fragment placed"
                );
                state.record_fill(choice.id, filled);
                placed.push(fragment);
                cursor += filled;
            }
            Err(err) => {
                warn!(task = %fragment.name(), error = %err, "fragment rejected, task blocked");
                state.block(choice.id);
            }
        }
    }
}

fn classify(
    state: &RunState,
    free_ahead: &[TimeSlot],
    segment: TimeSlot,
    cursor: NaiveDateTime,
) -> Vec<Candidate> {
    state
        .open()
        .filter_map(|entry| {
            let begin = entry.floor.map_or(cursor, |floor| floor.max(cursor));
            if begin >= segment.end {
                return None;
            }
            let room = segment.end - begin;
            let urgency = match entry.task.deadline() {
                Some(deadline) if deadline < segment.end => return None,
                Some(deadline) if deadline == segment.end => Urgency::MustCompleteHere,
                Some(deadline) => {
                    let after = segment.end.max(entry.floor.unwrap_or(segment.end));
                    if free_time_between(free_ahead, after, deadline) < entry.remaining {
                        Urgency::NeedsReservedSpace
                    } else {
                        Urgency::Normal
                    }
                }
                None => Urgency::Normal,
            };
            if !fits_whole(entry, room) {
                return None;
            }
            let ready = begin == cursor;
            Some(Candidate {
                id: entry.task.id(),
                remaining: entry.remaining,
                importance: entry.task.importance(),
                started: entry.is_started(),
                splittable: entry.task.is_splittable(),
                order: entry.order,
                urgency,
                ready,
                reserve: if ready {
                    entry.remaining
                } else {
                    entry.remaining.min(room)
                },
            })
        })
        .collect()
}

/// Non-splittable work is only offered when it fits in one piece.
fn fits_whole(entry: &Pending, left: Duration) -> bool {
    entry.task.is_splittable() || (!entry.is_started() && entry.remaining <= left)
}

/// `duration` rounded down to whole minutes, never negative.
fn whole_minutes(duration: Duration) -> Duration {
    Duration::minutes(duration.num_minutes().max(0))
}

fn free_time_between(free: &[TimeSlot], from: NaiveDateTime, until: NaiveDateTime) -> Duration {
    free.iter()
        .filter_map(|slot| slot.clip(from, until))
        .fold(Duration::zero(), |sum, slot| sum + slot.duration())
}

fn select(
    candidates: &[Candidate],
    cursor: NaiveDateTime,
    segment_end: NaiveDateTime,
    unreserved: Duration,
) -> Option<Candidate> {
    let overdue = candidates
        .iter()
        .filter(|c| c.ready)
        .filter(|c| c.urgency == Urgency::MustCompleteHere && cursor >= segment_end - c.remaining)
        .max_by_key(|c| c.rank());
    if let Some(choice) = overdue {
        return Some(choice.clone());
    }

    let left = segment_end - cursor;
    candidates
        .iter()
        .filter(|c| c.ready)
        .filter(|c| c.urgency.reserves() || unreserved > Duration::zero())
        .filter(|c| c.splittable || c.urgency.reserves() || c.remaining <= left.min(unreserved))
        .max_by(|a, b| match a.started.cmp(&b.started) {
            Ordering::Equal => a.rank().cmp(&b.rank()),
            other => other,
        })
        .cloned()
}
