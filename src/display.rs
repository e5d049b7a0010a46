//! Plain-text tables for the terminal.

use crate::clock::format_hhmm;
use crate::schedule::Schedule;
use crate::scheduler::ScheduleOutcome;
use crate::task::Task;
use chrono::{Duration, NaiveDateTime};

/// Renders rows as a boxed table sized to the widest cell of each column.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (ci, cell) in row.iter().enumerate().take(widths.len()) {
            widths[ci] = widths[ci].max(cell.chars().count());
        }
    }

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(w + 2));
        sep.push('+');
    }

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&table_line(&widths, headers.iter().copied()));
    out.push_str(&sep);
    out.push('\n');
    for row in rows {
        out.push_str(&table_line(&widths, row.iter().map(String::as_str)));
    }
    out.push_str(&sep);
    out.push('\n');
    out
}

fn table_line<'a>(widths: &[usize], mut cells: impl Iterator<Item = &'a str>) -> String {
    let mut out = String::from("|");
    for w in widths {
        let cell = cells.next().unwrap_or("");
        out.push(' ');
        out.push_str(cell);
        out.push_str(&" ".repeat(w.saturating_sub(cell.chars().count())));
        out.push_str(" |");
    }
    out.push('\n');
    out
}

/// `1h 20m`, `45m`, `2h`.
pub fn format_duration(duration: Duration) -> String {
    let minutes = duration.num_minutes().max(0);
    match (minutes / 60, minutes % 60) {
        (0, m) => format!("{m}m"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h {m}m"),
    }
}

fn span(start: NaiveDateTime, end: NaiveDateTime) -> String {
    format!("{} - {}", format_hhmm(start.time()), format_hhmm(end.time()))
}

/// Whole day in time order: fixed occupations, placed tasks and the gaps between.
pub fn render_schedule(schedule: &Schedule) -> String {
    let mut rows: Vec<(NaiveDateTime, Vec<String>)> = Vec::new();
    for fixed in schedule.fixed_intervals() {
        rows.push((
            fixed.start,
            vec![
                span(fixed.start, fixed.end),
                "fixed".into(),
                fixed.label.clone(),
                String::new(),
                String::new(),
            ],
        ));
    }
    for interval in schedule.occupied_intervals() {
        let task = interval.task();
        let mut entry = task.display_name();
        if task.is_completed() {
            entry.push_str(" (done)");
        }
        rows.push((
            interval.start(),
            vec![
                span(interval.start(), interval.end()),
                "task".into(),
                entry,
                task.importance().to_string(),
                task.note().unwrap_or_default().to_string(),
            ],
        ));
    }
    for slot in schedule.free_intervals() {
        rows.push((
            slot.start,
            vec![
                span(slot.start, slot.end),
                "free".into(),
                format_duration(slot.duration()),
                String::new(),
                String::new(),
            ],
        ));
    }
    rows.sort_by_key(|(start, _)| *start);
    let rows: Vec<Vec<String>> = rows.into_iter().map(|(_, row)| row).collect();

    let mut out = format!(
        "{} ({} - {}), free {}\n",
        schedule.date(),
        format_hhmm(schedule.start().time()),
        format_hhmm(schedule.end().time()),
        format_duration(schedule.total_free_time())
    );
    out.push_str(&render_table(&["time", "kind", "entry", "imp", "note"], &rows));
    out
}

/// Pending task list, numbered from 1 as the CLI addresses them.
pub fn render_tasks(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return "No tasks.\n".to_string();
    }
    let rows: Vec<Vec<String>> = tasks
        .iter()
        .enumerate()
        .map(|(idx, task)| {
            let at = |value: Option<NaiveDateTime>| {
                value.map(|v| format_hhmm(v.time())).unwrap_or_default()
            };
            vec![
                (idx + 1).to_string(),
                task.display_name(),
                task.estimated_minutes().to_string(),
                task.importance().to_string(),
                at(task.earliest_start()),
                at(task.deadline()),
                if task.is_splittable() { "yes" } else { "no" }.into(),
            ]
        })
        .collect();
    render_table(
        &["#", "name", "minutes", "imp", "start", "deadline", "split"],
        &rows,
    )
}

/// One line per task that fell short of its estimate.
pub fn render_outcome(outcome: &ScheduleOutcome) -> String {
    let mut out = format!(
        "Scheduled {} entries, {}.\n",
        outcome.scheduled.len(),
        format_duration(Duration::minutes(i64::from(outcome.scheduled_minutes())))
    );
    for failed in &outcome.failed {
        out.push_str(&format!(
            "Could not fully schedule '{}': {} missing ({} pieces placed)\n",
            failed.task.name(),
            format_duration(Duration::minutes(i64::from(failed.missing_minutes))),
            failed.placed.len()
        ));
    }
    out
}
