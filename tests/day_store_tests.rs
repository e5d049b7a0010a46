use chrono::{NaiveDate, NaiveDateTime};
use day_scheduler::persistence::{PersistenceError, export_day_to_csv};
use day_scheduler::{
    DayMeta, DayOverrides, DayRecord, DayStore, JsonDayStore, Schedule, Scheduler, Settings, Task,
};
use std::fs;
use tempfile::{NamedTempFile, tempdir};

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn at(date: NaiveDate, h: u32, m: u32) -> NaiveDateTime {
    date.and_hms_opt(h, m, 0).unwrap()
}

fn planned_day(date: NaiveDate) -> DayRecord {
    let settings = Settings::default();
    let overrides = DayOverrides::new();
    let mut schedule = Schedule::from_settings(date, &settings, &overrides).unwrap();
    let tasks = vec![
        Task::builder("essay", 300, 4)
            .deadline(Some(at(date, 17, 0)))
            .note("chapter 2")
            .build()
            .unwrap(),
        Task::new("gym", 60, 2).unwrap(),
    ];
    Scheduler::default().schedule_tasks(&tasks, &mut schedule).unwrap();
    let meta = DayMeta::for_schedule(&schedule, &settings, &overrides);
    DayRecord::from_schedule(&schedule, &meta)
}

#[test]
fn record_rebuilds_the_same_schedule() {
    let date = d(2025, 3, 10);
    let record = planned_day(date);
    assert!(record.tasks.len() >= 2);

    let schedule = record.to_schedule().unwrap();
    assert_eq!(schedule.start(), at(date, 7, 20));
    assert_eq!(schedule.fixed_intervals().len(), 3);
    assert_eq!(schedule.occupied_intervals().len(), record.tasks.len());
    assert_eq!(DayRecord::from_schedule(&schedule, &record.meta), record);
}

#[test]
fn json_store_keeps_days_apart() {
    let dir = tempdir().unwrap();
    let store = JsonDayStore::new(dir.path().join("days.json"));
    let monday = planned_day(d(2025, 3, 10));
    let tuesday = planned_day(d(2025, 3, 11));

    store.save_day(&tuesday).unwrap();
    store.save_day(&monday).unwrap();

    assert_eq!(store.list_days().unwrap(), vec![d(2025, 3, 10), d(2025, 3, 11)]);
    assert_eq!(store.load_day(d(2025, 3, 10)).unwrap(), Some(monday));
    assert_eq!(store.load_day(d(2025, 3, 12)).unwrap(), None);

    let raw: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
    let entry = &raw["2025-03-11"];
    assert!(entry["meta"]["start"].is_string());
    assert_eq!(entry["meta"]["lunch"], "12:00-13:40");
    assert_eq!(entry["tasks"][0]["task"]["name"], "essay");
}

#[test]
fn saving_a_day_again_replaces_it() {
    let dir = tempdir().unwrap();
    let store = JsonDayStore::new(dir.path().join("days.json"));
    let date = d(2025, 3, 10);
    store.save_day(&planned_day(date)).unwrap();

    let mut emptied = planned_day(date);
    emptied.tasks.clear();
    store.save_day(&emptied).unwrap();

    assert!(store.load_day(date).unwrap().unwrap().tasks.is_empty());
    assert_eq!(store.list_days().unwrap().len(), 1);
}

#[test]
fn missing_or_corrupt_store_reads_as_empty() {
    let dir = tempdir().unwrap();
    let store = JsonDayStore::new(dir.path().join("absent.json"));
    assert!(store.list_days().unwrap().is_empty());

    let corrupt = dir.path().join("corrupt.json");
    fs::write(&corrupt, "[1, 2,").unwrap();
    let store = JsonDayStore::new(&corrupt);
    assert_eq!(store.load_day(d(2025, 3, 10)).unwrap(), None);

    store.save_day(&planned_day(d(2025, 3, 10))).unwrap();
    assert_eq!(store.list_days().unwrap(), vec![d(2025, 3, 10)]);
}

#[test]
fn marking_a_stored_task_completed() {
    let dir = tempdir().unwrap();
    let store = JsonDayStore::new(dir.path().join("days.json"));
    let date = d(2025, 3, 10);
    let record = planned_day(date);
    let id = record.tasks[0].task.id;
    store.save_day(&record).unwrap();

    store.mark_completed(date, id).unwrap();
    let reloaded = store.load_day(date).unwrap().unwrap();
    assert!(reloaded.tasks[0].task.completed);
    assert!(reloaded.tasks[1..].iter().all(|t| !t.task.completed));

    let unknown = day_scheduler::TaskId::new();
    assert!(matches!(
        store.mark_completed(date, unknown),
        Err(PersistenceError::NotFound)
    ));
    assert!(matches!(
        store.mark_completed(d(2025, 3, 11), id),
        Err(PersistenceError::NotFound)
    ));
}

#[test]
fn tampered_interval_is_rejected() {
    let mut record = planned_day(d(2025, 3, 10));
    record.tasks[0].end = record.tasks[0].end + chrono::Duration::minutes(5);
    assert!(matches!(
        record.to_schedule(),
        Err(PersistenceError::InvalidData(_))
    ));

    let dir = tempdir().unwrap();
    let store = JsonDayStore::new(dir.path().join("days.json"));
    assert!(store.save_day(&record).is_err());
}

#[test]
fn csv_export_has_one_row_per_interval() {
    let record = planned_day(d(2025, 3, 10));
    let file = NamedTempFile::new().unwrap();
    export_day_to_csv(&record, file.path()).unwrap();

    let mut reader = csv::Reader::from_path(file.path()).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(&headers[0], "date");
    assert_eq!(&headers[4], "task");
    let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(rows.len(), record.tasks.len());
    assert_eq!(&rows[0][0], "2025-03-10");
    assert_eq!(&rows[0][1], "07:20");
    assert!(rows[0][4].starts_with("essay"));
    assert_eq!(&rows[0][9], "chapter 2");
}

#[cfg(feature = "sqlite")]
mod sqlite {
    use super::*;
    use day_scheduler::persistence::SqliteDayStore;

    #[test]
    fn sqlite_store_round_trip() {
        let file = NamedTempFile::new().unwrap();
        let store = SqliteDayStore::new(file.path()).unwrap();
        let monday = planned_day(d(2025, 3, 10));

        store.save_day(&monday).unwrap();
        store.save_day(&planned_day(d(2025, 3, 9))).unwrap();

        assert_eq!(store.list_days().unwrap(), vec![d(2025, 3, 9), d(2025, 3, 10)]);
        assert_eq!(store.load_day(d(2025, 3, 10)).unwrap(), Some(monday.clone()));

        let id = monday.tasks[0].task.id;
        store.mark_completed(d(2025, 3, 10), id).unwrap();
        let reloaded = store.load_day(d(2025, 3, 10)).unwrap().unwrap();
        assert!(reloaded.tasks[0].task.completed);
        assert_eq!(store.list_days().unwrap().len(), 2);
    }

    #[test]
    fn in_memory_store_starts_empty() {
        let store = SqliteDayStore::in_memory().unwrap();
        assert!(store.list_days().unwrap().is_empty());
        assert_eq!(store.load_day(d(2025, 3, 10)).unwrap(), None);
    }
}
