use chrono::{Duration, NaiveDate, NaiveDateTime};
use day_scheduler::{DayOverrides, Meal, Schedule, ScheduleError, Settings, Task, TimeRange};

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// 2025-03-10 is a Monday.
fn at(h: u32, m: u32) -> NaiveDateTime {
    d(2025, 3, 10).and_hms_opt(h, m, 0).unwrap()
}

fn placed(name: &str, minutes: u32, start: NaiveDateTime) -> Task {
    let mut task = Task::new(name, minutes, 3).unwrap();
    task.assign(start);
    task
}

#[test]
fn availability_respects_half_open_bounds() {
    let mut schedule = Schedule::for_day(d(2025, 3, 10));
    schedule.add_fixed_interval(at(12, 0), at(13, 0), "Lunch").unwrap();

    assert!(schedule.is_available(at(11, 0), at(12, 0)));
    assert!(schedule.is_available(at(13, 0), at(14, 0)));
    assert!(!schedule.is_available(at(11, 30), at(12, 30)));
    assert!(!schedule.is_available(at(12, 15), at(12, 45)));
    assert!(!schedule.is_available(at(7, 30), at(8, 30)));
    assert!(!schedule.is_available(at(22, 30), at(23, 30)));
    assert!(!schedule.is_available(at(10, 0), at(10, 0)));
    assert!(!schedule.is_available(at(11, 0), at(10, 0)));
}

#[test]
fn task_interval_needs_an_assignment_and_free_room() {
    let mut schedule = Schedule::for_day(d(2025, 3, 10));
    let unplaced = Task::new("read", 30, 2).unwrap();
    assert!(matches!(
        schedule.add_task_interval(unplaced),
        Err(ScheduleError::Unassigned { .. })
    ));

    schedule.add_task_interval(placed("a", 60, at(9, 0))).unwrap();
    let err = schedule
        .add_task_interval(placed("b", 30, at(9, 30)))
        .unwrap_err();
    assert!(matches!(err, ScheduleError::Overlap { ref conflict, .. } if conflict == "a"));

    let err = schedule
        .add_task_interval(placed("late", 90, at(22, 0)))
        .unwrap_err();
    assert!(matches!(err, ScheduleError::OutOfBounds { .. }));
    assert_eq!(schedule.occupied_intervals().len(), 1);
}

#[test]
fn removing_a_task_frees_its_interval() {
    let mut schedule = Schedule::for_day(d(2025, 3, 10));
    let task = placed("a", 60, at(9, 0));
    let id = task.id();
    schedule.add_task_interval(task).unwrap();
    let before = schedule.total_free_time();

    let removed = schedule.remove_task_interval(id).unwrap();
    assert_eq!(removed.id(), id);
    assert_eq!(schedule.total_free_time(), before + Duration::minutes(60));
    assert!(schedule.remove_task_interval(id).is_none());
    assert!(schedule.find_task(id).is_none());
}

#[test]
fn empty_day_window_is_rejected() {
    let err = Schedule::new(d(2025, 3, 10), at(10, 0), at(10, 0)).unwrap_err();
    assert!(matches!(err, ScheduleError::EmptyDay { .. }));
}

#[test]
fn settings_shape_the_day() {
    let mut settings = Settings::default();
    settings.set("dinner", "none").unwrap();
    settings
        .set_courses(0, vec!["14:00-15:30 Algorithms".parse().unwrap()])
        .unwrap();

    let schedule = Schedule::from_settings(d(2025, 3, 10), &settings, &DayOverrides::new()).unwrap();

    assert_eq!(schedule.start(), at(7, 20));
    assert_eq!(schedule.end(), at(23, 40));
    let labels: Vec<&str> = schedule
        .fixed_intervals()
        .iter()
        .map(|f| f.label.as_str())
        .collect();
    assert_eq!(labels, vec!["Breakfast", "Lunch", "Course: Algorithms"]);

    // Tuesday has no classes.
    let tuesday = Schedule::from_settings(d(2025, 3, 11), &settings, &DayOverrides::new()).unwrap();
    assert_eq!(tuesday.fixed_intervals().len(), 2);
}

#[test]
fn overrides_replace_meals_for_one_day() {
    let settings = Settings::default();
    let mut overrides = DayOverrides::new();
    overrides.set_meal(Meal::Lunch, Some("11:00-11:45".parse::<TimeRange>().unwrap()));
    overrides.set_meal(Meal::Breakfast, None);

    let schedule = Schedule::from_settings(d(2025, 3, 10), &settings, &overrides).unwrap();
    let fixed: Vec<(NaiveDateTime, &str)> = schedule
        .fixed_intervals()
        .iter()
        .map(|f| (f.start, f.label.as_str()))
        .collect();
    assert_eq!(fixed, vec![(at(11, 0), "Lunch"), (at(18, 0), "Dinner")]);
}

#[test]
fn fixed_entries_outside_the_window_are_clipped_or_skipped() {
    let mut settings = Settings::default();
    settings.set("wake_up", "07:50").unwrap();
    settings.set("sleep", "17:00").unwrap();

    let schedule = Schedule::from_settings(d(2025, 3, 10), &settings, &DayOverrides::new()).unwrap();
    let fixed: Vec<(NaiveDateTime, NaiveDateTime, &str)> = schedule
        .fixed_intervals()
        .iter()
        .map(|f| (f.start, f.end, f.label.as_str()))
        .collect();
    assert_eq!(
        fixed,
        vec![
            (at(7, 50), at(8, 0), "Breakfast"),
            (at(12, 0), at(13, 40), "Lunch"),
        ]
    );
}

#[test]
fn clearing_fixed_intervals_frees_the_whole_day() {
    let mut schedule = Schedule::from_settings(d(2025, 3, 10), &Settings::default(), &DayOverrides::new()).unwrap();
    schedule.clear_fixed_intervals();
    assert_eq!(schedule.free_intervals().len(), 1);
    assert_eq!(schedule.total_free_time(), schedule.end() - schedule.start());
}
