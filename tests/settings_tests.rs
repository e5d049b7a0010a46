use chrono::NaiveTime;
use day_scheduler::Settings;
use day_scheduler::settings::{CourseEntry, SettingsError};
use std::fs;
use tempfile::tempdir;

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

#[test]
fn settings_round_trip_through_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("settings.json");

    let mut settings = Settings::default();
    settings.set("wake_up", "06:45").unwrap();
    settings.set("breakfast", "none").unwrap();
    settings
        .set_courses(
            2,
            vec![
                CourseEntry::new(t(9, 0), t(10, 30), "Physics").unwrap(),
                CourseEntry::new(t(14, 0), t(15, 0), "Lab").unwrap(),
            ],
        )
        .unwrap();
    settings.mark_setup_complete();
    settings.save(&path).unwrap();

    let loaded = Settings::load(&path).unwrap();
    assert_eq!(loaded, settings);
    assert_eq!(loaded.courses_for(2).len(), 2);
    assert!(loaded.courses_for(3).is_empty());
    assert!(!loaded.is_first_time());
}

#[test]
fn stored_format_uses_plain_strings() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    let mut settings = Settings::default();
    settings
        .set_courses(0, vec!["08:00-09:00 Seminar".parse().unwrap()])
        .unwrap();
    settings.save(&path).unwrap();

    let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value["wake_up"], "07:20");
    assert_eq!(value["lunch"], "12:00-13:40");
    assert_eq!(value["course_schedule"]["0"][0], serde_json::json!(["08:00", "09:00", "Seminar"]));
    assert_eq!(value["first_time_setup_done"], false);
}

#[test]
fn missing_or_corrupt_file_falls_back_to_defaults() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("absent.json");
    assert_eq!(Settings::load_or_default(&missing), Settings::default());
    assert!(Settings::load_or_default(&missing).is_first_time());

    let corrupt = dir.path().join("corrupt.json");
    fs::write(&corrupt, "{ not json").unwrap();
    assert!(Settings::load(&corrupt).is_err());
    assert_eq!(Settings::load_or_default(&corrupt), Settings::default());
}

#[test]
fn partial_file_keeps_defaults_for_absent_keys() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    fs::write(&path, r#"{"sleep": "22:30", "course_schedule": {"9": [["08:00", "09:00", "Ghost"]]}}"#).unwrap();

    let settings = Settings::load(&path).unwrap();
    assert_eq!(settings.sleep, t(22, 30));
    assert_eq!(settings.wake_up, t(7, 20));
    assert!(settings.course_schedule.is_empty());
}

#[test]
fn weekday_and_course_validation() {
    let mut settings = Settings::default();
    assert!(matches!(
        settings.set_courses(7, Vec::new()),
        Err(SettingsError::WeekdayOutOfRange(7))
    ));
    assert!(CourseEntry::new(t(10, 0), t(9, 0), "Backwards").is_err());

    settings
        .set_courses(4, vec!["10:00-11:00 Art".parse().unwrap()])
        .unwrap();
    settings.set_courses(4, Vec::new()).unwrap();
    assert!(settings.course_schedule.is_empty());
}
