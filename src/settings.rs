//! Persisted user preferences: day window, meal windows and the weekly course table.

use crate::clock::{ClockError, TimeRange, format_hhmm, hhmm, parse_hhmm};
use crate::interval::FixedInterval;
use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

pub const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error(transparent)]
    Clock(#[from] ClockError),
    #[error("unknown settings key '{0}'")]
    UnknownKey(String),
    #[error("invalid boolean '{0}'")]
    InvalidBool(String),
    #[error("weekday {0} is out of range (0 = Monday .. 6 = Sunday)")]
    WeekdayOutOfRange(u8),
    #[error("invalid course entry '{0}' (expected 'HH:MM-HH:MM label')")]
    InvalidCourse(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("settings json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Meal {
    Breakfast,
    Lunch,
    Dinner,
}

impl Meal {
    pub const ALL: [Meal; 3] = [Meal::Breakfast, Meal::Lunch, Meal::Dinner];

    pub fn key(&self) -> &'static str {
        match self {
            Meal::Breakfast => "breakfast",
            Meal::Lunch => "lunch",
            Meal::Dinner => "dinner",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Meal::Breakfast => "Breakfast",
            Meal::Lunch => "Lunch",
            Meal::Dinner => "Dinner",
        }
    }
}

impl FromStr for Meal {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "breakfast" => Ok(Meal::Breakfast),
            "lunch" => Ok(Meal::Lunch),
            "dinner" => Ok(Meal::Dinner),
            other => Err(SettingsError::UnknownKey(other.to_string())),
        }
    }
}

/// One class in the weekly course table, stored as `["HH:MM", "HH:MM", "label"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseEntry(
    #[serde(with = "hhmm")] NaiveTime,
    #[serde(with = "hhmm")] NaiveTime,
    String,
);

impl CourseEntry {
    pub fn new(
        start: NaiveTime,
        end: NaiveTime,
        label: impl Into<String>,
    ) -> Result<Self, SettingsError> {
        TimeRange::new(start, end)?;
        Ok(Self(start, end, label.into()))
    }

    pub fn start(&self) -> NaiveTime {
        self.0
    }

    pub fn end(&self) -> NaiveTime {
        self.1
    }

    pub fn label(&self) -> &str {
        &self.2
    }
}

impl FromStr for CourseEntry {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (range, label) = s
            .trim()
            .split_once(char::is_whitespace)
            .ok_or_else(|| SettingsError::InvalidCourse(s.trim().to_string()))?;
        let range: TimeRange = range.parse()?;
        let label = label.trim();
        if label.is_empty() {
            return Err(SettingsError::InvalidCourse(s.trim().to_string()));
        }
        CourseEntry::new(range.start(), range.end(), label)
    }
}

impl fmt::Display for CourseEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{} {}", format_hhmm(self.0), format_hhmm(self.1), self.2)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(with = "hhmm")]
    pub wake_up: NaiveTime,
    #[serde(with = "hhmm")]
    pub sleep: NaiveTime,
    pub breakfast: Option<TimeRange>,
    pub lunch: Option<TimeRange>,
    pub dinner: Option<TimeRange>,
    /// Weekday (0 = Monday) to that day's classes, in order.
    pub course_schedule: BTreeMap<u8, Vec<CourseEntry>>,
    pub first_time_setup_done: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            wake_up: hm(7, 20),
            sleep: hm(23, 40),
            breakfast: TimeRange::new(hm(7, 40), hm(8, 0)).ok(),
            lunch: TimeRange::new(hm(12, 0), hm(13, 40)).ok(),
            dinner: TimeRange::new(hm(18, 0), hm(18, 30)).ok(),
            course_schedule: BTreeMap::new(),
            first_time_setup_done: false,
        }
    }
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

impl Settings {
    pub const KEYS: [&'static str; 6] = [
        "wake_up",
        "sleep",
        "breakfast",
        "lunch",
        "dinner",
        "first_time_setup_done",
    ];

    /// Reads settings from `path`, failing on missing or malformed files.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let file = File::open(path)?;
        let mut settings: Settings = serde_json::from_reader(io::BufReader::new(file))?;
        settings.course_schedule.retain(|weekday, _| {
            let keep = usize::from(*weekday) < WEEKDAY_NAMES.len();
            if !keep {
                warn!(weekday, "dropping course table entry for unknown weekday");
            }
            keep
        });
        Ok(settings)
    }

    /// Reads settings from `path`; a missing or unreadable file yields the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "no settings file, using defaults");
            return Self::default();
        }
        match Self::load(path) {
            Ok(settings) => settings,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "settings unreadable, using defaults");
                Self::default()
            }
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SettingsError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        info!(path = %path.display(), "settings saved");
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "wake_up" => Some(format_hhmm(self.wake_up)),
            "sleep" => Some(format_hhmm(self.sleep)),
            "breakfast" => self.breakfast.map(|r| r.to_string()),
            "lunch" => self.lunch.map(|r| r.to_string()),
            "dinner" => self.dinner.map(|r| r.to_string()),
            "first_time_setup_done" => Some(self.first_time_setup_done.to_string()),
            _ => None,
        }
    }

    /// Sets a scalar key from its string form. Meal keys accept `none` to clear.
    pub fn set(&mut self, key: &str, raw: &str) -> Result<(), SettingsError> {
        match key {
            "wake_up" => self.wake_up = parse_hhmm(raw)?,
            "sleep" => self.sleep = parse_hhmm(raw)?,
            "breakfast" | "lunch" | "dinner" => {
                let meal: Meal = key.parse()?;
                self.set_meal(meal, parse_optional_range(raw)?);
            }
            "first_time_setup_done" => {
                self.first_time_setup_done = match raw.trim().to_ascii_lowercase().as_str() {
                    "true" | "yes" | "y" => true,
                    "false" | "no" | "n" => false,
                    other => return Err(SettingsError::InvalidBool(other.to_string())),
                }
            }
            other => return Err(SettingsError::UnknownKey(other.to_string())),
        }
        Ok(())
    }

    pub fn meal(&self, meal: Meal) -> Option<TimeRange> {
        match meal {
            Meal::Breakfast => self.breakfast,
            Meal::Lunch => self.lunch,
            Meal::Dinner => self.dinner,
        }
    }

    pub fn set_meal(&mut self, meal: Meal, range: Option<TimeRange>) {
        match meal {
            Meal::Breakfast => self.breakfast = range,
            Meal::Lunch => self.lunch = range,
            Meal::Dinner => self.dinner = range,
        }
    }

    pub fn set_courses(&mut self, weekday: u8, courses: Vec<CourseEntry>) -> Result<(), SettingsError> {
        if usize::from(weekday) >= WEEKDAY_NAMES.len() {
            return Err(SettingsError::WeekdayOutOfRange(weekday));
        }
        if courses.is_empty() {
            self.course_schedule.remove(&weekday);
        } else {
            self.course_schedule.insert(weekday, courses);
        }
        Ok(())
    }

    pub fn courses_for(&self, weekday: u8) -> &[CourseEntry] {
        self.course_schedule
            .get(&weekday)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn mark_setup_complete(&mut self) {
        self.first_time_setup_done = true;
    }

    pub fn is_first_time(&self) -> bool {
        !self.first_time_setup_done
    }

    /// Meals (after per-day overrides) and the weekday's classes for `date`.
    pub fn fixed_intervals_for(&self, date: NaiveDate, overrides: &DayOverrides) -> Vec<FixedInterval> {
        let mut intervals = Vec::new();
        for meal in Meal::ALL {
            if let Some(range) = overrides.meal(meal, self) {
                let (start, end) = range.on(date);
                intervals.push(FixedInterval::new(start, end, meal.label()));
            }
        }
        let weekday = date.weekday().num_days_from_monday() as u8;
        for course in self.courses_for(weekday) {
            intervals.push(FixedInterval::new(
                date.and_time(course.start()),
                date.and_time(course.end()),
                format!("Course: {}", course.label()),
            ));
        }
        intervals.sort_by_key(|interval| interval.start);
        intervals
    }
}

/// Accepts `HH:MM-HH:MM`, or `none`/empty for "no range".
pub fn parse_optional_range(raw: &str) -> Result<Option<TimeRange>, ClockError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    trimmed.parse().map(Some)
}

/// Meal windows changed for a single day without touching the stored settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayOverrides {
    meals: BTreeMap<Meal, Option<TimeRange>>,
}

impl DayOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_meal(&mut self, meal: Meal, range: Option<TimeRange>) {
        self.meals.insert(meal, range);
    }

    pub fn is_empty(&self) -> bool {
        self.meals.is_empty()
    }

    /// The effective window for `meal`: the override if present, else the setting.
    pub fn meal(&self, meal: Meal, settings: &Settings) -> Option<TimeRange> {
        match self.meals.get(&meal) {
            Some(range) => *range,
            None => settings.meal(meal),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get_round_trip_scalar_keys() {
        let mut settings = Settings::default();
        settings.set("wake_up", "06:30").unwrap();
        settings.set("lunch", "11:30-12:15").unwrap();
        settings.set("dinner", "none").unwrap();
        settings.set("first_time_setup_done", "true").unwrap();

        assert_eq!(settings.get("wake_up").as_deref(), Some("06:30"));
        assert_eq!(settings.get("lunch").as_deref(), Some("11:30-12:15"));
        assert_eq!(settings.get("dinner"), None);
        assert!(!settings.is_first_time());
        assert!(matches!(
            settings.set("bedtime", "22:00"),
            Err(SettingsError::UnknownKey(_))
        ));
    }

    #[test]
    fn overrides_replace_meals_for_one_day() {
        let settings = Settings::default();
        let mut overrides = DayOverrides::new();
        overrides.set_meal(Meal::Lunch, Some("11:00-11:30".parse().unwrap()));
        overrides.set_meal(Meal::Dinner, None);

        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let labels: Vec<(String, String)> = settings
            .fixed_intervals_for(date, &overrides)
            .into_iter()
            .map(|f| (f.label, f.start.format("%H:%M").to_string()))
            .collect();
        assert_eq!(
            labels,
            vec![
                ("Breakfast".to_string(), "07:40".to_string()),
                ("Lunch".to_string(), "11:00".to_string()),
            ]
        );
    }

    #[test]
    fn course_entries_parse_from_text() {
        let course: CourseEntry = "08:00-10:00 Linear Algebra".parse().unwrap();
        assert_eq!(course.label(), "Linear Algebra");
        assert_eq!(course.to_string(), "08:00-10:00 Linear Algebra");
        assert!("08:00-10:00".parse::<CourseEntry>().is_err());
    }
}
