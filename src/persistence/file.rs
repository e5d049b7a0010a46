use super::{
    DayRecord, DayStore, PersistenceResult, StoredDay, date_key, parse_date_key,
};
use crate::clock::format_hhmm;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// All days in one JSON object keyed by ISO date.
///
/// A missing file is an empty store. An unreadable one is also treated as empty
/// (with a warning) and gets replaced by the next save.
pub struct JsonDayStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonDayStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> PersistenceResult<BTreeMap<String, StoredDay>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "day store missing, starting empty");
                return Ok(BTreeMap::new());
            }
            Err(err) => return Err(err.into()),
        };
        match serde_json::from_reader(BufReader::new(file)) {
            Ok(days) => Ok(days),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "day store unreadable, treating as empty");
                Ok(BTreeMap::new())
            }
        }
    }

    fn write_all(&self, days: &BTreeMap<String, StoredDay>) -> PersistenceResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(&self.path)?;
        serde_json::to_writer_pretty(file, days)?;
        Ok(())
    }
}

impl DayStore for JsonDayStore {
    fn save_day(&self, record: &DayRecord) -> PersistenceResult<()> {
        record.placed_tasks()?;
        let _guard = self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut days = self.read_all()?;
        days.insert(date_key(record.date), StoredDay::from_record(record));
        self.write_all(&days)?;
        info!(date = %record.date, tasks = record.tasks.len(), "day saved");
        Ok(())
    }

    fn load_day(&self, date: NaiveDate) -> PersistenceResult<Option<DayRecord>> {
        let mut days = self.read_all()?;
        Ok(days
            .remove(&date_key(date))
            .map(|stored| stored.into_record(date)))
    }

    fn list_days(&self) -> PersistenceResult<Vec<NaiveDate>> {
        let days = self.read_all()?;
        let mut dates = Vec::with_capacity(days.len());
        for key in days.keys() {
            match parse_date_key(key) {
                Ok(date) => dates.push(date),
                Err(err) => warn!(key = %key, error = %err, "skipping stored day"),
            }
        }
        dates.sort();
        Ok(dates)
    }
}

#[derive(Serialize)]
struct DayCsvRow {
    date: String,
    start: String,
    end: String,
    id: String,
    task: String,
    minutes: u32,
    importance: u8,
    deadline: String,
    completed: bool,
    note: String,
}

/// Writes one CSV row per task interval of `record`.
pub fn export_day_to_csv<P: AsRef<Path>>(record: &DayRecord, path: P) -> PersistenceResult<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;
    for entry in &record.tasks {
        let task = &entry.task;
        let name = match task.part {
            Some(part) => format!("{} - Part {}", task.name, part),
            None => task.name.clone(),
        };
        writer.serialize(DayCsvRow {
            date: date_key(record.date),
            start: format_hhmm(entry.start.time()),
            end: format_hhmm(entry.end.time()),
            id: task.id.to_string(),
            task: name,
            minutes: task.estimated_time,
            importance: task.importance,
            deadline: task
                .deadline
                .map(|deadline| format_hhmm(deadline.time()))
                .unwrap_or_default(),
            completed: task.completed,
            note: task.note.clone().unwrap_or_default(),
        })?;
    }
    writer.flush()?;
    info!(date = %record.date, path = %path.as_ref().display(), "day exported");
    Ok(())
}
