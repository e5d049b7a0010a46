use super::{
    DayRecord, DayStore, PersistenceError, PersistenceResult, StoredDay, date_key, parse_date_key,
};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};
use std::sync::{Mutex, MutexGuard};
use tracing::info;

/// Days in a SQLite table keyed by ISO date, each row holding the JSON body.
pub struct SqliteDayStore {
    connection: Mutex<Connection>,
}

impl SqliteDayStore {
    pub fn new<P: AsRef<std::path::Path>>(path: P) -> PersistenceResult<Self> {
        let connection = Connection::open(path)?;
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    pub fn in_memory() -> PersistenceResult<Self> {
        let connection = Connection::open_in_memory()?;
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn initialize_schema(connection: &Connection) -> PersistenceResult<()> {
        let ddl = r#"
            CREATE TABLE IF NOT EXISTS days (
                date TEXT PRIMARY KEY,
                day_json TEXT NOT NULL
            );
        "#;
        connection.execute_batch(ddl)?;
        Ok(())
    }

    fn lock(&self) -> PersistenceResult<MutexGuard<'_, Connection>> {
        self.connection
            .lock()
            .map_err(|_| PersistenceError::InvalidData("sqlite connection lock poisoned".into()))
    }
}

impl DayStore for SqliteDayStore {
    fn save_day(&self, record: &DayRecord) -> PersistenceResult<()> {
        record.placed_tasks()?;
        let json = serde_json::to_string(&StoredDay::from_record(record))?;
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO days (date, day_json) VALUES (?1, ?2)
             ON CONFLICT(date) DO UPDATE SET day_json = excluded.day_json",
            params![date_key(record.date), json],
        )?;
        tx.commit()?;
        info!(date = %record.date, tasks = record.tasks.len(), "day saved");
        Ok(())
    }

    fn load_day(&self, date: NaiveDate) -> PersistenceResult<Option<DayRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT day_json FROM days WHERE date = ?1")?;
        let json: Option<String> = stmt
            .query_row(params![date_key(date)], |row| row.get(0))
            .optional()?;

        let Some(json) = json else {
            return Ok(None);
        };
        let stored: StoredDay = serde_json::from_str(&json)?;
        Ok(Some(stored.into_record(date)))
    }

    fn list_days(&self) -> PersistenceResult<Vec<NaiveDate>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT date FROM days ORDER BY date ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut dates = Vec::new();
        for key in rows {
            dates.push(parse_date_key(&key?)?);
        }
        Ok(dates)
    }
}
