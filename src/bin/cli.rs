use chrono::{Local, NaiveDate, NaiveDateTime};
use day_scheduler::clock::parse_hhmm;
use day_scheduler::display::{render_outcome, render_schedule, render_tasks};
use day_scheduler::persistence::{
    DayMeta, DayRecord, DayStore, JsonDayStore, PersistenceResult, export_day_to_csv,
};
use day_scheduler::settings::{CourseEntry, WEEKDAY_NAMES, parse_optional_range};
use day_scheduler::{DayOverrides, Meal, Schedule, Scheduler, Settings, Task};
use std::env;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const DATA_DIR_ENV: &str = "DAY_SCHEDULER_DIR";
const STORE_ENV: &str = "DAY_SCHEDULER_STORE";

fn print_help() {
    println!(
        "Commands:\n  help                                     Show this help\n  settings show                            Show stored settings\n  settings set <key> <value>               Set wake_up, sleep, breakfast, lunch, dinner\n  course set <weekday> <HH:MM-HH:MM label>[; ...]\n                                           Replace a weekday's classes (0 = Monday)\n  course clear <weekday>                   Remove a weekday's classes\n  setup done                               Mark first-time setup as finished\n  day <YYYY-MM-DD>                         Switch the day being planned\n  meal <breakfast|lunch|dinner> <HH:MM-HH:MM|none>\n                                           Override a meal for this day only\n  add <name> <minutes> <importance> [start=HH:MM] [deadline=HH:MM] [nosplit] [note=<text>]\n                                           Queue a task (importance 1-5)\n  tasks                                    List queued tasks\n  drop <index>                             Remove a queued task\n  plan                                     Schedule the queued tasks\n  show                                     Show the current plan\n  save                                     Store the current plan for the day\n  load                                     Load the stored plan for the day\n  done <id-prefix>                         Mark a stored task as completed\n  export <csv-path>                        Write the day's plan as CSV\n  quit|exit                                Exit"
    );
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("day_scheduler=info,cli=info")),
        )
        .with_writer(io::stderr)
        .init();
}

fn open_store(dir: &std::path::Path) -> PersistenceResult<Box<dyn DayStore>> {
    let backend = env::var(STORE_ENV).unwrap_or_default();
    if backend.eq_ignore_ascii_case("sqlite") {
        #[cfg(feature = "sqlite")]
        {
            std::fs::create_dir_all(dir)?;
            let store = day_scheduler::persistence::SqliteDayStore::new(dir.join("days.sqlite3"))?;
            return Ok(Box::new(store));
        }
        #[cfg(not(feature = "sqlite"))]
        tracing::warn!("built without sqlite support, using the JSON day store");
    }
    Ok(Box::new(JsonDayStore::new(dir.join("days.json"))))
}

/// Everything the REPL keeps between commands.
struct Session {
    settings: Settings,
    settings_path: PathBuf,
    store: Box<dyn DayStore>,
    date: NaiveDate,
    overrides: DayOverrides,
    tasks: Vec<Task>,
    schedule: Option<Schedule>,
}

impl Session {
    fn at(&self, raw: &str) -> Result<NaiveDateTime, String> {
        parse_hhmm(raw)
            .map(|time| self.date.and_time(time))
            .map_err(|e| e.to_string())
    }

    fn save_settings(&self) {
        if let Err(e) = self.settings.save(&self.settings_path) {
            println!("Could not save settings: {}", e);
        }
    }

    fn set_day(&mut self, date: NaiveDate) {
        self.date = date;
        self.overrides = DayOverrides::new();
        self.tasks.clear();
        self.schedule = None;
    }

    fn parse_task(&self, args: &[&str], rest: &str) -> Result<Task, String> {
        let (name, minutes, importance) = match args {
            [name, minutes, importance, ..] => (*name, *minutes, *importance),
            _ => return Err("Usage: add <name> <minutes> <importance> [start=HH:MM] [deadline=HH:MM] [nosplit] [note=<text>]".into()),
        };
        let minutes: u32 = minutes.parse().map_err(|_| "Invalid minutes".to_string())?;
        let importance: u8 = importance.parse().map_err(|_| "Invalid importance (1-5)".to_string())?;

        let mut builder = Task::builder(name, minutes, importance);
        for option in &args[3..] {
            if let Some(raw) = option.strip_prefix("start=") {
                builder = builder.earliest_start(Some(self.at(raw)?));
            } else if let Some(raw) = option.strip_prefix("deadline=") {
                builder = builder.deadline(Some(self.at(raw)?));
            } else if *option == "nosplit" {
                builder = builder.splittable(false);
            } else if option.starts_with("note=") {
                break;
            } else {
                return Err(format!("Unknown option '{}'", option));
            }
        }
        if let Some((_, note)) = rest.split_once("note=") {
            builder = builder.note(note.trim());
        }
        builder.build().map_err(|e| e.to_string())
    }

    fn current_record(&self) -> PersistenceResult<Option<DayRecord>> {
        match &self.schedule {
            Some(schedule) => {
                let meta = DayMeta::for_schedule(schedule, &self.settings, &self.overrides);
                Ok(Some(DayRecord::from_schedule(schedule, &meta)))
            }
            None => self.store.load_day(self.date),
        }
    }
}

fn parse_weekday(raw: &str) -> Option<u8> {
    if let Ok(index) = raw.parse::<u8>() {
        return (usize::from(index) < WEEKDAY_NAMES.len()).then_some(index);
    }
    let raw = raw.to_ascii_lowercase();
    WEEKDAY_NAMES
        .iter()
        .position(|name| name.to_ascii_lowercase().starts_with(&raw) && raw.len() >= 2)
        .and_then(|idx| u8::try_from(idx).ok())
}

fn main() {
    init_tracing();

    let dir = PathBuf::from(env::var(DATA_DIR_ENV).unwrap_or_else(|_| "data".to_string()));
    let settings_path = dir.join("settings.json");
    let store = match open_store(&dir) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Could not open day store: {}", e);
            std::process::exit(1);
        }
    };
    let mut session = Session {
        settings: Settings::load_or_default(&settings_path),
        settings_path,
        store,
        date: Local::now().date_naive(),
        overrides: DayOverrides::new(),
        tasks: Vec::new(),
        schedule: None,
    };

    println!("Day Scheduler (CLI) - type 'help' for commands");
    if session.settings.is_first_time() {
        println!("First run: check 'settings show', add classes with 'course set', then 'setup done'.");
    }
    println!("Planning {}\n", session.date);

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let args: Vec<&str> = input.split_whitespace().collect();
        let cmd = args[0];
        let rest = input[cmd.len()..].trim_start();

        match cmd {
            "help" => print_help(),
            "quit" | "exit" => break,
            "settings" => match args.get(1).copied() {
                Some("show") => {
                    for key in Settings::KEYS {
                        let value = session.settings.get(key).unwrap_or_else(|| "none".into());
                        println!("{:<22} {}", key, value);
                    }
                    for (weekday, name) in WEEKDAY_NAMES.iter().enumerate() {
                        let courses = u8::try_from(weekday)
                            .map(|w| session.settings.courses_for(w))
                            .unwrap_or(&[]);
                        if !courses.is_empty() {
                            let list: Vec<String> = courses.iter().map(ToString::to_string).collect();
                            println!("{:<22} {}", name, list.join("; "));
                        }
                    }
                }
                Some("set") => match (args.get(2), args.get(3)) {
                    (Some(key), Some(_)) => {
                        let value = args[3..].join(" ");
                        match session.settings.set(key, &value) {
                            Ok(()) => {
                                session.save_settings();
                                println!("{} set.", key);
                            }
                            Err(e) => println!("Error: {}", e),
                        }
                    }
                    _ => println!("Usage: settings set <key> <value>"),
                },
                _ => println!("Usage: settings show | settings set <key> <value>"),
            },
            "course" => {
                let weekday = args.get(2).and_then(|raw| parse_weekday(raw));
                match (args.get(1).copied(), weekday) {
                    (Some("set"), Some(weekday)) => {
                        let entries = args[3..].join(" ");
                        let parsed: Result<Vec<CourseEntry>, _> = entries
                            .split(';')
                            .map(str::trim)
                            .filter(|entry| !entry.is_empty())
                            .map(str::parse)
                            .collect();
                        match parsed.and_then(|courses| session.settings.set_courses(weekday, courses)) {
                            Ok(()) => {
                                session.save_settings();
                                println!("Courses for {} set.", WEEKDAY_NAMES[usize::from(weekday)]);
                            }
                            Err(e) => println!("Error: {}", e),
                        }
                    }
                    (Some("clear"), Some(weekday)) => match session.settings.set_courses(weekday, Vec::new()) {
                        Ok(()) => {
                            session.save_settings();
                            println!("Courses for {} cleared.", WEEKDAY_NAMES[usize::from(weekday)]);
                        }
                        Err(e) => println!("Error: {}", e),
                    },
                    _ => println!("Usage: course set <weekday> <HH:MM-HH:MM label>[; ...] | course clear <weekday>"),
                }
            }
            "setup" => {
                if args.get(1) == Some(&"done") {
                    session.settings.mark_setup_complete();
                    session.save_settings();
                    println!("Setup complete.");
                } else {
                    println!("Usage: setup done");
                }
            }
            "day" => match args.get(1).map(|raw| NaiveDate::parse_from_str(raw, "%Y-%m-%d")) {
                Some(Ok(date)) => {
                    session.set_day(date);
                    println!("Planning {}", date);
                }
                Some(Err(_)) => println!("Invalid date (YYYY-MM-DD)"),
                None => println!("Usage: day <YYYY-MM-DD>"),
            },
            "meal" => match (args.get(1).map(|raw| raw.parse::<Meal>()), args.get(2)) {
                (Some(Ok(meal)), Some(raw)) => match parse_optional_range(raw) {
                    Ok(range) => {
                        session.overrides.set_meal(meal, range);
                        match range {
                            Some(range) => println!("{} on {} set to {}.", meal.label(), session.date, range),
                            None => println!("No {} on {}.", meal.key(), session.date),
                        }
                    }
                    Err(e) => println!("Error: {}", e),
                },
                (Some(Err(e)), _) => println!("Error: {}", e),
                _ => println!("Usage: meal <breakfast|lunch|dinner> <HH:MM-HH:MM|none>"),
            },
            "add" => match session.parse_task(&args[1..], rest) {
                Ok(task) => {
                    println!("Added {}.", task);
                    session.tasks.push(task);
                }
                Err(e) => println!("Error: {}", e),
            },
            "tasks" => print!("{}", render_tasks(&session.tasks)),
            "drop" => {
                let index = args.get(1).and_then(|raw| raw.parse::<usize>().ok());
                match index {
                    Some(index) if index >= 1 && index <= session.tasks.len() => {
                        let task = session.tasks.remove(index - 1);
                        println!("Dropped {}.", task.name());
                    }
                    _ => println!("Usage: drop <index> (see 'tasks')"),
                }
            }
            "plan" => {
                let mut schedule = match Schedule::from_settings(session.date, &session.settings, &session.overrides) {
                    Ok(schedule) => schedule,
                    Err(e) => {
                        println!("Error: {}", e);
                        continue;
                    }
                };
                match Scheduler::default().schedule_tasks(&session.tasks, &mut schedule) {
                    Ok(outcome) => {
                        print!("{}", render_outcome(&outcome));
                        print!("{}", render_schedule(&schedule));
                        session.schedule = Some(schedule);
                    }
                    Err(e) => println!("Error: {}", e),
                }
            }
            "show" => match &session.schedule {
                Some(schedule) => print!("{}", render_schedule(schedule)),
                None => println!("Nothing planned yet. Use 'plan' or 'load'."),
            },
            "save" => match &session.schedule {
                Some(schedule) => {
                    let meta = DayMeta::for_schedule(schedule, &session.settings, &session.overrides);
                    let record = DayRecord::from_schedule(schedule, &meta);
                    match session.store.save_day(&record) {
                        Ok(()) => println!("Day {} saved.", session.date),
                        Err(e) => println!("Error: {}", e),
                    }
                }
                None => println!("Nothing planned yet. Use 'plan' first."),
            },
            "load" => match session.store.load_day(session.date) {
                Ok(Some(record)) => match record.to_schedule() {
                    Ok(schedule) => {
                        println!("Day {} loaded.", session.date);
                        print!("{}", render_schedule(&schedule));
                        session.schedule = Some(schedule);
                    }
                    Err(e) => println!("Error: {}", e),
                },
                Ok(None) => println!("No plan stored for {}.", session.date),
                Err(e) => println!("Error: {}", e),
            },
            "done" => {
                let Some(prefix) = args.get(1) else {
                    println!("Usage: done <id-prefix>");
                    continue;
                };
                let record = match session.store.load_day(session.date) {
                    Ok(Some(record)) => record,
                    Ok(None) => {
                        println!("No plan stored for {}.", session.date);
                        continue;
                    }
                    Err(e) => {
                        println!("Error: {}", e);
                        continue;
                    }
                };
                let matches: Vec<_> = record
                    .tasks
                    .iter()
                    .filter(|entry| entry.task.id.to_string().starts_with(prefix))
                    .collect();
                match matches.as_slice() {
                    [entry] => match session.store.mark_completed(session.date, entry.task.id) {
                        Ok(()) => {
                            println!("Marked '{}' done.", entry.task.name);
                            match session.store.load_day(session.date).and_then(|updated| {
                                updated.map(|record| record.to_schedule()).transpose()
                            }) {
                                Ok(schedule) => session.schedule = schedule,
                                Err(e) => println!("Could not reload {}: {}", session.date, e),
                            }
                        }
                        Err(e) => println!("Error: {}", e),
                    },
                    [] => println!("No stored task id starts with '{}'.", prefix),
                    _ => println!("'{}' matches {} tasks; use a longer prefix.", prefix, matches.len()),
                }
            }
            "export" => {
                let Some(path) = args.get(1) else {
                    println!("Usage: export <csv-path>");
                    continue;
                };
                match session.current_record() {
                    Ok(Some(record)) => match export_day_to_csv(&record, path) {
                        Ok(()) => println!("Exported {} to {}.", session.date, path),
                        Err(e) => println!("Error: {}", e),
                    },
                    Ok(None) => println!("Nothing to export for {}.", session.date),
                    Err(e) => println!("Error: {}", e),
                }
            }
            _ => println!("Unknown command. Type 'help'."),
        }
    }
}
