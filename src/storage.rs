use std::fs::{self, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::models::{RecordId, Reminder, Task};
use crate::session::Session;

/// Returns the path to the tasks file (`tasks.json`).
///
/// The path is determined in the following order:
/// 1. `TASKDESK_DB` environment variable.
/// 2. `~/.local/share/taskdesk/tasks.json` (on Linux).
/// 3. `./tasks.json` (fallback).
pub fn db_path() -> PathBuf {
    std::env::var("TASKDESK_DB").map(PathBuf::from).unwrap_or_else(|_| {
        let mut p = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        p.push("taskdesk");
        if !p.exists() {
            let _ = fs::create_dir_all(&p);
        }
        p.push("tasks.json");
        p
    })
}

/// A file in the same directory as the tasks file.
fn sibling(name: &str) -> PathBuf {
    let mut p = db_path();
    p.pop();
    p.push(name);
    p
}

pub fn reminders_path() -> PathBuf {
    sibling("reminders.json")
}

pub fn session_path() -> PathBuf {
    sibling("session.json")
}

pub fn config_path() -> PathBuf {
    sibling("config.json")
}

/// Reads a JSON file, treating a missing file as `T::default()`.
fn load_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Ok(T::default());
    }
    let mut f = OpenOptions::new().read(true).open(path)?;
    let mut s = String::new();
    f.read_to_string(&mut s)?;
    if s.trim().is_empty() {
        return Ok(T::default());
    }
    Ok(serde_json::from_str(&s)?)
}

/// Overwrites `path` with the pretty-printed JSON of `value`.
fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    let mut f = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;
    f.write_all(s.as_bytes())?;
    debug!(path = %path.display(), "saved");
    Ok(())
}

/// Loads all tasks. Returns an empty vector if the file does not exist.
pub fn load_tasks() -> Result<Vec<Task>> {
    load_json(&db_path())
}

/// Saves the given tasks, replacing the file.
pub fn save_tasks(tasks: &[Task]) -> Result<()> {
    save_json(&db_path(), tasks)
}

/// Loads all reminders. Returns an empty vector if the file does not exist.
pub fn load_reminders() -> Result<Vec<Reminder>> {
    load_json(&reminders_path())
}

pub fn save_reminders(reminders: &[Reminder]) -> Result<()> {
    save_json(&reminders_path(), reminders)
}

/// Loads the session; signed out if there is none.
pub fn load_session() -> Result<Session> {
    load_json(&session_path())
}

pub fn save_session(session: &Session) -> Result<()> {
    save_json(&session_path(), session)
}

/// Forgets the session.
pub fn clear_session() -> Result<()> {
    let path = session_path();
    if path.exists() {
        fs::remove_file(path)?;
    }
    Ok(())
}

/// Id for a new task: one past the largest numeric id in use.
pub fn next_task_id(tasks: &[Task]) -> RecordId {
    let max = tasks
        .iter()
        .filter_map(|t| t.id.as_ref().and_then(RecordId::as_number))
        .max()
        .unwrap_or(0);
    RecordId::Num(max + 1)
}

/// Deletes the tasks, reminders and session files.
pub fn delete_database() -> Result<()> {
    for path in [db_path(), reminders_path(), session_path()] {
        if path.exists() {
            fs::remove_file(path)?;
        }
    }
    Ok(())
}
