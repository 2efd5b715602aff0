use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::DeskError;

/// Wire format for task and reminder timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const DATETIME_FORMATS: [&str; 4] = [
    TIMESTAMP_FORMAT,
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Identifier of a task, reminder, user or team.
///
/// The backend hands out numbers for some records and strings for others,
/// and the same id may arrive as `5` in one payload and `"5"` in another.
/// Two ids are equal when their text forms are equal.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum RecordId {
    Num(u64),
    Text(String),
}

impl RecordId {
    /// Numeric value, if the id is a number or a string holding one.
    pub fn as_number(&self) -> Option<u64> {
        match self {
            RecordId::Num(n) => Some(*n),
            RecordId::Text(s) => s.trim().parse().ok(),
        }
    }

    fn key(&self) -> String {
        match self {
            RecordId::Num(n) => n.to_string(),
            RecordId::Text(s) => s.trim().to_string(),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl PartialEq for RecordId {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for RecordId {}

impl Hash for RecordId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for RecordId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RecordId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.as_number(), other.as_number()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.key().cmp(&other.key())),
            _ => self.key().cmp(&other.key()),
        }
    }
}

impl From<u64> for RecordId {
    fn from(n: u64) -> Self {
        RecordId::Num(n)
    }
}

impl FromStr for RecordId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().parse::<u64>() {
            Ok(n) => RecordId::Num(n),
            Err(_) => RecordId::Text(s.trim().to_string()),
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    /// Next status in the todo -> in_progress -> done -> todo cycle.
    pub fn cycle(self) -> TaskStatus {
        match self {
            TaskStatus::Todo => TaskStatus::InProgress,
            TaskStatus::InProgress => TaskStatus::Done,
            TaskStatus::Done => TaskStatus::Todo,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = DeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "todo" => Ok(TaskStatus::Todo),
            "in_progress" | "doing" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            other => Err(DeskError::validation(format!(
                "unknown status '{}'. Supported: todo, in_progress, done",
                other
            ))),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = DeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(DeskError::validation(format!(
                "unknown priority '{}'. Supported: low, medium, high",
                other
            ))),
        }
    }
}

/// A single unit of work, personal or owned by a team.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Task {
    /// Assigned by the store on creation; absent on records not yet saved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
    /// Start of the task window, `YYYY-MM-DD HH:MM:SS`.
    ///
    /// Kept as received: a malformed value is not rejected on load, it only
    /// keeps the task off every calendar day.
    #[serde(default, deserialize_with = "lenient_string")]
    pub start_time: String,
    /// End of the task window, same format as `start_time`.
    #[serde(default, deserialize_with = "lenient_string")]
    pub end_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_user_id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<RecordId>,
}

impl Task {
    pub fn start(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.start_time)
    }

    pub fn end(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.end_time)
    }

    /// Calendar day of `start_time`, if it parses.
    pub fn start_day(&self) -> Option<NaiveDate> {
        self.start().map(|t| t.date())
    }

    /// Calendar day of `end_time`, if it parses.
    pub fn end_day(&self) -> Option<NaiveDate> {
        self.end().map(|t| t.date())
    }

    pub fn has_id(&self, id: &RecordId) -> bool {
        self.id.as_ref() == Some(id)
    }

    /// Checks the rules a task must satisfy when it is submitted.
    ///
    /// Stored and imported tasks are never re-validated.
    pub fn validate(&self) -> Result<(), DeskError> {
        if self.title.trim().is_empty() {
            return Err(DeskError::validation("title must not be empty"));
        }
        let start = self.start().ok_or_else(|| DeskError::InvalidDate {
            date: self.start_time.clone(),
        })?;
        let end = self.end().ok_or_else(|| DeskError::InvalidDate {
            date: self.end_time.clone(),
        })?;
        if end <= start {
            return Err(DeskError::validation(format!(
                "end time {} must be after start time {}",
                self.end_time, self.start_time
            )));
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    Task,
    Assignment,
}

impl fmt::Display for ReminderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReminderKind::Task => "task",
            ReminderKind::Assignment => "assignment",
        })
    }
}

/// A server-issued notification, optionally tied to a task.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Reminder {
    pub id: RecordId,
    #[serde(rename = "mes", default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<RecordId>,
    #[serde(default, deserialize_with = "flag")]
    pub is_read: bool,
    #[serde(default, deserialize_with = "lenient_string")]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ReminderKind>,
}

impl Reminder {
    /// Calendar day of `created_at`, if it parses.
    pub fn created_day(&self) -> Option<NaiveDate> {
        parse_timestamp(&self.created_at).map(|t| t.date())
    }
}

// Older payloads send is_read as 0/1.
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(b)) => b,
        Some(Flag::Int(i)) => i != 0,
        None => false,
    })
}

// Null reads as empty text, numbers as their digits.
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

/// Parses a wire timestamp. Unrecognised input yields `None`.
///
/// Accepts `YYYY-MM-DD HH:MM:SS`, the `T`-separated variant (with or without
/// fractional seconds), RFC 3339 with an offset, and a bare `YYYY-MM-DD`,
/// which is read as midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(t) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(t);
        }
    }
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.naive_local());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

/// Parses a timestamp typed by the user.
///
/// A bare date is taken as the start of the day, or as its last second when
/// `end_of_day` is set, so `--end 2025-06-05` covers all of June 5th.
pub fn parse_user_timestamp(raw: &str, end_of_day: bool) -> Result<NaiveDateTime, DeskError> {
    let invalid = || DeskError::InvalidDate {
        date: raw.to_string(),
    };
    if let Ok(d) = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
        let time = if end_of_day {
            NaiveTime::from_hms_opt(23, 59, 59).ok_or_else(invalid)?
        } else {
            NaiveTime::MIN
        };
        return Ok(d.and_time(time));
    }
    parse_timestamp(raw).ok_or_else(invalid)
}

pub fn parse_day(raw: &str) -> Result<NaiveDate, DeskError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| DeskError::InvalidDate {
        date: raw.to_string(),
    })
}

pub fn format_timestamp(t: NaiveDateTime) -> String {
    t.format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(start: &str, end: &str) -> Task {
        Task {
            id: None,
            title: "Write report".into(),
            description: None,
            status: TaskStatus::Todo,
            priority: Priority::Medium,
            start_time: start.into(),
            end_time: end.into(),
            assigned_user_id: None,
            team_id: None,
        }
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        for raw in [
            "2025-06-01 09:30:00",
            "2025-06-01T09:30:00",
            "2025-06-01T09:30:00.250",
            "2025-06-01 09:30",
            "2025-06-01T09:30:00+02:00",
            "2025-06-01",
            "  2025-06-01  ",
        ] {
            assert_eq!(parse_timestamp(raw).map(|t| t.date()), Some(expected), "{raw}");
        }
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("soon"), None);
        assert_eq!(parse_timestamp("2025-13-01"), None);
    }

    #[test]
    fn test_user_timestamp_end_of_day() {
        let end = parse_user_timestamp("2025-06-05", true).unwrap();
        assert_eq!(format_timestamp(end), "2025-06-05 23:59:59");
        let start = parse_user_timestamp("2025-06-05", false).unwrap();
        assert_eq!(format_timestamp(start), "2025-06-05 00:00:00");
        assert!(parse_user_timestamp("June", false).is_err());
    }

    #[test]
    fn test_record_id_equality_across_forms() {
        let num: RecordId = serde_json::from_str("5").unwrap();
        let text: RecordId = serde_json::from_str("\"5\"").unwrap();
        assert_eq!(num, text);
        assert_eq!(num.as_number(), Some(5));

        let uuid: RecordId = serde_json::from_str("\"a1b2\"").unwrap();
        assert_ne!(uuid, num);
        assert_eq!(uuid.as_number(), None);
        assert!(RecordId::Num(2) < RecordId::Num(10));
    }

    #[test]
    fn test_record_id_order_agrees_with_equality() {
        let padded = RecordId::Text("05".into());
        let plain = RecordId::Num(5);
        assert_ne!(padded, plain);
        assert_ne!(padded.cmp(&plain), Ordering::Equal);
        assert_eq!(plain.cmp(&RecordId::Text("5".into())), Ordering::Equal);
    }

    #[test]
    fn test_null_fields_load() {
        let json = r#"[
            {"id": 1, "title": "Fine", "start_time": "2025-06-01 09:00:00", "end_time": "2025-06-02 09:00:00"},
            {"id": 2, "title": "Open ended", "start_time": "2025-06-01 09:00:00", "end_time": null}
        ]"#;
        let tasks: Vec<Task> = serde_json::from_str(json).unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[1].end_time, "");
        assert_eq!(tasks[1].end_day(), None);

        let r: Reminder =
            serde_json::from_str(r#"{"id": 1, "mes": "x", "is_read": null, "created_at": null}"#).unwrap();
        assert!(!r.is_read);
        assert_eq!(r.created_day(), None);
    }

    #[test]
    fn test_validate() {
        assert!(task("2025-06-01 09:00:00", "2025-06-01 10:00:00").validate().is_ok());

        let err = task("2025-06-01 10:00:00", "2025-06-01 10:00:00").validate().unwrap_err();
        assert!(matches!(err, DeskError::Validation { .. }));

        let err = task("yesterday", "2025-06-01 10:00:00").validate().unwrap_err();
        assert!(matches!(err, DeskError::InvalidDate { .. }));

        let mut blank = task("2025-06-01 09:00:00", "2025-06-02 09:00:00");
        blank.title = "   ".into();
        assert!(blank.validate().is_err());
    }

    #[test]
    fn test_task_wire_format() {
        let json = r#"{
            "id": 12,
            "title": "Ship release",
            "status": "in_progress",
            "priority": "high",
            "start_time": "2025-06-01 09:00:00",
            "end_time": "2025-06-03 18:00:00",
            "team_id": "t-7"
        }"#;
        let t: Task = serde_json::from_str(json).unwrap();
        assert_eq!(t.id, Some(RecordId::Num(12)));
        assert_eq!(t.status, TaskStatus::InProgress);
        assert_eq!(t.priority, Priority::High);
        assert_eq!(t.team_id, Some(RecordId::Text("t-7".into())));
        assert_eq!(t.end_day(), NaiveDate::from_ymd_opt(2025, 6, 3));
    }

    #[test]
    fn test_reminder_wire_format() {
        let json = r#"{"id": 3, "mes": "Review due", "task_id": "12", "is_read": 0,
                       "created_at": "2025-06-02 08:00:00", "type": "assignment"}"#;
        let r: Reminder = serde_json::from_str(json).unwrap();
        assert_eq!(r.message, "Review due");
        assert!(!r.is_read);
        assert_eq!(r.kind, Some(ReminderKind::Assignment));
        assert_eq!(r.task_id, Some(RecordId::Num(12)));

        let back = serde_json::to_value(&r).unwrap();
        assert_eq!(back["mes"], "Review due");
        assert_eq!(back["type"], "assignment");
    }

    #[test]
    fn test_status_cycle_and_parse() {
        assert_eq!(TaskStatus::Todo.cycle(), TaskStatus::InProgress);
        assert_eq!(TaskStatus::Done.cycle(), TaskStatus::Todo);
        assert_eq!("in-progress".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert!("later".parse::<TaskStatus>().is_err());
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
    }
}
