use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{Datelike, Local, NaiveDate};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::calendar::{display_color, month_weeks, tasks_on, week_of, CalendarDay, DisplayColor};
use crate::config::Config;
use crate::error::{DeskError, Result};
use crate::models::{
    format_timestamp, parse_user_timestamp, Priority, RecordId, Reminder, Task, TaskStatus,
};
use crate::session::{Role, Session};
use crate::stats::{
    resolve, series, series_for_year, sum_metric, task_records, Bucket, MonthKey, Period, StatRecord,
    StatsPayload, StatusSummary, TASKS_DONE, TASKS_STARTED,
};
use crate::storage::{
    clear_session, delete_database, load_reminders, load_session, load_tasks, next_task_id,
    save_reminders, save_session, save_tasks,
};

/// Fields of the "new task" form.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    /// `YYYY-MM-DD` or `YYYY-MM-DD HH:MM:SS`.
    pub start: String,
    /// Same format as `start`; a bare date means the end of that day.
    pub end: String,
    pub assignee: Option<RecordId>,
    pub team: Option<RecordId>,
}

/// Changes to apply to an existing task. `None` leaves a field alone.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub assignee: Option<RecordId>,
    pub team: Option<RecordId>,
}

#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub status: Option<TaskStatus>,
    pub assignee: Option<RecordId>,
    pub team: Option<RecordId>,
    /// Only tasks active on this day.
    pub day: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default)]
pub struct StatsRequest {
    /// Server statistics export. Local tasks are used when absent.
    pub input: Option<PathBuf>,
    pub metric: Option<String>,
    pub period: Period,
    pub year: Option<i32>,
}

/// A data dump from the server: the task page and the user's reminders.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ServerExport {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub reminders: Vec<Reminder>,
}

/// Creates a task and returns its id.
///
/// The task is rejected unless its end is strictly after its start.
pub fn cmd_add(new: NewTask, silent: bool) -> Result<RecordId> {
    let start = parse_user_timestamp(&new.start, false)?;
    let end = parse_user_timestamp(&new.end, true)?;
    let mut task = Task {
        id: None,
        title: new.title.trim().to_string(),
        description: new.description,
        status: new.status,
        priority: new.priority,
        start_time: format_timestamp(start),
        end_time: format_timestamp(end),
        assigned_user_id: new.assignee,
        team_id: new.team,
    };
    task.validate()?;

    let mut tasks = load_tasks()?;
    let id = next_task_id(&tasks);
    task.id = Some(id.clone());
    tasks.push(task);
    save_tasks(&tasks)?;
    info!(task_id = %id, "task added");
    if !silent { println!("Task added (id = {})", id); }
    Ok(id)
}

/// Applies `patch` to a task. The result must still be a valid task.
pub fn cmd_edit(id: &RecordId, patch: TaskPatch, silent: bool) -> Result<()> {
    let mut tasks = load_tasks()?;
    let t = find_task_mut(&mut tasks, id)?;
    let mut updated = t.clone();
    if let Some(title) = patch.title { updated.title = title.trim().to_string(); }
    if let Some(d) = patch.description { updated.description = Some(d); }
    if let Some(s) = patch.status { updated.status = s; }
    if let Some(p) = patch.priority { updated.priority = p; }
    if let Some(s) = patch.start { updated.start_time = format_timestamp(parse_user_timestamp(&s, false)?); }
    if let Some(e) = patch.end { updated.end_time = format_timestamp(parse_user_timestamp(&e, true)?); }
    if let Some(a) = patch.assignee { updated.assigned_user_id = Some(a); }
    if let Some(team) = patch.team { updated.team_id = Some(team); }
    updated.validate()?;
    *t = updated;

    save_tasks(&tasks)?;
    info!(task_id = %id, "task updated");
    if !silent { println!("Task {} updated.", id); }
    Ok(())
}

/// Sets the status of a task. Other fields are not re-validated.
pub fn cmd_status(id: &RecordId, status: TaskStatus, silent: bool) -> Result<()> {
    let mut tasks = load_tasks()?;
    find_task_mut(&mut tasks, id)?.status = status;
    save_tasks(&tasks)?;
    info!(task_id = %id, %status, "task status changed");
    if !silent { println!("Task {} is now {}.", id, status); }
    Ok(())
}

/// Removes a task by id.
pub fn cmd_remove(id: &RecordId, silent: bool) -> Result<()> {
    let mut tasks = load_tasks()?;
    let len_before = tasks.len();
    tasks.retain(|t| !t.has_id(id));
    if tasks.len() == len_before {
        return Err(DeskError::TaskNotFound { id: id.to_string() });
    }
    save_tasks(&tasks)?;
    info!(task_id = %id, "task removed");
    if !silent { println!("Task {} removed.", id); }
    Ok(())
}

fn find_task_mut<'a>(tasks: &'a mut [Task], id: &RecordId) -> Result<&'a mut Task> {
    tasks
        .iter_mut()
        .find(|t| t.has_id(id))
        .ok_or_else(|| DeskError::TaskNotFound { id: id.to_string() })
}

/// Applies `filter`, ordering by start time. Tasks without a usable start go last.
pub fn filter_tasks<'a>(tasks: &'a [Task], filter: &ListFilter) -> Vec<&'a Task> {
    let mut out: Vec<&Task> = match filter.day {
        Some(day) => tasks_on(day, tasks),
        None => tasks.iter().collect(),
    };
    out.retain(|t| {
        filter.status.map_or(true, |s| t.status == s)
            && filter.assignee.as_ref().map_or(true, |a| t.assigned_user_id.as_ref() == Some(a))
            && filter.team.as_ref().map_or(true, |team| t.team_id.as_ref() == Some(team))
    });
    out.sort_by_key(|t| (t.start().is_none(), t.start(), t.id.clone()));
    out
}

/// Lists tasks in a formatted table, colored by status and priority.
pub fn cmd_list(filter: &ListFilter) -> Result<()> {
    let tasks = load_tasks()?;
    let shown = filter_tasks(&tasks, filter);
    if shown.is_empty() {
        println!("No tasks found.");
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").add_attribute(Attribute::Bold),
            Cell::new("Title").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
            Cell::new("Priority").add_attribute(Attribute::Bold),
            Cell::new("Start").add_attribute(Attribute::Bold),
            Cell::new("End").add_attribute(Attribute::Bold),
            Cell::new("Assignee").add_attribute(Attribute::Bold),
            Cell::new("Team").add_attribute(Attribute::Bold),
        ]);

    for t in shown {
        let color = table_color(display_color(t.status, t.priority));
        table.add_row(vec![
            Cell::new(id_text(t.id.as_ref())),
            Cell::new(&t.title),
            Cell::new(t.status).fg(color),
            Cell::new(t.priority).fg(color),
            Cell::new(&t.start_time),
            Cell::new(&t.end_time),
            Cell::new(id_text(t.assigned_user_id.as_ref())),
            Cell::new(id_text(t.team_id.as_ref())),
        ]);
    }

    println!("{table}");
    Ok(())
}

/// Shows the tasks and reminders of one day.
pub fn cmd_day(day: NaiveDate) -> Result<()> {
    let tasks = load_tasks()?;
    let reminders = load_reminders()?;
    let cell = CalendarDay::build(day, &tasks, &reminders);

    println!("{}", day.format("%A, %Y-%m-%d"));
    if cell.is_empty() {
        println!("Nothing scheduled.");
        return Ok(());
    }
    for t in &cell.tasks {
        println!(
            "  [{}] {} ({}, {})  {} -> {}",
            id_text(t.id.as_ref()),
            t.title,
            t.status,
            t.priority,
            t.start_time,
            t.end_time
        );
    }
    for r in &cell.reminders {
        let mark = if r.is_read { " " } else { "*" };
        println!("  {} reminder {}: {}", mark, r.id, r.message);
    }
    Ok(())
}

/// Prints a month as a Monday-first grid.
pub fn cmd_calendar(year: i32, month: u32) -> Result<()> {
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| DeskError::InvalidDate {
        date: format!("{:04}-{:02}", year, month),
    })?;
    let tasks = load_tasks()?;
    let reminders = load_reminders()?;
    let today = Local::now().date_naive();

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"]
                .into_iter()
                .map(|d| Cell::new(d).add_attribute(Attribute::Bold)),
        );

    for week in month_weeks(year, month) {
        table.add_row(week.iter().map(|slot| match slot {
            Some(d) => calendar_cell(&CalendarDay::build(*d, &tasks, &reminders), *d == today),
            None => Cell::new(""),
        }));
    }

    println!("{}", first.format("%B %Y"));
    println!("{table}");
    Ok(())
}

/// Prints the week containing `day`.
pub fn cmd_week(day: NaiveDate) -> Result<()> {
    let tasks = load_tasks()?;
    let reminders = load_reminders()?;
    let today = Local::now().date_naive();
    let days = week_of(day);

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            days.iter()
                .map(|d| Cell::new(d.format("%a %m-%d")).add_attribute(Attribute::Bold)),
        );
    table.add_row(days.iter().map(|d| {
        let cell = CalendarDay::build(*d, &tasks, &reminders);
        calendar_cell(&cell, *d == today)
    }));
    println!("{table}");
    Ok(())
}

const CELL_TASK_LINES: usize = 3;

fn calendar_cell(cell: &CalendarDay<'_>, is_today: bool) -> Cell {
    let mut lines = vec![cell.date.day().to_string()];
    for t in cell.tasks.iter().take(CELL_TASK_LINES) {
        lines.push(format!("- {}", t.title));
    }
    if cell.tasks.len() > CELL_TASK_LINES {
        lines.push(format!("+{} more", cell.tasks.len() - CELL_TASK_LINES));
    }
    if !cell.reminders.is_empty() {
        lines.push(format!("! {} reminder(s)", cell.reminders.len()));
    }
    let c = Cell::new(lines.join("\n"));
    if is_today { c.add_attribute(Attribute::Bold).fg(Color::Cyan) } else { c }
}

/// Lists every stored reminder, newest first.
pub fn cmd_reminders(unread_only: bool) -> Result<()> {
    let tasks = load_tasks()?;
    let mut reminders = load_reminders()?;
    if unread_only {
        reminders.retain(|r| !r.is_read);
    }
    if reminders.is_empty() {
        println!("No reminders.");
        return Ok(());
    }
    reminders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["ID", "Message", "Task", "Type", "Created", "Read"]);
    for r in reminders {
        let task_title = r
            .task_id
            .as_ref()
            .and_then(|id| tasks.iter().find(|t| t.has_id(id)))
            .map(|t| t.title.clone())
            .unwrap_or_else(|| "-".into());
        let kind = r.kind.map(|k| k.to_string()).unwrap_or_else(|| "-".into());
        table.add_row(vec![
            Cell::new(&r.id),
            Cell::new(&r.message),
            Cell::new(task_title),
            Cell::new(kind),
            Cell::new(&r.created_at),
            Cell::new(if r.is_read { "yes" } else { "no" })
                .fg(if r.is_read { Color::Reset } else { Color::Yellow }),
        ]);
    }
    println!("{table}");
    Ok(())
}

/// Marks a reminder as read. The only change the client makes to reminders.
pub fn cmd_mark_read(id: &RecordId, silent: bool) -> Result<()> {
    let mut reminders = load_reminders()?;
    let r = reminders
        .iter_mut()
        .find(|r| &r.id == id)
        .ok_or_else(|| DeskError::ReminderNotFound { id: id.to_string() })?;
    r.is_read = true;
    save_reminders(&reminders)?;
    info!(reminder_id = %id, "reminder marked read");
    if !silent { println!("Reminder {} marked as read.", id); }
    Ok(())
}

/// Replaces local tasks and reminders with a server export.
///
/// Returns the number of tasks and reminders loaded.
pub fn cmd_import(path: &Path, silent: bool) -> Result<(usize, usize)> {
    let raw = fs::read_to_string(path)?;
    let export: ServerExport = serde_json::from_str(&raw)?;
    save_tasks(&export.tasks)?;
    save_reminders(&export.reminders)?;
    let counts = (export.tasks.len(), export.reminders.len());
    info!(tasks = counts.0, reminders = counts.1, path = %path.display(), "imported server export");
    if !silent { println!("Imported {} task(s) and {} reminder(s).", counts.0, counts.1); }
    Ok(counts)
}

/// Totals for local tasks in the same shape the server sends.
///
/// The `month` period uses the month of `today`, the `year` period sums `year`.
pub fn local_payload(tasks: &[Task], today: NaiveDate, year: i32, period: Period) -> StatsPayload {
    let records = task_records(tasks);
    let mut totals = Map::new();
    for metric in [TASKS_STARTED, TASKS_DONE] {
        let total: f64 = match period {
            Period::Month => {
                let current = MonthKey::from_date(today).to_string();
                records
                    .iter()
                    .filter(|r| r.month == current)
                    .map(|r| r.value(metric))
                    .sum()
            }
            _ => sum_metric(&records, metric, year),
        };
        totals.insert(metric.to_string(), Value::from(total));
    }
    StatsPayload {
        totals,
        series: records,
    }
}

/// Shows a statistic and its monthly series; returns the scalar.
///
/// With `input` set the numbers come from a server export of the admin
/// dashboard, which needs an admin session. Otherwise they are computed from
/// local tasks.
pub fn cmd_stats(req: &StatsRequest, config: &Config, session: &Session, silent: bool) -> Result<f64> {
    let metric = req.metric.clone().unwrap_or_else(|| config.default_metric.clone());
    let year = req.year.unwrap_or(config.stats_year);

    let (payload, summary) = match &req.input {
        Some(path) => {
            session.require_admin("team statistics")?;
            let raw = fs::read_to_string(path)?;
            (serde_json::from_str::<StatsPayload>(&raw)?, None)
        }
        None => {
            let tasks = load_tasks()?;
            let today = Local::now().date_naive();
            (local_payload(&tasks, today, year, req.period), Some(StatusSummary::from_tasks(&tasks)))
        }
    };

    let total = resolve(&payload, &metric, req.period, year);
    if silent {
        return Ok(total);
    }

    if let Some(s) = summary {
        println!(
            "Tasks: {} total | {} todo | {} in progress | {} done ({:.0}% complete)",
            s.total,
            s.todo,
            s.in_progress,
            s.done,
            s.completion_rate() * 100.0
        );
        println!("Priority: {} high | {} medium | {} low", s.high, s.medium, s.low);
    }

    let chart = match req.period {
        Period::All => series_for_year(&payload.series, &metric, year),
        _ => series(&payload.series, &metric),
    };
    print_series(&chart_records(&chart, &metric), &metric);
    let scope = match req.period {
        Period::All => format!("all of {}", year),
        p => format!("this {}", p),
    };
    println!("{} ({}): {}", metric, scope, fmt_value(total));
    Ok(total)
}

fn chart_records(chart: &[Bucket], metric: &str) -> Vec<StatRecord> {
    chart
        .iter()
        .map(|b| StatRecord::new(b.month.clone()).with(metric, b.value))
        .collect()
}

fn print_series(records: &[StatRecord], metric: &str) {
    if records.is_empty() {
        println!("No data.");
        return;
    }
    let peak = records.iter().map(|r| r.value(metric)).fold(0.0_f64, f64::max);
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Month", metric, ""]);
    for r in records {
        let v = r.value(metric);
        let width = if peak > 0.0 { ((v / peak) * 30.0).round() as usize } else { 0 };
        table.add_row(vec![
            Cell::new(&r.month),
            Cell::new(fmt_value(v)),
            Cell::new("#".repeat(width)).fg(Color::Green),
        ]);
    }
    println!("{table}");
}

/// Stores a session for `username`.
pub fn cmd_login(username: String, token: String, role: Role, silent: bool) -> Result<Session> {
    if username.trim().is_empty() || token.trim().is_empty() {
        return Err(DeskError::validation("username and token must not be empty"));
    }
    let session = Session::login(username.trim(), token.trim(), role);
    save_session(&session)?;
    info!(username = %username.trim(), %role, "logged in");
    if !silent { println!("Logged in as {} ({}).", username.trim(), role); }
    Ok(session)
}

pub fn cmd_logout(silent: bool) -> Result<()> {
    clear_session()?;
    info!("logged out");
    if !silent { println!("Logged out."); }
    Ok(())
}

pub fn cmd_whoami() -> Result<()> {
    let session = load_session()?;
    match (&session.username, session.is_authenticated()) {
        (Some(name), true) => {
            let since = session
                .logged_in_at
                .map(|t| format!(" since {}", t.format("%Y-%m-%d %H:%M")))
                .unwrap_or_default();
            println!("{} ({}){}", name, session.role, since);
        }
        _ => println!("Not logged in."),
    }
    Ok(())
}

/// Resets the database by deleting all tasks, reminders and the session.
pub fn cmd_reset(force: bool) -> Result<()> {
    if !force {
        print!("Are you sure you want to delete all tasks and reminders? This cannot be undone. [y/N] ");
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if input.trim().to_lowercase() != "y" {
            println!("Aborted.");
            return Ok(());
        }
    }
    delete_database()?;
    println!("Database reset successfully.");
    Ok(())
}

fn table_color(color: DisplayColor) -> Color {
    match color {
        DisplayColor::Done => Color::Green,
        DisplayColor::Active => Color::Blue,
        DisplayColor::Alert => Color::Red,
        DisplayColor::Warning => Color::Yellow,
        DisplayColor::Default => Color::Reset,
    }
}

fn id_text(id: Option<&RecordId>) -> String {
    id.map(ToString::to_string).unwrap_or_else(|| "-".into())
}

/// Whole numbers print without decimals.
pub fn fmt_value(v: f64) -> String {
    if v.fract() == 0.0 { format!("{:.0}", v) } else { format!("{:.2}", v) }
}
