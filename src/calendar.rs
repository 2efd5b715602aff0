//! Calendar bucketing of tasks and reminders.
//!
//! Everything here is a pure function of its inputs and is recomputed on every
//! render. A task is on a day when the day lies within the calendar days of its
//! `[start_time, end_time]` window, ends included; the time of day plays no
//! part. Records whose timestamps do not parse are left out of every day
//! without an error.

use std::collections::HashSet;

use chrono::{Datelike, Duration, NaiveDate};
use tracing::debug;

use crate::models::{Priority, RecordId, Reminder, Task, TaskStatus};

/// Returns the tasks active on `day`.
pub fn tasks_on<'a>(day: NaiveDate, tasks: &'a [Task]) -> Vec<&'a Task> {
    tasks.iter().filter(|t| is_active_on(t, day)).collect()
}

/// Whether `task` covers `day`.
pub fn is_active_on(task: &Task, day: NaiveDate) -> bool {
    match (task.start_day(), task.end_day()) {
        (Some(start), Some(end)) => start <= day && day <= end,
        _ => {
            debug!(
                task_id = ?task.id,
                start_time = %task.start_time,
                end_time = %task.end_time,
                "skipping task with unparseable timestamps"
            );
            false
        }
    }
}

/// Returns the reminders created on `day` that belong to one of `tasks`.
///
/// A reminder pointing at a task that is not in `tasks` (another page, a
/// filtered-out team, a deleted task) is not shown, even when its date matches.
pub fn reminders_on<'a>(
    day: NaiveDate,
    reminders: &'a [Reminder],
    tasks: &[Task],
) -> Vec<&'a Reminder> {
    let loaded: HashSet<&RecordId> = tasks.iter().filter_map(|t| t.id.as_ref()).collect();
    reminders
        .iter()
        .filter(|r| {
            let on_day = match r.created_day() {
                Some(created) => created == day,
                None => {
                    debug!(reminder_id = %r.id, created_at = %r.created_at, "skipping reminder with unparseable created_at");
                    false
                }
            };
            on_day && r.task_id.as_ref().is_some_and(|id| loaded.contains(id))
        })
        .collect()
}

/// One rendered calendar cell.
#[derive(Debug, Clone)]
pub struct CalendarDay<'a> {
    pub date: NaiveDate,
    pub tasks: Vec<&'a Task>,
    pub reminders: Vec<&'a Reminder>,
}

impl<'a> CalendarDay<'a> {
    pub fn build(date: NaiveDate, tasks: &'a [Task], reminders: &'a [Reminder]) -> Self {
        CalendarDay {
            date,
            tasks: tasks_on(date, tasks),
            reminders: reminders_on(date, reminders, tasks),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() && self.reminders.is_empty()
    }

    pub fn unread_reminders(&self) -> usize {
        self.reminders.iter().filter(|r| !r.is_read).count()
    }
}

/// All days of the given month, in order. Empty for an invalid month.
pub fn month_days(year: i32, month: u32) -> Vec<NaiveDate> {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return Vec::new();
    };
    first
        .iter_days()
        .take_while(|d| d.month() == month)
        .collect()
}

/// Builds one cell per day of the month.
pub fn month_grid<'a>(
    year: i32,
    month: u32,
    tasks: &'a [Task],
    reminders: &'a [Reminder],
) -> Vec<CalendarDay<'a>> {
    month_days(year, month)
        .into_iter()
        .map(|d| CalendarDay::build(d, tasks, reminders))
        .collect()
}

/// The month laid out as Monday-first weeks.
///
/// Slots before the 1st and after the last day are `None`. Empty for an
/// invalid month.
pub fn month_weeks(year: i32, month: u32) -> Vec<[Option<NaiveDate>; 7]> {
    let days = month_days(year, month);
    let Some(first) = days.first() else {
        return Vec::new();
    };
    let lead = first.weekday().num_days_from_monday() as usize;
    let mut slots: Vec<Option<NaiveDate>> = vec![None; lead];
    slots.extend(days.into_iter().map(Some));
    slots
        .chunks(7)
        .map(|week| std::array::from_fn(|i| week.get(i).copied().flatten()))
        .collect()
}

/// The Monday-first week containing `day`.
pub fn week_of(day: NaiveDate) -> [NaiveDate; 7] {
    let monday = day - Duration::days(day.weekday().num_days_from_monday() as i64);
    std::array::from_fn(|i| monday + Duration::days(i as i64))
}

/// Display color of a task, carrying no meaning beyond rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayColor {
    Done,
    Active,
    Alert,
    Warning,
    Default,
}

/// Status wins over priority: a finished high-priority task shows as done.
pub fn display_color(status: TaskStatus, priority: Priority) -> DisplayColor {
    match (status, priority) {
        (TaskStatus::Done, _) => DisplayColor::Done,
        (TaskStatus::InProgress, _) => DisplayColor::Active,
        (_, Priority::High) => DisplayColor::Alert,
        (_, Priority::Medium) => DisplayColor::Warning,
        _ => DisplayColor::Default,
    }
}
