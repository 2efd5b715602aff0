use chrono::{Datelike, Duration, Local, Months, NaiveDate};
use ratatui::widgets::TableState;

use crate::calendar::{month_weeks, CalendarDay};
use crate::commands::{cmd_add, cmd_mark_read, cmd_remove, cmd_status, NewTask};
use crate::error::Result;
use crate::models::{Reminder, Task};
use crate::storage::{load_reminders, load_tasks};

#[derive(PartialEq)]
pub enum InputMode {
    Normal,
    Adding,
}

#[derive(PartialEq)]
pub enum ViewMode {
    Tasks,
    Calendar,
    Reminders,
}

/// State for the multi-step "Add Task" wizard.
#[derive(Default)]
pub struct AddState {
    pub title: String,
    pub start: String,
    pub step: usize, // 0: Title, 1: Start, 2: End
}

pub struct App {
    pub tasks: Vec<Task>,
    pub reminders: Vec<Reminder>,
    pub state: TableState,
    pub reminder_state: TableState,
    pub selected_day: NaiveDate,
    pub view_mode: ViewMode,
    pub input_mode: InputMode,
    pub input_buffer: String,
    pub add_state: AddState,
    /// Last error or confirmation, shown in the help bar.
    pub message: Option<String>,
}

impl App {
    /// Creates a new App instance and loads initial data.
    pub fn new() -> Result<App> {
        let mut app = App {
            tasks: Vec::new(),
            reminders: Vec::new(),
            state: TableState::default(),
            reminder_state: TableState::default(),
            selected_day: Local::now().date_naive(),
            view_mode: ViewMode::Tasks,
            input_mode: InputMode::Normal,
            input_buffer: String::new(),
            add_state: AddState::default(),
            message: None,
        };
        app.reload()?;
        Ok(app)
    }

    /// Re-reads tasks and reminders, replacing what is in memory.
    pub fn reload(&mut self) -> Result<()> {
        let mut tasks = load_tasks()?;
        tasks.sort_by_key(|t| (t.start().is_none(), t.start()));
        self.tasks = tasks;
        let mut reminders = load_reminders()?;
        reminders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        self.reminders = reminders;

        clamp_selection(&mut self.state, self.tasks.len());
        clamp_selection(&mut self.reminder_state, self.reminders.len());
        Ok(())
    }

    /// The calendar cell for the selected day.
    pub fn selected_cell(&self) -> CalendarDay<'_> {
        CalendarDay::build(self.selected_day, &self.tasks, &self.reminders)
    }

    /// Weeks of the month holding the selected day.
    pub fn visible_weeks(&self) -> Vec<[Option<NaiveDate>; 7]> {
        month_weeks(self.selected_day.year(), self.selected_day.month())
    }

    /// Selects the next row (or the next week in the calendar).
    pub fn next(&mut self) {
        match self.view_mode {
            ViewMode::Tasks => step(&mut self.state, self.tasks.len(), true),
            ViewMode::Reminders => step(&mut self.reminder_state, self.reminders.len(), true),
            ViewMode::Calendar => self.move_day(7),
        }
    }

    /// Selects the previous row (or the previous week in the calendar).
    pub fn previous(&mut self) {
        match self.view_mode {
            ViewMode::Tasks => step(&mut self.state, self.tasks.len(), false),
            ViewMode::Reminders => step(&mut self.reminder_state, self.reminders.len(), false),
            ViewMode::Calendar => self.move_day(-7),
        }
    }

    pub fn move_day(&mut self, days: i64) {
        self.selected_day += Duration::days(days);
    }

    pub fn next_month(&mut self) {
        if let Some(d) = self.selected_day.checked_add_months(Months::new(1)) {
            self.selected_day = d;
        }
    }

    pub fn previous_month(&mut self) {
        if let Some(d) = self.selected_day.checked_sub_months(Months::new(1)) {
            self.selected_day = d;
        }
    }

    pub fn toggle_view(&mut self) {
        self.view_mode = match self.view_mode {
            ViewMode::Tasks => ViewMode::Calendar,
            ViewMode::Calendar => ViewMode::Reminders,
            ViewMode::Reminders => ViewMode::Tasks,
        };
    }

    fn selected_task(&self) -> Option<&Task> {
        self.state.selected().and_then(|i| self.tasks.get(i))
    }

    /// Moves the selected task to its next status.
    pub fn cycle_status_selected(&mut self) {
        let Some((id, next)) = self
            .selected_task()
            .and_then(|t| t.id.clone().map(|id| (id, t.status.cycle())))
        else {
            return;
        };
        let result = cmd_status(&id, next, true);
        self.finish(result.map(|_| format!("Task {} is now {}.", id, next)));
    }

    /// Deletes the selected task.
    pub fn delete_selected(&mut self) {
        let Some(id) = self.selected_task().and_then(|t| t.id.clone()) else {
            return;
        };
        let result = cmd_remove(&id, true);
        self.finish(result.map(|_| format!("Task {} removed.", id)));
    }

    /// Marks the selected reminder as read.
    pub fn mark_selected_read(&mut self) {
        let Some(id) = self
            .reminder_state
            .selected()
            .and_then(|i| self.reminders.get(i))
            .map(|r| r.id.clone())
        else {
            return;
        };
        let result = cmd_mark_read(&id, true);
        self.finish(result.map(|_| format!("Reminder {} marked as read.", id)));
    }

    pub fn start_add(&mut self) {
        self.input_mode = InputMode::Adding;
        self.input_buffer.clear();
        self.add_state = AddState::default();
    }

    pub fn cancel_input(&mut self) {
        self.input_mode = InputMode::Normal;
        self.input_buffer.clear();
    }

    /// Handles Enter in the add wizard.
    pub fn handle_input(&mut self) {
        let input = self.input_buffer.trim().to_string();
        match self.add_state.step {
            0 => {
                if input.is_empty() { return; }
                self.add_state.title = input;
                self.add_state.step = 1;
                // Dates default to the day selected in the calendar.
                self.input_buffer = self.selected_day.to_string();
            }
            1 => {
                if input.is_empty() { return; }
                self.add_state.start = input;
                self.add_state.step = 2;
                // Keep the start date as the default end.
                self.input_buffer = self.add_state.start.clone();
            }
            _ => {
                let new = NewTask {
                    title: std::mem::take(&mut self.add_state.title),
                    start: std::mem::take(&mut self.add_state.start),
                    end: input,
                    ..Default::default()
                };
                let result = cmd_add(new, true);
                self.input_mode = InputMode::Normal;
                self.input_buffer.clear();
                self.add_state = AddState::default();
                self.finish(result.map(|id| format!("Task added (id = {}).", id)));
            }
        }
    }

    /// Records the outcome of a command and reloads on success.
    fn finish(&mut self, result: Result<String>) {
        let outcome = result.and_then(|msg| self.reload().map(|_| msg));
        self.message = Some(match outcome {
            Ok(msg) => msg,
            Err(e) => e.to_string(),
        });
    }
}

fn clamp_selection(state: &mut TableState, len: usize) {
    match state.selected() {
        _ if len == 0 => state.select(None),
        Some(i) if i >= len => state.select(Some(len - 1)),
        None => state.select(Some(0)),
        _ => {}
    }
}

fn step(state: &mut TableState, len: usize, forward: bool) {
    if len == 0 {
        return;
    }
    let i = match state.selected() {
        Some(i) if forward => if i >= len - 1 { 0 } else { i + 1 },
        Some(i) => if i == 0 { len - 1 } else { i - 1 },
        None => 0,
    };
    state.select(Some(i));
}
