use chrono::{Datelike, Local};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
    Frame,
};

use crate::calendar::{display_color, tasks_on, DisplayColor};
use super::app::{App, InputMode, ViewMode};

pub fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // View
            Constraint::Length(3)  // Help
        ].as_ref())
        .split(f.area());

    match app.view_mode {
        ViewMode::Tasks => render_tasks(f, app, chunks[0]),
        ViewMode::Calendar => render_calendar(f, app, chunks[0]),
        ViewMode::Reminders => render_reminders(f, app, chunks[0]),
    }

    let help_text = match app.input_mode {
        InputMode::Normal => match app.view_mode {
            ViewMode::Tasks => "q: Quit | a: Add | Space: Next Status | d: Del | v: Calendar",
            ViewMode::Calendar => "q: Quit | h/l: Day | j/k: Week | n/p: Month | a: Add | v: Reminders",
            ViewMode::Reminders => "q: Quit | r: Mark Read | v: Tasks",
        },
        InputMode::Adding => "Enter: Next Step | Esc: Cancel",
    };
    let help_line = match &app.message {
        Some(msg) => format!("{}  ::  {}", help_text, msg),
        None => help_text.to_string(),
    };

    let help = Paragraph::new(help_line)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));

    f.render_widget(help, chunks[1]);

    // Render Input Box if needed
    if app.input_mode == InputMode::Adding {
        let area = centered_rect(60, 3, f.area()); // Fixed height of 3 (border + 1 line)
        f.render_widget(Clear, area); // Clear the area first

        let title = match app.add_state.step {
            0 => "Add Task: Enter Title",
            1 => "Add Task: Enter Start (YYYY-MM-DD [HH:MM:SS])",
            _ => "Add Task: Enter End (YYYY-MM-DD [HH:MM:SS])",
        };

        let input = Paragraph::new(app.input_buffer.as_str())
            .style(Style::default().fg(Color::Yellow))
            .block(Block::default().borders(Borders::ALL).title(title));

        f.render_widget(input, area);
    }
}

fn color_of(c: DisplayColor) -> Color {
    match c {
        DisplayColor::Done => Color::Green,
        DisplayColor::Active => Color::Blue,
        DisplayColor::Alert => Color::Red,
        DisplayColor::Warning => Color::Yellow,
        DisplayColor::Default => Color::White,
    }
}

fn render_tasks(f: &mut Frame, app: &mut App, area: Rect) {
    let rows: Vec<Row> = app
        .tasks
        .iter()
        .map(|t| {
            let style = Style::default().fg(color_of(display_color(t.status, t.priority)));
            Row::new(vec![
                Cell::from(t.id.as_ref().map(|id| id.to_string()).unwrap_or_default()),
                Cell::from(t.title.clone()),
                Cell::from(t.status.to_string()),
                Cell::from(t.priority.to_string()),
                Cell::from(t.start_time.clone()),
                Cell::from(t.end_time.clone()),
            ]).style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(6),
        Constraint::Min(20),
        Constraint::Length(12),
        Constraint::Length(8),
        Constraint::Length(20),
        Constraint::Length(20),
    ];

    let table = Table::new(rows, widths)
        .header(Row::new(vec!["ID", "Title", "Status", "Priority", "Start", "End"])
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .bottom_margin(1))
        .block(Block::default().borders(Borders::ALL).title("Taskdesk - Tasks"))
        .row_highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
        .highlight_symbol(">> ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_calendar(f: &mut Frame, app: &App, area: Rect) {
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)].as_ref())
        .split(area);

    let today = Local::now().date_naive();
    let mut rows: Vec<Row> = Vec::new();
    for week in app.visible_weeks() {
        let cells = week.iter().map(|slot| {
            let Some(d) = slot else { return Cell::from("") };
            let count = tasks_on(*d, &app.tasks).len();
            let label = if count > 0 { format!("{:>2} ({})", d.day(), count) } else { format!("{:>2}", d.day()) };
            let mut style = Style::default();
            if *d == today {
                style = style.fg(Color::Cyan).add_modifier(Modifier::BOLD);
            }
            if *d == app.selected_day {
                style = style.bg(Color::DarkGray).add_modifier(Modifier::BOLD);
            }
            Cell::from(label).style(style)
        });
        rows.push(Row::new(cells).height(2));
    }

    let grid = Table::new(rows, [Constraint::Ratio(1, 7); 7])
        .header(Row::new(vec!["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"])
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)))
        .block(Block::default().borders(Borders::ALL)
            .title(format!("Taskdesk - {}", app.selected_day.format("%B %Y"))));
    f.render_widget(grid, halves[0]);

    let cell = app.selected_cell();
    let mut lines: Vec<Line> = Vec::new();
    if cell.is_empty() {
        lines.push(Line::from("Nothing scheduled."));
    }
    for t in &cell.tasks {
        lines.push(Line::from(Span::styled(
            format!("{} [{}]", t.title, t.status),
            Style::default().fg(color_of(display_color(t.status, t.priority))),
        )));
        lines.push(Line::from(format!("   {} -> {}", t.start_time, t.end_time)));
    }
    if !cell.reminders.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("Reminders ({} unread)", cell.unread_reminders()),
            Style::default().add_modifier(Modifier::BOLD),
        )));
    }
    for r in &cell.reminders {
        let style = if r.is_read { Style::default().fg(Color::Gray) } else { Style::default().fg(Color::Yellow) };
        lines.push(Line::from(Span::styled(format!("- {}", r.message), style)));
    }

    let detail = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(cell.date.format("%a %Y-%m-%d").to_string()),
    );
    f.render_widget(detail, halves[1]);
}

fn render_reminders(f: &mut Frame, app: &mut App, area: Rect) {
    let rows: Vec<Row> = app
        .reminders
        .iter()
        .map(|r| {
            let task = r
                .task_id
                .as_ref()
                .and_then(|id| app.tasks.iter().find(|t| t.has_id(id)))
                .map(|t| t.title.clone())
                .unwrap_or_else(|| "-".into());
            let style = if r.is_read { Style::default().fg(Color::Gray) } else { Style::default().fg(Color::Yellow) };
            Row::new(vec![
                Cell::from(r.id.to_string()),
                Cell::from(r.message.clone()),
                Cell::from(task),
                Cell::from(r.created_at.clone()),
                Cell::from(if r.is_read { "read" } else { "unread" }),
            ]).style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(6),
        Constraint::Min(20),
        Constraint::Length(20),
        Constraint::Length(20),
        Constraint::Length(8),
    ];

    let table = Table::new(rows, widths)
        .header(Row::new(vec!["ID", "Message", "Task", "Created", "State"])
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .bottom_margin(1))
        .block(Block::default().borders(Borders::ALL).title("Taskdesk - Reminders"))
        .row_highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
        .highlight_symbol(">> ");

    f.render_stateful_widget(table, area, &mut app.reminder_state);
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(r.height.saturating_sub(height) / 2),
            Constraint::Length(height),
            Constraint::Length(r.height.saturating_sub(height) / 2),
        ].as_ref())
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ].as_ref())
        .split(popup_layout[1])[1]
}
