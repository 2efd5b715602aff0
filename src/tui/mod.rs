pub mod app;
pub mod ui;

use std::{error::Error, io};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use tracing::error;
use app::{App, InputMode, ViewMode};
use ui::ui;

pub fn run_tui() -> Result<(), Box<dyn Error>> {
    // Load before touching the terminal so a bad data file is reported normally.
    let mut app = App::new()?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run loop
    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        error!(%err, "tui loop failed");
        println!("{:?}", err)
    }

    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        let Event::Key(key) = event::read()? else { continue };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match app.input_mode {
            InputMode::Normal => match key.code {
                KeyCode::Char('q') => return Ok(()),
                KeyCode::Char('v') => app.toggle_view(),
                KeyCode::Char('a') => app.start_add(),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::Left | KeyCode::Char('h') if app.view_mode == ViewMode::Calendar => app.move_day(-1),
                KeyCode::Right | KeyCode::Char('l') if app.view_mode == ViewMode::Calendar => app.move_day(1),
                KeyCode::Char('n') if app.view_mode == ViewMode::Calendar => app.next_month(),
                KeyCode::Char('p') if app.view_mode == ViewMode::Calendar => app.previous_month(),
                KeyCode::Char(' ') if app.view_mode == ViewMode::Tasks => app.cycle_status_selected(),
                KeyCode::Char('d') | KeyCode::Delete if app.view_mode == ViewMode::Tasks => app.delete_selected(),
                KeyCode::Char('r') if app.view_mode == ViewMode::Reminders => app.mark_selected_read(),
                _ => {}
            },
            InputMode::Adding => match key.code {
                KeyCode::Enter => app.handle_input(),
                KeyCode::Esc => app.cancel_input(),
                KeyCode::Char(c) => {
                    app.input_buffer.push(c);
                }
                KeyCode::Backspace => {
                    app.input_buffer.pop();
                }
                _ => {}
            }
        }
    }
}
