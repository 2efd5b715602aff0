//! # Taskdesk
//!
//! A terminal task desk for personal and team tasks. Taskdesk keeps your tasks
//! and the reminders issued by your team's server in a local store, shows them
//! on a calendar, and summarises them in monthly statistics.
//!
//! ## Features
//!
//! *   **Calendar**: Month, week and day views of the tasks active on each day.
//!     A task spans every calendar day from its start to its end, both included.
//! *   **Reminders**: Server-issued reminders appear on the day they were
//!     created, next to the task they refer to.
//! *   **Statistics**: Monthly series and totals for your own tasks, or for a
//!     team statistics export (admins only).
//! *   **Dual Interface**: a scriptable CLI and an interactive TUI.
//!
//! ## Usage
//!
//! ```bash
//! # Interactive mode
//! taskdesk
//!
//! # Tasks
//! taskdesk add "Write report" --start 2025-06-01 --end 2025-06-05 --priority high
//! taskdesk list --status todo
//! taskdesk status 3 done
//!
//! # Calendar
//! taskdesk calendar 2025-06
//! taskdesk day 2025-06-03
//!
//! # Data from the server
//! taskdesk import export.json
//! taskdesk reminders --unread
//!
//! # Statistics
//! taskdesk stats --period all --year 2025
//! taskdesk login alice --token "$TOKEN" --role admin
//! taskdesk stats --input team-stats.json --metric new_users
//! ```
//!
//! ## Data Storage
//!
//! Data lives in your local data directory (`~/.local/share/taskdesk/` on
//! Linux). Override the tasks file with `TASKDESK_DB`; reminders, session and
//! `config.json` sit next to it.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Local;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};

use taskdesk::commands::*;
use taskdesk::config::Config;
use taskdesk::error::{DeskError, Result};
use taskdesk::logging;
use taskdesk::models::{parse_day, Priority, RecordId, TaskStatus};
use taskdesk::session::Role;
use taskdesk::stats::{MonthKey, Period};
use taskdesk::storage::{config_path, load_session};
use taskdesk::tui::run_tui;

#[derive(Parser)]
#[command(name = "taskdesk")]
#[command(about = "Terminal task desk with calendar and statistics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new task
    Add {
        /// Task title (quoted if it has spaces)
        title: String,
        /// Start, YYYY-MM-DD or "YYYY-MM-DD HH:MM:SS"
        #[arg(short, long)]
        start: String,
        /// End, same format; a bare date means the end of that day
        #[arg(short, long)]
        end: String,
        /// Longer description
        #[arg(short = 'D', long)]
        description: Option<String>,
        /// todo, in_progress or done
        #[arg(long, default_value = "todo")]
        status: TaskStatus,
        /// low, medium or high
        #[arg(short, long, default_value = "medium")]
        priority: Priority,
        /// Assigned user id
        #[arg(short, long)]
        assignee: Option<RecordId>,
        /// Owning team id
        #[arg(short, long)]
        team: Option<RecordId>,
    },
    /// List tasks ordered by start time
    List {
        #[arg(long)]
        status: Option<TaskStatus>,
        #[arg(short, long)]
        assignee: Option<RecordId>,
        #[arg(short, long)]
        team: Option<RecordId>,
        /// Only tasks active on this day (YYYY-MM-DD)
        #[arg(short, long)]
        day: Option<String>,
    },
    /// Edit a task
    Edit {
        id: RecordId,
        #[arg(long)]
        title: Option<String>,
        #[arg(short = 'D', long)]
        description: Option<String>,
        #[arg(long)]
        status: Option<TaskStatus>,
        #[arg(short, long)]
        priority: Option<Priority>,
        #[arg(short, long)]
        start: Option<String>,
        #[arg(short, long)]
        end: Option<String>,
        #[arg(short, long)]
        assignee: Option<RecordId>,
        #[arg(short, long)]
        team: Option<RecordId>,
    },
    /// Change the status of a task
    Status {
        id: RecordId,
        status: TaskStatus,
    },
    /// Remove a task
    Remove {
        id: RecordId,
    },
    /// Show the tasks and reminders of a day (default: today)
    Day {
        date: Option<String>,
    },
    /// Show a month calendar, YYYY-MM (default: this month)
    Calendar {
        month: Option<String>,
    },
    /// Show the week containing a day (default: today)
    Week {
        date: Option<String>,
    },
    /// List reminders
    Reminders {
        /// Only unread reminders
        #[arg(short, long)]
        unread: bool,
    },
    /// Mark a reminder as read
    Read {
        id: RecordId,
    },
    /// Replace local tasks and reminders with a server export
    Import {
        path: PathBuf,
    },
    /// Show statistics
    Stats {
        /// Team statistics export (requires an admin session)
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Metric to show
        #[arg(short, long)]
        metric: Option<String>,
        /// month, year or all
        #[arg(short, long, default_value = "all")]
        period: Period,
        /// Year summed by the `all` period
        #[arg(short, long)]
        year: Option<i32>,
    },
    /// Store a session token
    Login {
        username: String,
        #[arg(long)]
        token: String,
        /// admin or member
        #[arg(long, default_value = "member")]
        role: Role,
    },
    /// Forget the session
    Logout,
    /// Show the current session
    Whoami,
    /// Reset the database (delete all tasks, reminders and the session)
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell, elvish)
        shell: String,
    },
    /// Open interactive TUI
    Ui,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match Config::load(&config_path()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let tui = matches!(cli.command, Some(Commands::Ui) | None);
    if let Err(e) = logging::init(&config, tui) {
        eprintln!("Failed to set up logging: {}", e);
    }

    match run(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Option<Commands>, config: &Config) -> Result<()> {
    let today = Local::now().date_naive();
    match command {
        Some(Commands::Add { title, start, end, description, status, priority, assignee, team }) => {
            let new = NewTask { title, description, status, priority, start, end, assignee, team };
            cmd_add(new, false).map(|_| ())
        }
        Some(Commands::List { status, assignee, team, day }) => {
            let day = day.as_deref().map(parse_day).transpose()?;
            cmd_list(&ListFilter { status, assignee, team, day })
        }
        Some(Commands::Edit { id, title, description, status, priority, start, end, assignee, team }) => {
            let patch = TaskPatch { title, description, status, priority, start, end, assignee, team };
            cmd_edit(&id, patch, false)
        }
        Some(Commands::Status { id, status }) => cmd_status(&id, status, false),
        Some(Commands::Remove { id }) => cmd_remove(&id, false),
        Some(Commands::Day { date }) => cmd_day(date.as_deref().map(parse_day).transpose()?.unwrap_or(today)),
        Some(Commands::Calendar { month }) => {
            let key = match month {
                Some(m) => MonthKey::parse(&m).ok_or(DeskError::InvalidDate { date: m })?,
                None => MonthKey::from_date(today),
            };
            cmd_calendar(key.year, key.month)
        }
        Some(Commands::Week { date }) => cmd_week(date.as_deref().map(parse_day).transpose()?.unwrap_or(today)),
        Some(Commands::Reminders { unread }) => cmd_reminders(unread),
        Some(Commands::Read { id }) => cmd_mark_read(&id, false),
        Some(Commands::Import { path }) => cmd_import(&path, false).map(|_| ()),
        Some(Commands::Stats { input, metric, period, year }) => {
            let session = load_session()?;
            let req = StatsRequest { input, metric, period, year };
            cmd_stats(&req, config, &session, false).map(|_| ())
        }
        Some(Commands::Login { username, token, role }) => cmd_login(username, token, role, false).map(|_| ()),
        Some(Commands::Logout) => cmd_logout(false),
        Some(Commands::Whoami) => cmd_whoami(),
        Some(Commands::Reset { force }) => cmd_reset(force),
        Some(Commands::Completions { shell }) => {
            let shell_enum = match shell.as_str() {
                "bash" => Shell::Bash,
                "zsh" => Shell::Zsh,
                "fish" => Shell::Fish,
                "powershell" => Shell::PowerShell,
                "elvish" => Shell::Elvish,
                _ => return Err(DeskError::validation(format!("unsupported shell: {}", shell))),
            };
            let mut cmd = Cli::command();
            generate(shell_enum, &mut cmd, "taskdesk", &mut io::stdout());
            Ok(())
        }
        Some(Commands::Ui) | None => {
            if let Err(e) = run_tui() {
                eprintln!("Error running TUI: {}", e);
            }
            Ok(())
        }
    }
}
