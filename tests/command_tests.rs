use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::json;
use taskdesk::commands::*;
use taskdesk::config::Config;
use taskdesk::error::DeskError;
use taskdesk::models::{Priority, RecordId, TaskStatus};
use taskdesk::session::{Role, Session};
use taskdesk::stats::{Period, TASKS_DONE, TASKS_STARTED};
use taskdesk::storage::{load_reminders, load_session, load_tasks, next_task_id};
use tempfile::TempDir;

// Use a mutex to ensure tests run serially since they modify the environment variable
static TEST_MUTEX: Mutex<()> = Mutex::new(());

fn with_test_db<F>(f: F)
where
    F: FnOnce(&Path),
{
    let _guard = TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    env::set_var("TASKDESK_DB", dir.path().join("tasks.json"));

    f(dir.path());

    env::remove_var("TASKDESK_DB");
}

fn new_task(title: &str, start: &str, end: &str) -> NewTask {
    NewTask {
        title: title.into(),
        start: start.into(),
        end: end.into(),
        ..Default::default()
    }
}

fn write_json(dir: &Path, name: &str, value: serde_json::Value) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, value.to_string()).unwrap();
    path
}

fn config(year: i32) -> Config {
    Config {
        stats_year: year,
        ..Default::default()
    }
}

#[test]
fn test_add_and_list() {
    with_test_db(|_| {
        let id = cmd_add(new_task("Write report", "2025-06-01", "2025-06-05"), true).unwrap();
        assert_eq!(id, RecordId::Num(1));

        let tasks = load_tasks().unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Write report");
        assert_eq!(tasks[0].start_time, "2025-06-01 00:00:00");
        assert_eq!(tasks[0].end_time, "2025-06-05 23:59:59");
        assert_eq!(tasks[0].status, TaskStatus::Todo);

        let second = cmd_add(new_task("Review", "2025-06-02 09:00:00", "2025-06-02 10:00:00"), true).unwrap();
        assert_eq!(second, RecordId::Num(2));
        assert!(cmd_list(&ListFilter::default()).is_ok());
    });
}

#[test]
fn test_add_same_day_date_only() {
    with_test_db(|_| {
        assert!(cmd_add(new_task("Standup", "2025-06-01", "2025-06-01"), true).is_ok());
    });
}

#[test]
fn test_add_rejects_end_not_after_start() {
    with_test_db(|_| {
        let err = cmd_add(new_task("Backwards", "2025-06-05 10:00:00", "2025-06-01 10:00:00"), true).unwrap_err();
        assert!(matches!(err, DeskError::Validation { .. }));

        let err = cmd_add(new_task("Zero", "2025-06-05 10:00:00", "2025-06-05 10:00:00"), true).unwrap_err();
        assert!(matches!(err, DeskError::Validation { .. }));

        let err = cmd_add(new_task("Garbage", "someday", "2025-06-05"), true).unwrap_err();
        assert!(matches!(err, DeskError::InvalidDate { .. }));

        assert!(load_tasks().unwrap().is_empty());
    });
}

#[test]
fn test_edit_task() {
    with_test_db(|_| {
        let id = cmd_add(new_task("Draft", "2025-06-01", "2025-06-05"), true).unwrap();

        let patch = TaskPatch {
            title: Some("Final draft".into()),
            priority: Some(Priority::High),
            team: Some("t-1".parse().unwrap()),
            ..Default::default()
        };
        cmd_edit(&id, patch, true).unwrap();

        let t = &load_tasks().unwrap()[0];
        assert_eq!(t.title, "Final draft");
        assert_eq!(t.priority, Priority::High);
        assert_eq!(t.team_id, Some(RecordId::Text("t-1".into())));
        assert_eq!(t.end_time, "2025-06-05 23:59:59");
    });
}

#[test]
fn test_edit_keeps_task_when_result_is_invalid() {
    with_test_db(|_| {
        let id = cmd_add(new_task("Draft", "2025-06-03", "2025-06-05"), true).unwrap();
        let patch = TaskPatch {
            end: Some("2025-06-01 12:00:00".into()),
            ..Default::default()
        };
        assert!(cmd_edit(&id, patch, true).is_err());
        assert_eq!(load_tasks().unwrap()[0].end_time, "2025-06-05 23:59:59");
    });
}

#[test]
fn test_status_and_remove() {
    with_test_db(|_| {
        let id = cmd_add(new_task("Ship", "2025-06-01", "2025-06-02"), true).unwrap();
        cmd_status(&id, TaskStatus::Done, true).unwrap();
        assert_eq!(load_tasks().unwrap()[0].status, TaskStatus::Done);

        // Ids match whether typed as number or text.
        cmd_remove(&"1".parse().unwrap(), true).unwrap();
        assert!(load_tasks().unwrap().is_empty());

        let err = cmd_remove(&RecordId::Num(1), true).unwrap_err();
        assert!(matches!(err, DeskError::TaskNotFound { .. }));
        assert_eq!(err.to_string(), "Task 1 not found.");
        assert!(cmd_status(&RecordId::Num(9), TaskStatus::Todo, true).is_err());
    });
}

#[test]
fn test_filter_tasks() {
    with_test_db(|_| {
        cmd_add(new_task("Later", "2025-06-10", "2025-06-12"), true).unwrap();
        cmd_add(
            NewTask {
                team: Some(RecordId::Num(3)),
                ..new_task("Team work", "2025-06-01", "2025-06-05")
            },
            true,
        )
        .unwrap();
        let tasks = load_tasks().unwrap();

        let titles = |f: &ListFilter| -> Vec<String> {
            filter_tasks(&tasks, f).iter().map(|t| t.title.clone()).collect()
        };
        assert_eq!(titles(&ListFilter::default()), vec!["Team work", "Later"]);
        assert_eq!(
            titles(&ListFilter { team: Some(RecordId::Num(3)), ..Default::default() }),
            vec!["Team work"]
        );
        let day = chrono::NaiveDate::from_ymd_opt(2025, 6, 11);
        assert_eq!(titles(&ListFilter { day, ..Default::default() }), vec!["Later"]);
        assert!(titles(&ListFilter { status: Some(TaskStatus::Done), ..Default::default() }).is_empty());
    });
}

#[test]
fn test_import_replaces_local_data() {
    with_test_db(|dir| {
        cmd_add(new_task("Local only", "2025-06-01", "2025-06-02"), true).unwrap();

        let export = write_json(
            dir,
            "export.json",
            json!({
                "tasks": [
                    {"id": "7", "title": "From server", "status": "in_progress",
                     "start_time": "2025-06-01 09:00:00", "end_time": "2025-06-03 18:00:00"},
                    {"id": "a9", "title": "Odd id", "start_time": "bad", "end_time": "bad"}
                ],
                "reminders": [
                    {"id": 1, "mes": "Due soon", "task_id": 7, "is_read": 0,
                     "created_at": "2025-06-02 08:00:00", "type": "task"}
                ]
            }),
        );
        assert_eq!(cmd_import(&export, true).unwrap(), (2, 1));

        let tasks = load_tasks().unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].title, "From server");
        assert_eq!(next_task_id(&tasks), RecordId::Num(8));

        cmd_mark_read(&RecordId::Num(1), true).unwrap();
        assert!(load_reminders().unwrap()[0].is_read);
        let err = cmd_mark_read(&RecordId::Num(2), true).unwrap_err();
        assert!(matches!(err, DeskError::ReminderNotFound { .. }));
    });
}

#[test]
fn test_local_stats() {
    with_test_db(|_| {
        cmd_add(new_task("Jan", "2025-01-10", "2025-01-12"), true).unwrap();
        let id = cmd_add(new_task("Feb", "2025-02-01", "2025-03-01"), true).unwrap();
        cmd_add(new_task("Old", "2024-12-30", "2025-01-02"), true).unwrap();
        cmd_status(&id, TaskStatus::Done, true).unwrap();

        let session = Session::default();
        let req = StatsRequest {
            period: Period::All,
            ..Default::default()
        };
        assert_eq!(cmd_stats(&req, &config(2025), &session, true).unwrap(), 2.0);
        assert_eq!(cmd_stats(&req, &config(2024), &session, true).unwrap(), 1.0);

        let done = StatsRequest {
            metric: Some(TASKS_DONE.into()),
            year: Some(2025),
            ..req
        };
        assert_eq!(cmd_stats(&done, &config(2000), &session, true).unwrap(), 1.0);
    });
}

#[test]
fn test_local_payload_periods() {
    let tasks = vec![];
    let today = chrono::NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
    let payload = local_payload(&tasks, today, 2025, Period::Month);
    assert_eq!(payload.totals[TASKS_STARTED], json!(0.0));
    assert!(payload.series.is_empty());
}

#[test]
fn test_team_stats_require_admin() {
    with_test_db(|dir| {
        let input = write_json(
            dir,
            "stats.json",
            json!({
                "totals": {"new_users": 40},
                "series": [
                    {"month": "2025-01", "new_users": 5},
                    {"month": "2025-02", "new_users": "3"},
                    {"month": "2024-12", "new_users": 100}
                ]
            }),
        );
        let req = StatsRequest {
            input: Some(input),
            metric: Some("new_users".into()),
            period: Period::All,
            year: Some(2025),
        };

        let member = Session::login("bob", "tok", Role::Member);
        let err = cmd_stats(&req, &config(2025), &member, true).unwrap_err();
        assert!(matches!(err, DeskError::PermissionDenied { .. }));
        assert!(cmd_stats(&req, &config(2025), &Session::default(), true).is_err());

        let admin = Session::login("alice", "tok", Role::Admin);
        assert_eq!(cmd_stats(&req, &config(2025), &admin, true).unwrap(), 8.0);

        let monthly = StatsRequest { period: Period::Month, ..req };
        assert_eq!(cmd_stats(&monthly, &config(2025), &admin, true).unwrap(), 40.0);
    });
}

#[test]
fn test_login_logout() {
    with_test_db(|_| {
        assert!(!load_session().unwrap().is_authenticated());

        let session = cmd_login("alice".into(), "secret".into(), Role::Admin, true).unwrap();
        assert!(session.is_admin());

        let stored = load_session().unwrap();
        assert_eq!(stored.username.as_deref(), Some("alice"));
        assert!(stored.is_admin());

        cmd_logout(true).unwrap();
        assert!(!load_session().unwrap().is_authenticated());

        assert!(cmd_login("".into(), "x".into(), Role::Member, true).is_err());
    });
}

#[test]
fn test_calendar_views() {
    with_test_db(|dir| {
        let export = write_json(
            dir,
            "export.json",
            json!({
                "tasks": [
                    {"id": 1, "title": "Spans", "start_time": "2025-06-01 00:00:00", "end_time": "2025-06-05 23:59:59"},
                    {"id": 2, "title": "Short", "start_time": "2025-06-30 09:00:00", "end_time": "2025-06-30 10:00:00"}
                ],
                "reminders": [
                    {"id": 1, "mes": "Check in", "task_id": 1, "created_at": "2025-06-03 08:00:00"}
                ]
            }),
        );
        cmd_import(&export, true).unwrap();

        let day = |d| chrono::NaiveDate::from_ymd_opt(2025, 6, d).unwrap();
        assert!(cmd_day(day(3)).is_ok());
        assert!(cmd_day(day(20)).is_ok());
        assert!(cmd_week(day(30)).is_ok());
        assert!(cmd_calendar(2025, 6).is_ok());
        assert!(cmd_calendar(2025, 2).is_ok());

        // Reminder listing does not depend on which tasks are loaded.
        assert!(cmd_reminders(false).is_ok());
        assert!(cmd_reminders(true).is_ok());

        let err = cmd_calendar(2025, 13).unwrap_err();
        assert!(matches!(err, DeskError::InvalidDate { .. }));
    });
}

#[test]
fn test_import_tolerates_null_timestamps() {
    with_test_db(|dir| {
        let export = write_json(
            dir,
            "export.json",
            json!({
                "tasks": [
                    {"id": 1, "title": "Good", "start_time": "2025-06-01 09:00:00", "end_time": "2025-06-02 09:00:00"},
                    {"id": 2, "title": "No end", "start_time": "2025-06-01 09:00:00", "end_time": null}
                ],
                "reminders": [
                    {"id": 1, "mes": "Ping", "task_id": 2, "is_read": null, "created_at": null}
                ]
            }),
        );
        assert_eq!(cmd_import(&export, true).unwrap(), (2, 1));

        let tasks = load_tasks().unwrap();
        assert_eq!(tasks.len(), 2);
        let start = chrono::NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        for day in start.iter_days().take(92) {
            let on_day = filter_tasks(&tasks, &ListFilter { day: Some(day), ..Default::default() });
            assert!(on_day.iter().all(|t| t.title != "No end"), "{day}");
        }
        assert!(!load_reminders().unwrap()[0].is_read);
        assert!(cmd_day(chrono::NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()).is_ok());
    });
}
