//! # Taskdesk
//!
//! A terminal task desk for personal and team tasks: calendar views of what is
//! active each day, server reminders, and monthly statistics.
//!
//! The two pieces with actual logic are [`calendar`] (which tasks and
//! reminders belong to a calendar day) and [`stats`] (turning a monthly series
//! into totals and chart points). Both are pure functions over in-memory data.

pub mod calendar;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod session;
pub mod stats;
pub mod storage;
pub mod tui;

pub use error::{DeskError, Result};
