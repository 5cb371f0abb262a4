//! Endel — terminal task manager with due-date reminders and LAN sync.

pub mod app;
pub mod config;
pub mod menu;
pub mod notify;
pub mod sync;
pub mod timetable;
