//! Task routes - run the periodic passes on demand

pub mod api;

pub use api::{api_mark_overdue, api_send_reminders};
