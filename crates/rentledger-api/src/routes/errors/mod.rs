//! Error log routes

pub mod api;

pub use api::{api_error_logs, api_resolve_error};
