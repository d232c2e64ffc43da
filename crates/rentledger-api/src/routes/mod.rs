//! Route modules for the API server
//!
//! - registry: properties, units and tenants
//! - contracts: contract lifecycle, schedule rows and manual payments
//! - payments: incoming payments, linking and cancellation
//! - tasks: overdue pass and reminders on demand
//! - reports: dashboard, overdue aging, linking, property performance
//! - errors: integration error log
//! - settings: configuration display
//!
//! Each module has a mod.rs with its exports and an api.rs with the JSON
//! handlers.

pub mod contracts;
pub mod errors;
pub mod payments;
pub mod registry;
pub mod reports;
pub mod settings;
pub mod tasks;

use chrono::NaiveDate;
use serde::Deserialize;

/// `?today=YYYY-MM-DD` override for date-dependent operations
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct AsOf {
    #[serde(default)]
    pub today: Option<NaiveDate>,
}

impl AsOf {
    pub fn date(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}
