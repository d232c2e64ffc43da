//! Downstream hand-offs: invoices for paid rows and payment reminders

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use super::error::{CoreError, CoreResult};

/// Invoice to raise once a schedule row is fully paid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceRequest {
    pub contract_id: String,
    pub row_id: String,
    pub tenant_id: String,
    pub customer: Option<String>,
    pub due_date: NaiveDate,
    pub posting_date: NaiveDate,
    pub amount: Decimal,
    pub description: String,
}

/// An invoice accepted by a sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub reference: String,
    pub request: InvoiceRequest,
}

/// Receives invoice requests; returns the created invoice's reference
pub trait InvoiceSink: Send + Sync {
    fn create_invoice(&self, request: &InvoiceRequest) -> CoreResult<String>;
}

/// Keeps invoices in memory
#[derive(Debug, Default)]
pub struct MemoryInvoiceSink {
    invoices: Mutex<Vec<Invoice>>,
}

impl MemoryInvoiceSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invoices created so far
    pub fn invoices(&self) -> Vec<Invoice> {
        self.invoices
            .lock()
            .map(|invoices| invoices.clone())
            .unwrap_or_default()
    }
}

impl InvoiceSink for MemoryInvoiceSink {
    fn create_invoice(&self, request: &InvoiceRequest) -> CoreResult<String> {
        let mut invoices = self.invoices.lock().map_err(|_| CoreError::IntegrationError {
            message: "invoice store is poisoned".to_string(),
        })?;

        let reference = rentledger_utils::series_name("SINV", invoices.len() as u64 + 1);
        invoices.push(Invoice {
            reference: reference.clone(),
            request: request.clone(),
        });
        log::info!(
            "Created invoice {} for row {} ({})",
            reference,
            request.row_id,
            request.amount
        );
        Ok(reference)
    }
}

/// A payment reminder for one schedule row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub contract_id: String,
    pub row_id: String,
    pub tenant_id: String,
    pub tenant_name: String,
    pub email: Option<String>,
    pub due_date: NaiveDate,
    pub outstanding: Decimal,
    pub days_overdue: i64,
    /// 1 for the first reminder of the row
    pub sequence: u32,
}

/// Delivers reminders
pub trait ReminderSink: Send + Sync {
    fn send_reminder(&self, reminder: &Reminder) -> CoreResult<()>;
}

/// Writes reminders to the log instead of sending them
#[derive(Debug, Default)]
pub struct LogReminderSink;

impl ReminderSink for LogReminderSink {
    fn send_reminder(&self, reminder: &Reminder) -> CoreResult<()> {
        log::info!(
            target: "rentledger::reminders",
            "Reminder #{} to {} <{}>: {} outstanding for row {} due {} ({} days overdue)",
            reminder.sequence,
            reminder.tenant_name,
            reminder.email.as_deref().unwrap_or("-"),
            reminder.outstanding,
            reminder.row_id,
            reminder.due_date,
            reminder.days_overdue
        );
        Ok(())
    }
}
