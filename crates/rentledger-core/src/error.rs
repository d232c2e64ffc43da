//! Error types for rentledger-core
//!
//! Every failure carries a stable error code, a severity, and the category the
//! caller uses to decide whether the operation was blocked (validation and
//! business-rule errors) or completed with a logged side-effect failure
//! (integration errors).

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// Error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Record not found
    NotFound,
    /// Validation error
    ValidationError,
    /// Start and end dates out of order
    InvalidDateRange,
    /// Contract shorter than the configured minimum
    DurationTooShort,
    /// Amount must be positive
    NonPositiveAmount,
    /// Duplicate entry
    DuplicateEntry,
    /// Contract periods overlap on the same unit
    PeriodOverlap,
    /// Payment larger than what is outstanding
    AmountExceedsOutstanding,
    /// Lifecycle transition not allowed
    InvalidTransition,
    /// Downstream record creation failed
    IntegrationError,
    /// IO error
    IoError,
    /// Invalid data format
    InvalidFormat,
    /// Internal error
    InternalError,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::NotFound => write!(f, "NOT_FOUND"),
            ErrorCode::ValidationError => write!(f, "VALIDATION_ERROR"),
            ErrorCode::InvalidDateRange => write!(f, "INVALID_DATE_RANGE"),
            ErrorCode::DurationTooShort => write!(f, "DURATION_TOO_SHORT"),
            ErrorCode::NonPositiveAmount => write!(f, "NON_POSITIVE_AMOUNT"),
            ErrorCode::DuplicateEntry => write!(f, "DUPLICATE_ENTRY"),
            ErrorCode::PeriodOverlap => write!(f, "PERIOD_OVERLAP"),
            ErrorCode::AmountExceedsOutstanding => write!(f, "AMOUNT_EXCEEDS_OUTSTANDING"),
            ErrorCode::InvalidTransition => write!(f, "INVALID_TRANSITION"),
            ErrorCode::IntegrationError => write!(f, "INTEGRATION_ERROR"),
            ErrorCode::IoError => write!(f, "IO_ERROR"),
            ErrorCode::InvalidFormat => write!(f, "INVALID_FORMAT"),
            ErrorCode::InternalError => write!(f, "INTERNAL_ERROR"),
        }
    }
}

/// Broad class of an error, used to decide how the caller reacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Bad input; the operation is blocked
    Validation,
    /// Input conflicts with existing records; the operation is blocked
    BusinessRule,
    /// A side effect failed after state was saved
    Integration,
    /// Anything else
    System,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Error code
    pub code: ErrorCode,
    /// Error category
    pub category: ErrorCategory,
    /// Error severity
    pub severity: ErrorSeverity,
    /// Human-readable message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Suggestions for resolution
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl ErrorDetails {
    /// Create a new error detail
    pub fn new(code: ErrorCode, category: ErrorCategory, message: String) -> Self {
        Self {
            code,
            category,
            severity: ErrorSeverity::for_category(category),
            message,
            details: None,
            suggestions: vec![],
        }
    }

    /// Override the severity derived from the category
    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self
    }

    /// Add detail information
    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.details = Some(detail);
        self
    }

    /// Add a suggestion
    pub fn with_suggestion(mut self, suggestion: String) -> Self {
        self.suggestions.push(suggestion);
        self
    }
}

impl std::fmt::Display for ErrorDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] ({}) {}", self.code, self.severity, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, "\nDetails: {}", details)?;
        }
        if !self.suggestions.is_empty() {
            write!(f, "\nSuggestions:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n  - {}", suggestion)?;
            }
        }
        Ok(())
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// Informational
    Info,
    /// Warning - operation was rejected but nothing is broken
    Warning,
    /// Error - operation failed
    Error,
    /// Critical - records may be inconsistent
    Critical,
}

impl ErrorSeverity {
    /// Default severity for errors of a category
    pub fn for_category(category: ErrorCategory) -> Self {
        match category {
            ErrorCategory::Validation | ErrorCategory::BusinessRule => ErrorSeverity::Warning,
            ErrorCategory::Integration | ErrorCategory::System => ErrorSeverity::Error,
        }
    }
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "info"),
            ErrorSeverity::Warning => write!(f, "warning"),
            ErrorSeverity::Error => write!(f, "error"),
            ErrorSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// Main error type for rentledger-core
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: String, id: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("End date {end} must be after start date {start}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("Contract lasts {days} days, minimum is {min_days}")]
    DurationTooShort { days: i64, min_days: i64 },

    #[error("{field} must be greater than 0")]
    NonPositiveAmount { field: String },

    #[error("Duplicate entry: {entry}")]
    DuplicateEntry { entry: String },

    #[error("Unit {unit} is not available for the selected period (overlaps {conflicting})")]
    PeriodOverlap { unit: String, conflicting: String },

    #[error("Payment amount {amount} exceeds outstanding amount {outstanding} for row due on {due_date}")]
    AmountExceedsOutstanding {
        amount: Decimal,
        outstanding: Decimal,
        due_date: NaiveDate,
    },

    #[error("Cannot {action} a record in status {status}")]
    InvalidTransition { action: String, status: String },

    #[error("Integration error: {message}")]
    IntegrationError { message: String },

    #[error("IO error occurred")]
    IoError,

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    #[error("Internal error: {message}")]
    InternalError { message: String },
}

impl CoreError {
    /// Shorthand for a missing record
    pub fn not_found(kind: &str, id: &str) -> Self {
        CoreError::NotFound {
            kind: kind.to_string(),
            id: id.to_string(),
        }
    }

    /// Shorthand for a validation failure
    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::ValidationError {
            message: message.into(),
        }
    }

    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            CoreError::NotFound { .. } => ErrorCode::NotFound,
            CoreError::ValidationError { .. } => ErrorCode::ValidationError,
            CoreError::InvalidDateRange { .. } => ErrorCode::InvalidDateRange,
            CoreError::DurationTooShort { .. } => ErrorCode::DurationTooShort,
            CoreError::NonPositiveAmount { .. } => ErrorCode::NonPositiveAmount,
            CoreError::DuplicateEntry { .. } => ErrorCode::DuplicateEntry,
            CoreError::PeriodOverlap { .. } => ErrorCode::PeriodOverlap,
            CoreError::AmountExceedsOutstanding { .. } => ErrorCode::AmountExceedsOutstanding,
            CoreError::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            CoreError::IntegrationError { .. } => ErrorCode::IntegrationError,
            CoreError::IoError => ErrorCode::IoError,
            CoreError::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            CoreError::InternalError { .. } => ErrorCode::InternalError,
        }
    }

    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            CoreError::NotFound { .. }
            | CoreError::ValidationError { .. }
            | CoreError::InvalidDateRange { .. }
            | CoreError::DurationTooShort { .. }
            | CoreError::NonPositiveAmount { .. }
            | CoreError::DuplicateEntry { .. }
            | CoreError::InvalidFormat { .. } => ErrorCategory::Validation,
            CoreError::PeriodOverlap { .. }
            | CoreError::AmountExceedsOutstanding { .. }
            | CoreError::InvalidTransition { .. } => ErrorCategory::BusinessRule,
            CoreError::IntegrationError { .. } => ErrorCategory::Integration,
            CoreError::IoError | CoreError::InternalError { .. } => ErrorCategory::System,
        }
    }

    /// Get the severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Validation => match self {
                CoreError::NotFound { .. } => ErrorSeverity::Info,
                CoreError::InvalidFormat { .. } => ErrorSeverity::Error,
                _ => ErrorSeverity::Warning,
            },
            ErrorCategory::BusinessRule => ErrorSeverity::Warning,
            ErrorCategory::Integration => ErrorSeverity::Error,
            ErrorCategory::System => match self {
                CoreError::InternalError { .. } => ErrorSeverity::Critical,
                _ => ErrorSeverity::Error,
            },
        }
    }

    /// Convert to detailed error info
    pub fn to_details(&self) -> ErrorDetails {
        let mut details = ErrorDetails::new(self.code(), self.category(), self.to_string())
            .with_severity(self.severity());

        match self {
            CoreError::NotFound { kind, id } => {
                details = details
                    .with_detail(serde_json::json!({ "kind": kind, "id": id }))
                    .with_suggestion(format!("Check that {} '{}' has been created.", kind, id));
            }
            CoreError::InvalidDateRange { start, end } => {
                details = details
                    .with_detail(serde_json::json!({ "start_date": start, "end_date": end }))
                    .with_suggestion("Choose an end date after the start date.".to_string());
            }
            CoreError::DurationTooShort { days, min_days } => {
                details = details
                    .with_detail(serde_json::json!({ "days": days, "min_days": min_days }))
                    .with_suggestion(format!("Contracts must run for at least {} days.", min_days));
            }
            CoreError::PeriodOverlap { unit, conflicting } => {
                details = details
                    .with_detail(serde_json::json!({ "unit": unit, "conflicting_contract": conflicting }))
                    .with_suggestion(
                        "Cancel the conflicting contract or change the contract dates.".to_string(),
                    );
            }
            CoreError::AmountExceedsOutstanding {
                amount,
                outstanding,
                due_date,
            } => {
                details = details
                    .with_detail(serde_json::json!({
                        "amount": amount,
                        "outstanding": outstanding,
                        "due_date": due_date,
                    }))
                    .with_suggestion(
                        "Split the payment across rows or record it as an explicit overpayment."
                            .to_string(),
                    );
            }
            CoreError::ValidationError { message } => {
                details = details.with_detail(serde_json::json!({ "validation_message": message }));
            }
            CoreError::IntegrationError { .. } => {
                details = details.with_suggestion(
                    "The record was saved; retry the operation once the downstream system is available."
                        .to_string(),
                );
            }
            _ => {}
        }

        details
    }
}

/// Result type with CoreError
pub type CoreResult<T> = Result<T, CoreError>;

impl From<io::Error> for CoreError {
    fn from(_error: io::Error) -> Self {
        CoreError::IoError
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(error: serde_json::Error) -> Self {
        CoreError::InvalidFormat {
            message: error.to_string(),
        }
    }
}

/// Error context for reporting
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Operation being performed
    pub operation: String,
    /// Record the operation acted on
    pub record: Option<String>,
    /// Additional context data
    pub data: serde_json::Value,
}

impl ErrorContext {
    /// Create a new error context
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            record: None,
            data: serde_json::json!({}),
        }
    }

    /// Name the record involved
    pub fn with_record(mut self, record: &str) -> Self {
        self.record = Some(record.to_string());
        self
    }

    /// Add context data
    pub fn with_data(mut self, key: &str, value: serde_json::Value) -> Self {
        self.data[key] = value;
        self
    }
}

/// Error logger trait
pub trait ErrorLogger: Send + Sync {
    /// Log an error
    fn log_error(&self, error: &CoreError, context: &ErrorContext);
    /// Log a warning
    fn log_warning(&self, message: &str, context: &ErrorContext);
}

/// Default error logger using log crate
#[derive(Default)]
pub struct DefaultErrorLogger;

impl ErrorLogger for DefaultErrorLogger {
    fn log_error(&self, error: &CoreError, context: &ErrorContext) {
        log::error!(
            target: "rentledger::error",
            "ERROR [{}] ({}) {} - Operation: {} - Record: {:?} - Data: {}",
            error.code(),
            error.severity(),
            error,
            context.operation,
            context.record,
            context.data
        );
    }

    fn log_warning(&self, message: &str, context: &ErrorContext) {
        log::warn!(
            target: "rentledger::error",
            "WARNING: {} - Operation: {} - Record: {:?}",
            message,
            context.operation,
            context.record
        );
    }
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::NotFound.to_string(), "NOT_FOUND");
        assert_eq!(ErrorCode::PeriodOverlap.to_string(), "PERIOD_OVERLAP");
        assert_eq!(
            ErrorCode::AmountExceedsOutstanding.to_string(),
            "AMOUNT_EXCEEDS_OUTSTANDING"
        );
    }

    #[test]
    fn test_error_categories() {
        let start = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert_eq!(
            CoreError::InvalidDateRange { start, end }.category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            CoreError::PeriodOverlap {
                unit: "U-1".to_string(),
                conflicting: "RC-00001".to_string()
            }
            .category(),
            ErrorCategory::BusinessRule
        );
        assert_eq!(
            CoreError::IntegrationError {
                message: "invoice".to_string()
            }
            .category(),
            ErrorCategory::Integration
        );
    }

    #[test]
    fn test_core_error_severity() {
        assert_eq!(
            CoreError::not_found("Contract", "RC-1").severity(),
            ErrorSeverity::Info
        );
        assert_eq!(
            CoreError::InternalError {
                message: "x".to_string()
            }
            .severity(),
            ErrorSeverity::Critical
        );
        assert_eq!(CoreError::IoError.severity(), ErrorSeverity::Error);
    }

    #[test]
    fn test_details_carry_severity() {
        let details = CoreError::not_found("Contract", "RC-1").to_details();
        assert_eq!(details.severity, ErrorSeverity::Info);
        assert!(details.to_string().starts_with("[NOT_FOUND] (info)"));

        let json = serde_json::to_value(
            CoreError::IntegrationError {
                message: "invoice service down".to_string(),
            }
            .to_details(),
        )
        .unwrap();
        assert_eq!(json["severity"], "error");

        let plain = ErrorDetails::new(
            ErrorCode::InvalidFormat,
            ErrorCategory::Validation,
            "bad date".to_string(),
        );
        assert_eq!(plain.severity, ErrorSeverity::Warning);
    }

    #[test]
    fn test_error_details_amount_exceeds() {
        let error = CoreError::AmountExceedsOutstanding {
            amount: Decimal::new(1200, 0),
            outstanding: Decimal::new(1000, 0),
            due_date: NaiveDate::from_ymd_opt(2025, 3, 5).unwrap(),
        };
        let details = error.to_details();

        assert_eq!(details.code, ErrorCode::AmountExceedsOutstanding);
        assert_eq!(details.category, ErrorCategory::BusinessRule);
        assert!(details.details.is_some());
        assert!(!details.suggestions.is_empty());
        assert!(details.message.contains("2025-03-05"));
    }

    #[test]
    fn test_error_context() {
        let context = ErrorContext::new("receive_payment")
            .with_record("PAY-00001")
            .with_data("amount", serde_json::json!("1000"));

        assert_eq!(context.operation, "receive_payment");
        assert_eq!(context.record.as_deref(), Some("PAY-00001"));
        assert_eq!(context.data["amount"], "1000");
    }

    #[test]
    fn test_from_json_error() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let core: CoreError = err.into();
        assert_eq!(core.code(), ErrorCode::InvalidFormat);
    }
}
