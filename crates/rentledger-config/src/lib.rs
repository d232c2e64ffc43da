//! Configuration management for rentledger
//!
//! This module handles loading, validation, and management of
//! rentledger configuration from YAML files.

pub mod error;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use error::ConfigError;

// ==================== Configuration Types ====================

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,
    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
    /// URL prefix for the JSON API
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            api_prefix: default_api_prefix(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8081
}

fn default_api_prefix() -> String {
    "/api".to_string()
}

/// Data configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DataConfig {
    /// JSON snapshot of records to load at startup
    #[serde(default)]
    pub snapshot: Option<PathBuf>,
}

/// Rent schedule generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Shortest contract accepted, in days
    #[serde(default = "default_min_duration_days")]
    pub min_duration_days: i64,
    /// Highest day of month a due date may fall on
    #[serde(default = "default_due_day_cap")]
    pub due_day_cap: u32,
    /// Grace period applied when a contract does not set one
    #[serde(default = "default_grace_period_days")]
    pub default_grace_period_days: u32,
    /// Longest grace period a contract may carry
    #[serde(default = "default_max_grace_period_days")]
    pub max_grace_period_days: u32,
    /// Average weeks per month used to derive weekly rent
    #[serde(default = "default_weekly_periods")]
    pub weekly_periods_per_month: Decimal,
    /// Average fortnights per month used to derive bi-weekly rent
    #[serde(default = "default_biweekly_periods")]
    pub biweekly_periods_per_month: Decimal,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            min_duration_days: default_min_duration_days(),
            due_day_cap: default_due_day_cap(),
            default_grace_period_days: default_grace_period_days(),
            max_grace_period_days: default_max_grace_period_days(),
            weekly_periods_per_month: default_weekly_periods(),
            biweekly_periods_per_month: default_biweekly_periods(),
        }
    }
}

fn default_min_duration_days() -> i64 {
    7
}

fn default_due_day_cap() -> u32 {
    28
}

fn default_grace_period_days() -> u32 {
    5
}

fn default_max_grace_period_days() -> u32 {
    365
}

fn default_weekly_periods() -> Decimal {
    Decimal::new(433, 2)
}

fn default_biweekly_periods() -> Decimal {
    Decimal::new(217, 2)
}

/// Payment matching settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Rounding slack allowed when a payment exceeds the outstanding amount
    #[serde(default = "default_amount_tolerance")]
    pub amount_tolerance: Decimal,
    /// Maximum distance between payment date and due date, in days
    #[serde(default = "default_date_window_days")]
    pub date_window_days: i64,
    /// Relative amount deviation accepted without a memo keyword (0.05 = 5%)
    #[serde(default = "default_amount_match_ratio")]
    pub amount_match_ratio: Decimal,
    /// Memo words that mark a payment as rent
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            amount_tolerance: default_amount_tolerance(),
            date_window_days: default_date_window_days(),
            amount_match_ratio: default_amount_match_ratio(),
            keywords: default_keywords(),
        }
    }
}

fn default_amount_tolerance() -> Decimal {
    Decimal::new(1, 2)
}

fn default_date_window_days() -> i64 {
    30
}

fn default_amount_match_ratio() -> Decimal {
    Decimal::new(5, 2)
}

fn default_keywords() -> Vec<String> {
    vec!["rent".to_string(), "rental".to_string(), "property".to_string()]
}

/// Incoming payment validation thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Slack before a payment above total outstanding is reported
    #[serde(default = "default_overpayment_tolerance")]
    pub overpayment_tolerance: Decimal,
    /// Look-back window for similar payments, in days
    #[serde(default = "default_duplicate_window_days")]
    pub duplicate_window_days: i64,
    /// Amount difference under which two payments count as similar
    #[serde(default = "default_duplicate_amount_tolerance")]
    pub duplicate_amount_tolerance: Decimal,
    /// Distance to the closest due date that triggers a warning, in days
    #[serde(default = "default_due_date_distance_days")]
    pub due_date_distance_days: i64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            overpayment_tolerance: default_overpayment_tolerance(),
            duplicate_window_days: default_duplicate_window_days(),
            duplicate_amount_tolerance: default_duplicate_amount_tolerance(),
            due_date_distance_days: default_due_date_distance_days(),
        }
    }
}

fn default_overpayment_tolerance() -> Decimal {
    Decimal::ONE
}

fn default_duplicate_window_days() -> i64 {
    30
}

fn default_duplicate_amount_tolerance() -> Decimal {
    Decimal::ONE
}

fn default_due_date_distance_days() -> i64 {
    60
}

/// Payment reminder settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderConfig {
    /// Send reminders from the periodic task
    #[serde(default = "default_true")]
    pub enable: bool,
    /// Minimum days between two reminders for the same row
    #[serde(default = "default_reminder_interval")]
    pub interval_days: i64,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            enable: true,
            interval_days: default_reminder_interval(),
        }
    }
}

fn default_reminder_interval() -> i64 {
    7
}

/// Periodic task settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Run the overdue pass and reminders periodically
    #[serde(default = "default_true")]
    pub enable: bool,
    /// Seconds between runs
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enable: true,
            interval_secs: default_interval_secs(),
        }
    }
}

fn default_interval_secs() -> u64 {
    86_400
}

fn default_true() -> bool {
    true
}

/// Report settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReportsConfig {
    /// Period used when a report request names none
    #[serde(default)]
    pub default_range: TimeRange,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Time range enumeration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    /// Current month
    Month,
    /// Current quarter
    Quarter,
    /// Current year
    Year,
    /// All time
    All,
    /// Custom range
    Custom,
}

impl Default for TimeRange {
    fn default() -> Self {
        TimeRange::Month
    }
}

impl std::str::FromStr for TimeRange {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "month" => Ok(TimeRange::Month),
            "quarter" => Ok(TimeRange::Quarter),
            "year" => Ok(TimeRange::Year),
            "all" => Ok(TimeRange::All),
            "custom" => Ok(TimeRange::Custom),
            _ => Err(format!("Invalid time range: {}", s)),
        }
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeRange::Month => write!(f, "month"),
            TimeRange::Quarter => write!(f, "quarter"),
            TimeRange::Year => write!(f, "year"),
            TimeRange::All => write!(f, "all"),
            TimeRange::Custom => write!(f, "custom"),
        }
    }
}

/// Currency and number formatting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyConfig {
    /// Default currency
    #[serde(default = "default_currency")]
    pub default_currency: String,
    /// Number of decimal places amounts are rounded to
    #[serde(default = "default_decimal_places")]
    pub decimal_places: u32,
    /// Thousands separator
    #[serde(default = "default_thousands_sep")]
    pub thousands_separator: String,
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            default_currency: default_currency(),
            decimal_places: default_decimal_places(),
            thousands_separator: default_thousands_sep(),
        }
    }
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_decimal_places() -> u32 {
    2
}

fn default_thousands_sep() -> String {
    ",".to_string()
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Data settings
    #[serde(default)]
    pub data: DataConfig,
    /// Schedule generation settings
    #[serde(default)]
    pub schedule: ScheduleConfig,
    /// Payment matching settings
    #[serde(default)]
    pub matching: MatchingConfig,
    /// Payment validation settings
    #[serde(default)]
    pub validation: ValidationConfig,
    /// Reminder settings
    #[serde(default)]
    pub reminders: ReminderConfig,
    /// Periodic task settings
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Report settings
    #[serde(default)]
    pub reports: ReportsConfig,
    /// Currency settings
    #[serde(default)]
    pub currency: CurrencyConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load(path: PathBuf) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_string_lossy().to_string(),
            });
        }

        let content = std::fs::read_to_string(&path).map_err(|_| ConfigError::IoError)?;
        let config = Self::from_yaml(&content)?;

        Ok(config)
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content).map_err(|_| ConfigError::InvalidYaml)?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(invalid("server.port", "Port must be greater than 0"));
        }

        if !self.server.api_prefix.starts_with('/') {
            return Err(invalid("server.api_prefix", "API prefix must start with '/'"));
        }

        if self.schedule.min_duration_days < 1 {
            return Err(invalid(
                "schedule.min_duration_days",
                "Minimum duration must be at least one day",
            ));
        }

        if self.schedule.due_day_cap < 1 || self.schedule.due_day_cap > 28 {
            return Err(invalid(
                "schedule.due_day_cap",
                "Due day cap must be between 1 and 28",
            ));
        }

        if self.schedule.default_grace_period_days > self.schedule.max_grace_period_days {
            return Err(invalid(
                "schedule.default_grace_period_days",
                "Default grace period exceeds schedule.max_grace_period_days",
            ));
        }

        if self.schedule.weekly_periods_per_month <= Decimal::ZERO {
            return Err(invalid(
                "schedule.weekly_periods_per_month",
                "Periods per month must be positive",
            ));
        }

        if self.schedule.biweekly_periods_per_month <= Decimal::ZERO {
            return Err(invalid(
                "schedule.biweekly_periods_per_month",
                "Periods per month must be positive",
            ));
        }

        if self.matching.amount_tolerance < Decimal::ZERO {
            return Err(invalid(
                "matching.amount_tolerance",
                "Tolerance cannot be negative",
            ));
        }

        if self.matching.date_window_days < 0 {
            return Err(invalid(
                "matching.date_window_days",
                "Date window cannot be negative",
            ));
        }

        if self.matching.amount_match_ratio < Decimal::ZERO
            || self.matching.amount_match_ratio >= Decimal::ONE
        {
            return Err(invalid(
                "matching.amount_match_ratio",
                "Match ratio must be between 0 and 1",
            ));
        }

        if self.matching.keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(invalid("matching.keywords", "Keywords cannot be blank"));
        }

        if self.reminders.interval_days < 1 {
            return Err(invalid(
                "reminders.interval_days",
                "Reminder interval must be at least one day",
            ));
        }

        if self.scheduler.interval_secs == 0 {
            return Err(invalid(
                "scheduler.interval_secs",
                "Scheduler interval must be greater than 0",
            ));
        }

        if self.currency.decimal_places > 10 {
            return Err(invalid(
                "currency.decimal_places",
                "Decimal places must be between 0 and 10",
            ));
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" | "off" => {}
            _ => {
                return Err(invalid(
                    "logging.level",
                    "Log level must be one of trace, debug, info, warn, error, off",
                ))
            }
        }

        Ok(())
    }

    /// Generate a default configuration file
    pub fn generate_default() -> &'static str {
        include_str!("../templates/default_config.yaml")
    }

    /// Grace period for contracts that do not set their own
    pub fn grace_period_or_default(&self, days: Option<u32>) -> u32 {
        days.unwrap_or(self.schedule.default_grace_period_days)
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.schedule.due_day_cap, 28);
        assert_eq!(config.schedule.weekly_periods_per_month, Decimal::new(433, 2));
        assert_eq!(config.matching.date_window_days, 30);
        assert_eq!(config.matching.keywords.len(), 3);
    }

    #[test]
    fn test_default_template_parses() {
        let config = Config::from_yaml(Config::generate_default()).unwrap();
        assert_eq!(config.server.port, 8081);
        assert_eq!(config.schedule.default_grace_period_days, 5);
        assert_eq!(config.matching.amount_tolerance, Decimal::new(1, 2));
        assert_eq!(config.reports.default_range, TimeRange::Month);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = Config::from_yaml("server:\n  port: 9000\nmatching:\n  date_window_days: 10\n").unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.matching.date_window_days, 10);
        assert_eq!(config.matching.amount_match_ratio, Decimal::new(5, 2));
    }

    #[test]
    fn test_invalid_due_day_cap() {
        let err = Config::from_yaml("schedule:\n  due_day_cap: 31\n").unwrap_err();
        match err {
            ConfigError::InvalidValue { field, .. } => assert_eq!(field, "schedule.due_day_cap"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_match_ratio() {
        let mut config = Config::default();
        config.matching.amount_match_ratio = Decimal::ONE;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_grace_above_max() {
        let err = Config::from_yaml("schedule:\n  default_grace_period_days: 30\n  max_grace_period_days: 10\n")
            .unwrap_err();
        match err {
            ConfigError::InvalidValue { field, .. } => {
                assert_eq!(field, "schedule.default_grace_period_days")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(
            Config::from_yaml("server: [unclosed"),
            Err(ConfigError::InvalidYaml)
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load(PathBuf::from("/nonexistent/rentledger.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn test_time_range_from_str() {
        assert_eq!("quarter".parse::<TimeRange>().unwrap(), TimeRange::Quarter);
        assert_eq!("ALL".parse::<TimeRange>().unwrap(), TimeRange::All);
        assert!("decade".parse::<TimeRange>().is_err());
        assert_eq!(TimeRange::Year.to_string(), "year");
    }

    #[test]
    fn test_grace_period_or_default() {
        let config = Config::default();
        assert_eq!(config.grace_period_or_default(None), 5);
        assert_eq!(config.grace_period_or_default(Some(10)), 10);
    }
}
