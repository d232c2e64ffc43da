//! Basic enumerations shared by the rental modules

use serde::{Deserialize, Serialize};

/// How often rent falls due
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentFrequency {
    /// Every calendar month
    Monthly,
    /// Every 7 days
    Weekly,
    /// Every 14 days
    #[serde(alias = "bi-weekly", alias = "biweekly")]
    BiWeekly,
    /// Every 3 calendar months
    Quarterly,
    /// Every 12 calendar months
    Annually,
}

impl Default for PaymentFrequency {
    fn default() -> Self {
        PaymentFrequency::Monthly
    }
}

impl PaymentFrequency {
    /// Calendar months between due dates, for month-based frequencies
    pub fn months(&self) -> Option<u32> {
        match self {
            PaymentFrequency::Monthly => Some(1),
            PaymentFrequency::Quarterly => Some(3),
            PaymentFrequency::Annually => Some(12),
            PaymentFrequency::Weekly | PaymentFrequency::BiWeekly => None,
        }
    }

    /// Days between due dates, for day-based frequencies
    pub fn days(&self) -> Option<i64> {
        match self {
            PaymentFrequency::Weekly => Some(7),
            PaymentFrequency::BiWeekly => Some(14),
            _ => None,
        }
    }
}

impl std::str::FromStr for PaymentFrequency {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "monthly" => Ok(PaymentFrequency::Monthly),
            "weekly" => Ok(PaymentFrequency::Weekly),
            "bi-weekly" | "biweekly" | "bi_weekly" => Ok(PaymentFrequency::BiWeekly),
            "quarterly" => Ok(PaymentFrequency::Quarterly),
            "annually" | "annual" | "yearly" => Ok(PaymentFrequency::Annually),
            _ => Err(format!("Invalid payment frequency: {}", s)),
        }
    }
}

impl std::fmt::Display for PaymentFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentFrequency::Monthly => write!(f, "monthly"),
            PaymentFrequency::Weekly => write!(f, "weekly"),
            PaymentFrequency::BiWeekly => write!(f, "bi-weekly"),
            PaymentFrequency::Quarterly => write!(f, "quarterly"),
            PaymentFrequency::Annually => write!(f, "annually"),
        }
    }
}

/// Contract lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    /// Created, no schedule yet
    Draft,
    /// Schedule generated, unit occupied
    Active,
    /// Terminated; paid history kept
    Cancelled,
}

impl Default for ContractStatus {
    fn default() -> Self {
        ContractStatus::Draft
    }
}

impl std::fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContractStatus::Draft => write!(f, "draft"),
            ContractStatus::Active => write!(f, "active"),
            ContractStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Status of a single schedule row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowStatus {
    Pending,
    PartiallyPaid,
    Paid,
    Overdue,
    Cancelled,
}

impl Default for RowStatus {
    fn default() -> Self {
        RowStatus::Pending
    }
}

impl std::str::FromStr for RowStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(' ', "_").as_str() {
            "pending" => Ok(RowStatus::Pending),
            "partially_paid" => Ok(RowStatus::PartiallyPaid),
            "paid" => Ok(RowStatus::Paid),
            "overdue" => Ok(RowStatus::Overdue),
            "cancelled" => Ok(RowStatus::Cancelled),
            _ => Err(format!("Invalid row status: {}", s)),
        }
    }
}

impl std::fmt::Display for RowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowStatus::Pending => write!(f, "pending"),
            RowStatus::PartiallyPaid => write!(f, "partially_paid"),
            RowStatus::Paid => write!(f, "paid"),
            RowStatus::Overdue => write!(f, "overdue"),
            RowStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Aggregated status of a contract, tenant or property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    Active,
    Overdue,
    Completed,
}

impl Default for ScheduleStatus {
    fn default() -> Self {
        ScheduleStatus::Active
    }
}

impl std::fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScheduleStatus::Active => write!(f, "active"),
            ScheduleStatus::Overdue => write!(f, "overdue"),
            ScheduleStatus::Completed => write!(f, "completed"),
        }
    }
}

/// Incoming payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Received,
    Cancelled,
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Received
    }
}

/// Tenant type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantType {
    Individual,
    Corporate,
}

impl Default for TenantType {
    fn default() -> Self {
        TenantType::Individual
    }
}

/// Rental unit availability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    Available,
    Occupied,
}

impl Default for UnitStatus {
    fn default() -> Self {
        UnitStatus::Available
    }
}

/// Error log entry status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorLogStatus {
    Open,
    Resolved,
    Ignored,
}

impl std::str::FromStr for ErrorLogStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(ErrorLogStatus::Open),
            "resolved" => Ok(ErrorLogStatus::Resolved),
            "ignored" => Ok(ErrorLogStatus::Ignored),
            _ => Err(format!("Invalid error log status: {}", s)),
        }
    }
}

/// Payment operation that can be retried by hand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOperation {
    /// Match the payment to a row
    Link,
    /// Revert the payment's allocations
    Unlink,
    /// Create the invoice for a paid row
    Invoice,
}

impl std::str::FromStr for PaymentOperation {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "link" => Ok(PaymentOperation::Link),
            "unlink" => Ok(PaymentOperation::Unlink),
            "invoice" => Ok(PaymentOperation::Invoice),
            _ => Err(format!("Invalid operation: {}", s)),
        }
    }
}

impl std::fmt::Display for PaymentOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentOperation::Link => write!(f, "link"),
            PaymentOperation::Unlink => write!(f, "unlink"),
            PaymentOperation::Invoice => write!(f, "invoice"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_steps() {
        assert_eq!(PaymentFrequency::Monthly.months(), Some(1));
        assert_eq!(PaymentFrequency::Quarterly.months(), Some(3));
        assert_eq!(PaymentFrequency::Annually.months(), Some(12));
        assert_eq!(PaymentFrequency::Weekly.days(), Some(7));
        assert_eq!(PaymentFrequency::BiWeekly.days(), Some(14));
        assert_eq!(PaymentFrequency::Weekly.months(), None);
    }

    #[test]
    fn test_frequency_from_str() {
        assert_eq!("Bi-weekly".parse::<PaymentFrequency>().unwrap(), PaymentFrequency::BiWeekly);
        assert_eq!("ANNUALLY".parse::<PaymentFrequency>().unwrap(), PaymentFrequency::Annually);
        assert!("daily".parse::<PaymentFrequency>().is_err());
    }

    #[test]
    fn test_frequency_serde_alias() {
        let f: PaymentFrequency = serde_json::from_str("\"bi-weekly\"").unwrap();
        assert_eq!(f, PaymentFrequency::BiWeekly);
        assert_eq!(serde_json::to_string(&f).unwrap(), "\"bi_weekly\"");
    }

    #[test]
    fn test_row_status_from_str() {
        assert_eq!("Partially Paid".parse::<RowStatus>().unwrap(), RowStatus::PartiallyPaid);
        assert_eq!(RowStatus::Overdue.to_string(), "overdue");
    }
}
