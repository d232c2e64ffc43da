//! Core data models for properties, contracts, schedule rows and payments

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::aggregate::ScheduleSummary;
use super::error::{CoreError, CoreResult, ErrorCode};
use super::types::{
    ContractStatus, ErrorLogStatus, PaymentFrequency, PaymentOperation, PaymentStatus, RowStatus,
    TenantType, UnitStatus,
};

/// A property holding one or more rental units
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Property {
    /// Assigned on creation when left empty
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub manager_email: Option<String>,
    #[serde(default)]
    pub owner_email: Option<String>,
    #[serde(default)]
    pub purchase_price: Option<Decimal>,
    #[serde(default)]
    pub market_value: Option<Decimal>,
}

impl Property {
    /// Check names, emails and prices
    pub fn validate(&self) -> CoreResult<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::validation("Property name is required"));
        }
        for email in [&self.manager_email, &self.owner_email].into_iter().flatten() {
            check_email(email)?;
        }
        if self.purchase_price.map_or(false, |p| p < Decimal::ZERO) {
            return Err(CoreError::validation("Purchase price cannot be negative"));
        }
        if self.market_value.map_or(false, |v| v < Decimal::ZERO) {
            return Err(CoreError::validation("Market value cannot be negative"));
        }
        Ok(())
    }
}

/// A lettable unit within a property
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RentalUnit {
    #[serde(default)]
    pub id: String,
    pub property_id: String,
    /// Unique within the property
    pub unit_number: String,
    /// Monthly asking rent
    pub base_rent: Decimal,
    #[serde(default)]
    pub status: UnitStatus,
}

impl RentalUnit {
    pub fn validate(&self) -> CoreResult<()> {
        if self.unit_number.trim().is_empty() {
            return Err(CoreError::validation("Unit number is required"));
        }
        if self.base_rent <= Decimal::ZERO {
            return Err(CoreError::NonPositiveAmount {
                field: "base_rent".to_string(),
            });
        }
        Ok(())
    }
}

/// A tenant, individual or corporate
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tenant {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    /// Customer record used for invoicing
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub tenant_type: TenantType,
    #[serde(default)]
    pub company_name: Option<String>,
}

impl Tenant {
    /// Name shown on reports and invoices
    pub fn display_name(&self) -> String {
        if self.tenant_type == TenantType::Corporate {
            if let Some(company) = self.company_name.as_deref().filter(|c| !c.trim().is_empty()) {
                return company.to_string();
            }
        }
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            _ => self.name.clone(),
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::validation("Tenant name is required"));
        }
        if let Some(email) = &self.email {
            check_email(email)?;
        }
        if let Some(phone) = &self.phone {
            if rentledger_utils::digits_only(phone).len() < 10 {
                return Err(CoreError::validation(format!(
                    "Phone number {} must have at least 10 digits",
                    phone
                )));
            }
        }
        if self.tenant_type == TenantType::Corporate
            && self.company_name.as_deref().map_or(true, |c| c.trim().is_empty())
        {
            return Err(CoreError::validation(
                "Company name is required for corporate tenants",
            ));
        }
        Ok(())
    }
}

fn check_email(email: &str) -> CoreResult<()> {
    if !email.contains('@') {
        return Err(CoreError::validation(format!("Invalid email address: {}", email)));
    }
    Ok(())
}

/// Identifies one schedule row across contracts
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowRef {
    pub contract_id: String,
    pub row_id: String,
}

/// A share of a payment applied to a schedule row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentAllocation {
    /// Received payment, absent for manual records
    pub payment_id: Option<String>,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub reference: Option<String>,
    pub mode: Option<String>,
}

/// One due installment of a contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRow {
    pub id: String,
    pub contract_id: String,
    pub due_date: NaiveDate,
    pub rent_amount: Decimal,
    /// Late fee applied when the row was marked overdue
    pub late_fee: Decimal,
    pub waived_late_fee: Decimal,
    pub waiver_reason: Option<String>,
    /// rent + late fee - waived
    pub amount_due: Decimal,
    /// Sum of allocations
    pub amount_paid: Decimal,
    pub outstanding: Decimal,
    pub overpaid: Decimal,
    pub status: RowStatus,
    pub allocations: Vec<PaymentAllocation>,
    /// Last payment matched to this row
    pub payment_id: Option<String>,
    pub payment_reference: Option<String>,
    pub payment_date: Option<NaiveDate>,
    pub payment_mode: Option<String>,
    pub marked_overdue_on: Option<NaiveDate>,
    pub reminder_count: u32,
    pub last_reminder_date: Option<NaiveDate>,
    pub invoice_reference: Option<String>,
}

impl ScheduleRow {
    /// Create a Pending row with nothing paid
    pub fn new(id: String, contract_id: String, due_date: NaiveDate, rent_amount: Decimal) -> Self {
        Self {
            id,
            contract_id,
            due_date,
            rent_amount,
            late_fee: Decimal::ZERO,
            waived_late_fee: Decimal::ZERO,
            waiver_reason: None,
            amount_due: rent_amount,
            amount_paid: Decimal::ZERO,
            outstanding: rent_amount,
            overpaid: Decimal::ZERO,
            status: RowStatus::Pending,
            allocations: Vec::new(),
            payment_id: None,
            payment_reference: None,
            payment_date: None,
            payment_mode: None,
            marked_overdue_on: None,
            reminder_count: 0,
            last_reminder_date: None,
            invoice_reference: None,
        }
    }

    /// Still expects money
    pub fn is_outstanding(&self) -> bool {
        !matches!(self.status, RowStatus::Paid | RowStatus::Cancelled) && self.outstanding > Decimal::ZERO
    }

    /// Last day before the row counts as overdue; saturates at the calendar end
    pub fn grace_end(&self, grace_days: u32) -> NaiveDate {
        self.due_date
            .checked_add_days(chrono::Days::new(u64::from(grace_days)))
            .unwrap_or(NaiveDate::MAX)
    }

    /// Recompute derived amounts and status from rent, fees and allocations
    pub fn recalculate(&mut self) {
        self.amount_due = self.rent_amount + self.late_fee - self.waived_late_fee;
        self.amount_paid = self.allocations.iter().map(|a| a.amount).sum();
        self.outstanding = (self.amount_due - self.amount_paid).max(Decimal::ZERO);
        self.overpaid = (self.amount_paid - self.amount_due).max(Decimal::ZERO);

        match self.allocations.last() {
            Some(last) => {
                self.payment_id = last.payment_id.clone();
                self.payment_reference = last.reference.clone();
                self.payment_date = Some(last.date);
                self.payment_mode = last.mode.clone();
            }
            None => {
                self.payment_id = None;
                self.payment_reference = None;
                self.payment_date = None;
                self.payment_mode = None;
            }
        }

        if self.status == RowStatus::Cancelled {
            return;
        }
        self.status = if self.outstanding.is_zero() {
            RowStatus::Paid
        } else if self.amount_paid > Decimal::ZERO {
            RowStatus::PartiallyPaid
        } else if self.marked_overdue_on.is_some() {
            RowStatus::Overdue
        } else {
            RowStatus::Pending
        };
    }

    /// Apply an allocation and refresh the row
    pub fn allocate(&mut self, allocation: PaymentAllocation) {
        self.allocations.push(allocation);
        self.recalculate();
    }

    /// Remove every allocation made by a payment, returning the amount reverted
    pub fn revert_payment(&mut self, payment_id: &str) -> Decimal {
        let before: Decimal = self.allocations.iter().map(|a| a.amount).sum();
        self.allocations
            .retain(|a| a.payment_id.as_deref() != Some(payment_id));
        self.recalculate();
        before - self.amount_paid
    }

    /// Has an allocation from the given payment
    pub fn has_payment(&self, payment_id: &str) -> bool {
        self.allocations
            .iter()
            .any(|a| a.payment_id.as_deref() == Some(payment_id))
    }
}

/// Terms for a new contract
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewContract {
    pub tenant: String,
    #[serde(default)]
    pub rental_unit: Option<String>,
    #[serde(default)]
    pub property: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub monthly_rent: Decimal,
    #[serde(default)]
    pub frequency: PaymentFrequency,
    #[serde(default = "default_due_day")]
    pub due_day: u32,
    #[serde(default)]
    pub grace_period_days: Option<u32>,
    #[serde(default)]
    pub late_fee_amount: Decimal,
}

fn default_due_day() -> u32 {
    1
}

/// Changes to a Draft contract; absent fields stay as they are
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractUpdate {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub monthly_rent: Option<Decimal>,
    pub frequency: Option<PaymentFrequency>,
    pub due_day: Option<u32>,
    pub grace_period_days: Option<u32>,
    pub late_fee_amount: Option<Decimal>,
}

/// A rental contract and its schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    pub id: String,
    pub tenant: String,
    pub rental_unit: Option<String>,
    pub property: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub monthly_rent: Decimal,
    pub frequency: PaymentFrequency,
    pub due_day: u32,
    pub grace_period_days: u32,
    pub late_fee_amount: Decimal,
    pub status: ContractStatus,
    pub rows: Vec<ScheduleRow>,
    pub summary: ScheduleSummary,
}

impl Contract {
    pub fn is_active(&self) -> bool {
        self.status == ContractStatus::Active
    }

    pub fn row(&self, row_id: &str) -> Option<&ScheduleRow> {
        self.rows.iter().find(|r| r.id == row_id)
    }

    pub fn row_mut(&mut self, row_id: &str) -> Option<&mut ScheduleRow> {
        self.rows.iter_mut().find(|r| r.id == row_id)
    }

    /// Row falling due on the given date
    pub fn row_by_due_date_mut(&mut self, due_date: NaiveDate) -> Option<&mut ScheduleRow> {
        self.rows.iter_mut().find(|r| r.due_date == due_date)
    }

    /// Rows that still expect money
    pub fn outstanding_rows(&self) -> impl Iterator<Item = &ScheduleRow> {
        self.rows.iter().filter(|r| r.is_outstanding())
    }

    /// Both date ranges share at least one day
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start_date <= end && start <= self.end_date
    }
}

/// An incoming payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    /// Free text identifying the paying party
    pub payer: String,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub memo: String,
    pub reference_no: Option<String>,
    pub mode: Option<String>,
    pub status: PaymentStatus,
    /// Row the payment was matched to
    pub matched: Option<RowRef>,
}

impl Payment {
    pub fn is_received(&self) -> bool {
        self.status == PaymentStatus::Received
    }
}

/// Payment details supplied by the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPayment {
    pub payer: String,
    pub amount: Decimal,
    pub date: NaiveDate,
    #[serde(default)]
    pub memo: String,
    #[serde(default)]
    pub reference_no: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
}

/// A failed payment operation kept for manual follow-up
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorLogEntry {
    pub id: String,
    pub payment_id: Option<String>,
    pub operation: PaymentOperation,
    pub error_code: ErrorCode,
    pub message: String,
    pub timestamp: NaiveDateTime,
    pub status: ErrorLogStatus,
    pub resolution_notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn allocation(payment: &str, amount: i64) -> PaymentAllocation {
        PaymentAllocation {
            payment_id: Some(payment.to_string()),
            amount: Decimal::new(amount, 0),
            date: date(2025, 3, 5),
            reference: None,
            mode: Some("Bank Transfer".to_string()),
        }
    }

    #[test]
    fn test_row_allocation_partial_then_paid() {
        let mut row = ScheduleRow::new("R1".into(), "C1".into(), date(2025, 3, 5), Decimal::new(1000, 0));

        row.allocate(allocation("PAY-1", 400));
        assert_eq!(row.status, RowStatus::PartiallyPaid);
        assert_eq!(row.outstanding, Decimal::new(600, 0));

        row.allocate(allocation("PAY-2", 600));
        assert_eq!(row.status, RowStatus::Paid);
        assert!(row.outstanding.is_zero());
        assert_eq!(row.payment_id.as_deref(), Some("PAY-2"));
    }

    #[test]
    fn test_row_overpaid_is_flagged() {
        let mut row = ScheduleRow::new("R1".into(), "C1".into(), date(2025, 3, 5), Decimal::new(1000, 0));
        row.allocate(allocation("PAY-1", 1200));
        assert_eq!(row.status, RowStatus::Paid);
        assert!(row.outstanding.is_zero());
        assert_eq!(row.overpaid, Decimal::new(200, 0));
    }

    #[test]
    fn test_revert_payment_restores_overdue() {
        let mut row = ScheduleRow::new("R1".into(), "C1".into(), date(2025, 3, 5), Decimal::new(1000, 0));
        row.marked_overdue_on = Some(date(2025, 3, 11));
        row.recalculate();
        assert_eq!(row.status, RowStatus::Overdue);

        row.allocate(allocation("PAY-1", 1000));
        assert_eq!(row.status, RowStatus::Paid);

        let reverted = row.revert_payment("PAY-1");
        assert_eq!(reverted, Decimal::new(1000, 0));
        assert_eq!(row.status, RowStatus::Overdue);
        assert_eq!(row.outstanding, Decimal::new(1000, 0));
        assert!(row.payment_id.is_none());
    }

    #[test]
    fn test_tenant_validation() {
        let mut tenant = Tenant {
            name: "Jane Doe".into(),
            email: Some("jane.example.com".into()),
            ..Default::default()
        };
        assert!(tenant.validate().is_err());

        tenant.email = Some("jane@example.com".into());
        tenant.phone = Some("555-0102".into());
        assert!(tenant.validate().is_err());

        tenant.phone = Some("+1 (555) 010-2030".into());
        assert!(tenant.validate().is_ok());
    }

    #[test]
    fn test_tenant_display_name() {
        let tenant = Tenant {
            name: "acme".into(),
            tenant_type: TenantType::Corporate,
            company_name: Some("Acme Ltd".into()),
            ..Default::default()
        };
        assert_eq!(tenant.display_name(), "Acme Ltd");

        let person = Tenant {
            name: "jdoe".into(),
            first_name: Some("Jane".into()),
            last_name: Some("Doe".into()),
            ..Default::default()
        };
        assert_eq!(person.display_name(), "Jane Doe");
    }

    #[test]
    fn test_unit_and_property_validation() {
        let unit = RentalUnit {
            property_id: "PROP-00001".into(),
            unit_number: "1A".into(),
            base_rent: Decimal::ZERO,
            ..Default::default()
        };
        assert!(matches!(unit.validate(), Err(CoreError::NonPositiveAmount { .. })));

        let property = Property {
            name: "Elm Court".into(),
            purchase_price: Some(Decimal::new(-1, 0)),
            ..Default::default()
        };
        assert!(property.validate().is_err());
    }
}
